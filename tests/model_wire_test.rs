mod helpers;

use helpers::StubServer;
use hippo::model::anthropic::AnthropicClient;
use hippo::model::bedrock::BedrockClient;
use hippo::model::StopReason;
use hippo::orchestrator::{Orchestrator, Transcript};
use hippo::tools::ToolKind;
use hippo::Error;
use serde_json::json;

const TOOLS: &[ToolKind] = &[ToolKind::InsertMemory, ToolKind::SearchMemory];

#[tokio::test]
async fn anthropic_tool_round_trip() {
    let api = StubServer::start().await;
    api.once(
        "/v1/messages",
        200,
        json!({
            "content": [
                {"type": "text", "text": "Saving that."},
                {"type": "tool_use", "id": "toolu_1", "name": "insert_memory",
                 "input": {"key": "emma_allergy", "text": "Emma is allergic to shellfish"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 120, "output_tokens": 30}
        }),
    );
    api.once(
        "/v1/messages",
        200,
        json!({
            "content": [{"type": "text", "text": "Noted."}],
            "stop_reason": "end_turn"
        }),
    );
    let service = StubServer::memory_service().await;

    let model = AnthropicClient::new(
        "claude-test".into(),
        "sk-test".into(),
        Some(api.base_url.clone()),
    );
    let orchestrator = Orchestrator::new(model, service.toolbox("parent", TOOLS), "remember things")
        .with_max_tokens(256);

    let mut transcript = Transcript::new();
    let reply = orchestrator
        .chat(&mut transcript, "Emma is allergic to shellfish")
        .await
        .unwrap();
    assert_eq!(reply.text, "Noted.");
    assert_eq!(reply.stop_reason, StopReason::EndTurn);
    assert_eq!(transcript.len(), 4);

    let requests = api.received();
    assert_eq!(requests.len(), 2);
    let headers = &requests[0].headers;
    assert_eq!(headers["x-api-key"], "sk-test");
    assert_eq!(headers["anthropic-version"], "2023-06-01");

    let first = &requests[0].body;
    assert_eq!(first["model"], "claude-test");
    assert_eq!(first["max_tokens"], 256);
    assert_eq!(first["system"], "remember things");
    assert_eq!(first["tools"][0]["name"], "insert_memory");
    assert!(first["tools"][0]["input_schema"].is_object());

    let second = &requests[1].body;
    let messages = second["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    let result = &messages[2]["content"][0];
    assert_eq!(result["type"], "tool_result");
    assert_eq!(result["tool_use_id"], "toolu_1");
    let content: serde_json::Value =
        serde_json::from_str(result["content"].as_str().unwrap()).unwrap();
    assert_eq!(content["success"], true);

    assert_eq!(service.bodies("/insert")[0]["key"], "emma_allergy");
}

#[tokio::test]
async fn bedrock_tool_round_trip() {
    let api = StubServer::start().await;
    let path = "/model/us.amazon.nova-lite-v1%3A0/converse";
    api.once(
        path,
        200,
        json!({
            "output": {"message": {"role": "assistant", "content": [
                {"toolUse": {"toolUseId": "tooluse_1", "name": "search_memory",
                             "input": {"query": "shellfish", "threshold": 0.7, "epsilon": 0.2}}}
            ]}},
            "stopReason": "tool_use",
            "usage": {"inputTokens": 200, "outputTokens": 40, "totalTokens": 240}
        }),
    );
    api.once(
        path,
        200,
        json!({
            "output": {"message": {"role": "assistant", "content": [
                {"text": "Please don't buy shrimp: Emma has a severe shellfish allergy."}
            ]}},
            "stopReason": "end_turn"
        }),
    );
    let service = StubServer::memory_service().await;
    service.always(
        "/search",
        200,
        json!({"data": ["Emma has a severe shellfish allergy"]}),
    );

    let model = BedrockClient::new(
        "us.amazon.nova-lite-v1:0".into(),
        "us-east-1".into(),
        "bedrock-key".into(),
        Some(api.base_url.clone()),
    );
    let orchestrator = Orchestrator::new(model, service.toolbox("parent", TOOLS), "be safe");

    let mut transcript = Transcript::new();
    let reply = orchestrator
        .chat(&mut transcript, "Shrimp for Emma tonight?")
        .await
        .unwrap();
    assert!(reply.text.contains("shellfish allergy"));

    let requests = api.received();
    assert_eq!(requests.len(), 2, "{requests:?}");
    assert_eq!(requests[0].headers["authorization"], "Bearer bedrock-key");

    let first = &requests[0].body;
    assert_eq!(first["system"][0]["text"], "be safe");
    assert_eq!(
        first["toolConfig"]["tools"][1]["toolSpec"]["name"],
        "search_memory"
    );
    assert!(first["toolConfig"]["tools"][1]["toolSpec"]["inputSchema"]["json"].is_object());

    let messages = requests[1].body["messages"].as_array().unwrap();
    let result = &messages[2]["content"][0]["toolResult"];
    assert_eq!(result["toolUseId"], "tooluse_1");
    assert_eq!(result["status"], "success");
    assert_eq!(result["content"][0]["json"]["found"], true);
    assert_eq!(result["content"][0]["json"]["search_params"]["threshold"], 0.7);

    assert_eq!(service.bodies("/search")[0]["threshold"], 0.7);
}

#[tokio::test]
async fn model_http_error_propagates_out_of_chat() {
    let api = StubServer::start().await;
    api.always("/v1/messages", 401, json!({"error": {"message": "invalid x-api-key"}}));
    let service = StubServer::memory_service().await;

    let model = AnthropicClient::new("m".into(), "bad".into(), Some(api.base_url.clone()));
    let orchestrator = Orchestrator::new(model, service.toolbox("parent", TOOLS), "system");

    let mut transcript = Transcript::new();
    let err = orchestrator.chat(&mut transcript, "hi").await.unwrap_err();
    match err {
        Error::Model(message) => assert!(message.contains("401"), "{message}"),
        other => panic!("expected model error, got {other:?}"),
    }
    assert!(service.received().is_empty());
}
