//! Customer support: a knowledge base of support articles, searched before
//! every answer, with resolved interactions logged back into memory.

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use indicatif::ProgressBar;
use serde_json::Value;

use super::{banner, divider, preview, Pacing, Scenario};
use crate::model::ModelClient;
use crate::orchestrator::{Orchestrator, ToolCallRecord, Transcript};
use crate::service::HippocampusClient;
use crate::tools::ToolKind;

pub const SYSTEM_PROMPT: &str = "\
You are an AI customer support agent for TechCorp, a software company.

You have access to a knowledge base of support articles, past ticket resolutions,
product documentation, and customer interaction history.

ALWAYS search your knowledge base before answering questions. Use precise search parameters:
- For technical errors: epsilon=0.2, threshold=0.6, top_k=3
- For feature questions: epsilon=0.25, threshold=0.5, top_k=5
- For general inquiries: epsilon=0.3, threshold=0.5, top_k=5

When you find relevant information, cite it naturally in your response.
If you don't find relevant information, say so and offer to escalate.";

pub const SCENARIO: Scenario = Scenario {
    name: "support",
    title: "CUSTOMER SUPPORT DEMO - Semantic Search over the Knowledge Base",
    agent_id: "customer_support_agent",
    system_prompt: SYSTEM_PROMPT,
    tools: &[ToolKind::SearchKnowledgeBase, ToolKind::LogInteraction],
    reply_label: "Agent",
    farewell: "Thank you for using TechCorp support!",
};

pub struct SupportCase {
    pub title: &'static str,
    pub customer: &'static str,
    pub expected: &'static str,
}

pub const CASES: [SupportCase; 5] = [
    SupportCase {
        title: "Scenario 1: API Rate Limit Question",
        customer: "I keep getting a 429 error from your API. What's going on?",
        expected: "Should find API rate limit article",
    },
    SupportCase {
        title: "Scenario 2: Authentication Problem",
        customer: "I can't log in to my account. I'm sure my password is correct but it keeps \
                   saying account locked.",
        expected: "Should find account lockout and password reset articles",
    },
    SupportCase {
        title: "Scenario 3: Billing Question",
        customer: "If I upgrade my plan today, will I be charged the full amount or is it prorated?",
        expected: "Should find billing proration article",
    },
    SupportCase {
        title: "Scenario 4: Integration Setup",
        customer: "How do I set up the Slack integration? I want to get notifications in my \
                   workspace.",
        expected: "Should find Slack integration setup article",
    },
    SupportCase {
        title: "Scenario 5: Performance Issue",
        customer: "Our database queries are really slow. Any tips for optimization?",
        expected: "Should find query optimization and indexing articles",
    },
];

/// Bundled knowledge base, `(key, text)`.
pub const ARTICLES: &[(&str, &str)] = &[
    // authentication
    ("auth_login_failed_wrong_password", "Login failed: User entered incorrect password. Solution: Use password reset link sent to registered email. Check spam folder if not received within 5 minutes."),
    ("auth_account_locked_multiple_attempts", "Account locked after 5 failed login attempts. Solution: Account automatically unlocks after 30 minutes, or user can reset password immediately via email link."),
    ("auth_2fa_not_receiving_code", "Two-factor authentication code not received. Solution: Check SMS is not blocked, verify phone number is correct in account settings, or use backup codes provided during 2FA setup."),
    ("auth_sso_integration_azure", "SSO integration with Azure AD. Configuration requires admin privileges. Add TechCorp app in Azure portal, configure SAML 2.0 with entity ID: https://techcorp.com/saml and ACS URL: https://techcorp.com/saml/consume"),
    ("auth_password_requirements_policy", "Password must be 12+ characters with uppercase, lowercase, number, and special character. Passwords expire every 90 days. Cannot reuse last 5 passwords."),
    // api
    ("api_rate_limit_exceeded_429", "API rate limit exceeded (HTTP 429). Free tier: 100 requests/hour. Pro tier: 1000 requests/hour. Enterprise: unlimited. Rate limit resets on the hour. Use exponential backoff for retries."),
    ("api_authentication_bearer_token", "API authentication requires Bearer token in Authorization header. Tokens generated in dashboard under Settings > API Keys. Tokens expire after 90 days."),
    ("api_webhook_not_triggering", "Webhook not triggering. Verify webhook URL is publicly accessible (not localhost), returns 200 status, and responds within 5 seconds. Check webhook logs in dashboard for delivery attempts."),
    ("api_cors_error_browser", "CORS error in browser requests. API does not support browser-based requests due to security. Use server-side requests or enable CORS for your domain in dashboard settings."),
    ("api_pagination_large_datasets", "Paginating large datasets. Use limit (max 100) and offset parameters. Example: GET /api/v1/users?limit=100&offset=200. Total count available in X-Total-Count header."),
    // billing
    ("billing_upgrade_plan_prorated", "Upgrading plan is prorated. Charged difference for remaining billing period. Downgrading takes effect at next billing cycle to avoid data loss."),
    ("billing_invoice_not_received", "Invoice not received after payment. Check spam folder. Invoices sent to billing email address. Download from dashboard under Billing > Invoices. Contact billing@techcorp.com if missing."),
    ("billing_payment_failed_card_declined", "Payment failed due to declined card. Update payment method in dashboard. Common causes: insufficient funds, expired card, incorrect billing address. Retry after updating."),
    ("billing_cancel_subscription_process", "Cancel subscription in dashboard under Billing > Cancel. Takes effect at end of billing period. Data exported via API within 30 days. No refunds for partial months."),
    ("billing_enterprise_custom_pricing", "Enterprise custom pricing available for 100+ users. Includes dedicated support, custom SLA, on-premise deployment option. Contact sales@techcorp.com for quote."),
    // database
    ("db_slow_query_optimization", "Slow database queries. Add indexes on frequently queried columns. Use EXPLAIN to analyze query plan. Avoid SELECT *, limit results. Consider caching for read-heavy operations."),
    ("db_connection_pool_exhausted", "Database connection pool exhausted. Default pool size: 20. Increase in config.yml: db.pool.max=50. Check for connection leaks - ensure connections are closed after use."),
    ("db_migration_failed_rollback", "Database migration failed. Automatic rollback initiated. Check migration logs for errors. Common issues: foreign key constraints, duplicate column names, syntax errors."),
    ("db_backup_restore_procedure", "Database backup and restore. Automated daily backups retained for 30 days. Point-in-time restore available for last 7 days. Manual restore via dashboard or support ticket."),
    ("db_replication_lag_high", "High replication lag between primary and replica. Normal: <1 second. Check network latency, disk I/O on replica. Consider read replica upgrade or reducing write load."),
    // email
    ("email_not_delivered_spam", "Emails going to spam. Add noreply@techcorp.com to contacts. Check SPF/DKIM records are configured. Verify email not marked as spam previously. Whitelist IP: 203.0.113.42"),
    ("email_template_customization", "Customize email templates. Edit in dashboard under Settings > Email Templates. Use variables: {{user.name}}, {{user.email}}, {{company.name}}. Preview before saving."),
    ("email_unsubscribe_process", "User unsubscribed from emails. Cannot re-subscribe automatically per CAN-SPAM. User must opt-in again via account settings. Transactional emails (receipts, security) still sent."),
    ("email_bounce_hard_vs_soft", "Email bounces: Hard bounce = invalid address, remove from list. Soft bounce = temporary issue (full inbox), retry up to 3 times over 72 hours."),
    ("email_smtp_configuration_custom", "Custom SMTP server configuration. Settings: smtp.techcorp.com, port 587 (TLS) or 465 (SSL). Requires username and app-specific password from dashboard."),
    // security
    ("security_xss_vulnerability_fixed", "XSS vulnerability in user input fields patched in v2.3.1. All user input now sanitized. Upgrade immediately. No known exploits. Reported via bug bounty program."),
    ("security_api_key_compromised", "API key compromised. Immediately revoke in dashboard, generate new key, update applications. Review API logs for unauthorized access. Enable IP whitelist for added security."),
    ("security_role_based_access_control", "Role-based access control (RBAC). Roles: Admin (full access), Editor (create/edit), Viewer (read-only). Custom roles available on Enterprise plan. Assign in team settings."),
    ("security_audit_log_compliance", "Audit logs for compliance. All user actions logged for 1 year. Export logs via API or dashboard. Includes: login attempts, data changes, permission modifications, API calls."),
    ("security_encryption_at_rest", "Data encryption at rest using AES-256. Encryption keys managed by AWS KMS. Customer-managed keys available on Enterprise plan. Database backups also encrypted."),
    // features
    ("feature_dark_mode_available", "Dark mode now available. Enable in user settings > Appearance. Automatically switches based on system preference if 'Auto' selected. Applies to web and mobile apps."),
    ("feature_export_data_csv_json", "Export data in CSV or JSON format. Limit: 10,000 rows per export. For larger exports, use API or contact support. Available under Data > Export."),
    ("feature_mobile_app_ios_android", "Mobile apps available for iOS (App Store) and Android (Google Play). Features: offline mode, push notifications, biometric login. Requires Pro plan or higher."),
    ("feature_ai_analytics_beta", "AI-powered analytics in beta. Opt-in via dashboard > Labs. Provides insights, anomaly detection, predictive trends. Feedback to product@techcorp.com"),
    ("feature_collaboration_real_time", "Real-time collaboration. Multiple users can edit simultaneously. Changes sync instantly. See active users in top-right. Available on Team plan and above."),
    // installation
    ("install_docker_compose_setup", "Docker Compose installation. Requires Docker 20.10+. Run: docker-compose up -d. Access at http://localhost:8080. Default credentials: admin/admin (change immediately)."),
    ("install_kubernetes_helm_chart", "Kubernetes deployment via Helm chart. Add repo: helm repo add techcorp https://charts.techcorp.com. Install: helm install techcorp/app. Configure values.yaml for production."),
    ("install_system_requirements", "System requirements: 4GB RAM minimum, 8GB recommended. 10GB disk space. Supported OS: Ubuntu 20.04+, CentOS 8+, Windows Server 2019+, macOS 11+."),
    ("install_ssl_certificate_setup", "SSL certificate setup. Use Let's Encrypt for free certs. Run: certbot --nginx -d yourdomain.com. Auto-renewal configured. Or upload custom cert in dashboard."),
    ("install_firewall_port_configuration", "Firewall configuration. Required ports: 80 (HTTP), 443 (HTTPS), 5432 (PostgreSQL - internal only). Optional: 22 (SSH), 9090 (monitoring)."),
    // errors
    ("error_500_internal_server", "HTTP 500 Internal Server Error. Check server logs for stack trace. Common causes: uncaught exceptions, database connection failure, out of memory. Restart service if persistent."),
    ("error_404_resource_not_found", "HTTP 404 Not Found. Verify URL is correct and resource exists. Check resource ID. For API: ensure correct API version in path (v1, v2). Case-sensitive on Linux."),
    ("error_403_forbidden_permissions", "HTTP 403 Forbidden. User lacks permissions. Verify role assignment. For API: check API key has required scopes. Team admins can modify permissions."),
    ("error_timeout_request_too_long", "Request timeout after 30 seconds. Optimize query, reduce data payload, or increase timeout in client. For large operations, use async processing with webhooks."),
    ("error_out_of_memory_heap", "Out of memory error. Increase heap size: -Xmx4g for 4GB. Check for memory leaks. Monitor memory usage in dashboard. Consider upgrading instance size."),
    // mobile
    ("mobile_app_crash_on_launch", "Mobile app crashes on launch. Clear app cache. Uninstall and reinstall. Ensure OS version supported (iOS 14+, Android 10+). Report crash ID to support."),
    ("mobile_offline_mode_sync", "Offline mode sync issues. Changes saved locally, sync when connection restored. Force sync by pulling down on home screen. Check storage space."),
    ("mobile_push_notifications_not_working", "Push notifications not working. Enable in device settings > TechCorp > Notifications. Re-login to app. Check notification preferences in app settings."),
    ("mobile_biometric_login_failed", "Biometric login failed. Re-register biometric in app settings. Ensure device biometric works in other apps. Fallback to password if issues persist."),
    ("mobile_camera_upload_failing", "Camera upload failing. Grant camera and storage permissions. Check file size <10MB. Supported formats: JPG, PNG, HEIC. Check internet connection."),
    // integrations
    ("integration_slack_setup", "Slack integration setup. Install TechCorp app from Slack App Directory. Authorize workspace access. Configure notifications in dashboard > Integrations > Slack."),
    ("integration_google_workspace", "Google Workspace integration. OAuth2 setup required. Scopes: email, profile, drive. Sync contacts and calendar. Enable in Settings > Integrations."),
    ("integration_zapier_automation", "Zapier automation. 100+ pre-built zaps available. Create custom workflows. Triggers: new user, data updated, form submitted. Actions: send email, create record, notify."),
    ("integration_salesforce_crm_sync", "Salesforce CRM sync. Two-way sync for contacts, leads, opportunities. Field mapping configurable. Sync interval: 15 minutes. Requires Enterprise plan."),
    ("integration_stripe_payment_processing", "Stripe payment processing integration. Connect Stripe account in dashboard. Supports one-time and recurring payments. Webhooks for payment events configured automatically."),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulateSummary {
    pub inserted: usize,
    pub failed: Vec<String>,
}

/// Insert every article in `articles`, pausing `delay` between inserts.
/// A failed insert is logged and skipped.
pub async fn populate(
    client: &HippocampusClient,
    articles: &[(&str, &str)],
    delay: Duration,
    progress: &ProgressBar,
) -> PopulateSummary {
    let mut summary = PopulateSummary::default();
    for (i, (key, text)) in articles.iter().enumerate() {
        progress.set_message(preview(key, 50));
        match client.insert(key, text).await {
            Ok(_) => summary.inserted += 1,
            Err(e) => {
                tracing::warn!(key, error = %e, "article insert failed");
                summary.failed.push(key.to_string());
            }
        }
        progress.inc(1);
        if i + 1 < articles.len() && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
    progress.finish_and_clear();
    tracing::info!(
        inserted = summary.inserted,
        failed = summary.failed.len(),
        agent_id = client.agent_id(),
        "knowledge base populated"
    );
    summary
}

/// `[Tool Call n]` trace of a support turn.
pub fn print_trace<W: Write>(out: &mut W, calls: &[ToolCallRecord]) -> std::io::Result<()> {
    for (i, call) in calls.iter().enumerate() {
        writeln!(out, "\n  [Tool Call {}]: {}", i + 1, call.name)?;
        if call.name != ToolKind::SearchKnowledgeBase.name() {
            continue;
        }
        if let Some(query) = call.input.get("query").and_then(Value::as_str) {
            writeln!(out, "    Query: '{query}'")?;
        }
        let params = &call.result["search_params"];
        if params.is_object() {
            writeln!(
                out,
                "    Parameters: epsilon={}, threshold={}, top_k={}",
                params["epsilon"], params["threshold"], params["top_k"]
            )?;
        }
        match call.result.get("count") {
            Some(count) => writeln!(out, "    Results: {count} articles found")?,
            None => writeln!(out, "    Failed: {}", call.result["error"])?,
        }
    }
    Ok(())
}

/// Each case runs in its own fresh conversation.
pub async fn run_demo<M: ModelClient, W: Write>(
    orchestrator: &Orchestrator<M>,
    pacing: Pacing,
    out: &mut W,
) -> Result<()> {
    banner(out, SCENARIO.title)?;

    for (i, case) in CASES.iter().enumerate() {
        banner(out, case.title)?;
        writeln!(out, "\nCustomer: {}", case.customer)?;
        writeln!(out, "\nExpected: {}", case.expected)?;

        let mut transcript = Transcript::new();
        let reply = orchestrator.chat(&mut transcript, case.customer).await?;
        print_trace(out, &reply.tool_calls)?;
        writeln!(out, "\nAgent Response:\n{}", reply.text)?;

        if i + 1 < CASES.len() {
            pacing.wait_for_enter(out, "[Press Enter for next scenario...]")?;
        }
    }

    banner(out, "DEMO COMPLETE")?;
    writeln!(out, "\nWhat this demonstrated:")?;
    writeln!(out, "  1. Semantic search across the support knowledge base")?;
    writeln!(out, "  2. Agent adapts search parameters based on query type")?;
    writeln!(out, "  3. Per-agent isolation of memories in the service")?;
    divider(out)?;
    Ok(())
}
