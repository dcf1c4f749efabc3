//! Exact nearest-neighbour search by brute-force squared L2 distance.

use anyhow::Result;
use ndarray::{Array2, ArrayView1, Axis};

#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    /// Insertion position of the stored vector.
    pub index: usize,
    /// Squared L2 distance to the query.
    pub distance: f32,
}

pub struct FlatIndex {
    vectors: Array2<f32>,
}

impl FlatIndex {
    pub fn new(dim: usize) -> Self {
        Self {
            vectors: Array2::zeros((0, dim)),
        }
    }

    pub fn dim(&self) -> usize {
        self.vectors.ncols()
    }

    pub fn len(&self) -> usize {
        self.vectors.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn add(&mut self, vector: &[f32]) -> Result<()> {
        anyhow::ensure!(
            vector.len() == self.dim(),
            "vector has {} dimensions, index expects {}",
            vector.len(),
            self.dim()
        );
        self.vectors.push_row(ArrayView1::from(vector))?;
        Ok(())
    }

    /// The `k` closest stored vectors, nearest first. Ties keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        anyhow::ensure!(
            query.len() == self.dim(),
            "query has {} dimensions, index expects {}",
            query.len(),
            self.dim()
        );

        let query = ArrayView1::from(query);
        let distances = (&self.vectors - &query)
            .mapv(|x| x * x)
            .sum_axis(Axis(1));

        let mut neighbors: Vec<Neighbor> = distances
            .iter()
            .enumerate()
            .map(|(index, &distance)| Neighbor { index, distance })
            .collect();
        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        neighbors.truncate(k);
        Ok(neighbors)
    }
}
