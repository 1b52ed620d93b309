use std::path::Path;

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use ndarray_npy::{read_npy, write_npy};

use super::{Candidate, VectorIndex, sort_candidates};
use crate::error::StoreError;

pub const FLAT_FILE: &str = "embeddings.npy";

/// 精确内积索引，所有向量常驻内存
pub struct FlatIndex {
    vectors: Array2<f32>,
}

impl FlatIndex {
    pub fn new(dim: usize) -> Self {
        Self { vectors: Array2::zeros((0, dim)) }
    }

    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        let vectors: Array2<f32> = read_npy(dir.join(FLAT_FILE))?;
        Ok(Self { vectors })
    }

    /// 第 position 个向量
    pub fn vector(&self, position: usize) -> Option<ArrayView1<f32>> {
        (position < self.vectors.nrows()).then(|| self.vectors.row(position))
    }
}

impl VectorIndex for FlatIndex {
    fn dim(&self) -> usize {
        self.vectors.ncols()
    }

    fn len(&self) -> usize {
        self.vectors.nrows()
    }

    fn add(&mut self, vectors: ArrayView2<f32>) -> Result<(), StoreError> {
        if vectors.ncols() != self.dim() {
            return Err(StoreError::ManifestMismatch(format!(
                "添加的向量维度为 {}，索引维度为 {}",
                vectors.ncols(),
                self.dim()
            )));
        }
        self.vectors
            .append(Axis(0), vectors)
            .map_err(|e| StoreError::ManifestMismatch(format!("无法追加向量: {e}")))?;
        Ok(())
    }

    fn search(&self, query: &[f32], count: usize) -> Result<Vec<Candidate>, StoreError> {
        let query = ArrayView1::from(query);
        let scores = self.vectors.dot(&query);
        let mut candidates = scores
            .iter()
            .enumerate()
            .map(|(position, &score)| Candidate { position, score })
            .collect::<Vec<_>>();
        sort_candidates(&mut candidates);
        candidates.truncate(count);
        Ok(candidates)
    }

    fn save(&self, dir: &Path) -> Result<(), StoreError> {
        write_npy(dir.join(FLAT_FILE), &self.vectors)?;
        Ok(())
    }
}
