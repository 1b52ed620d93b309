use std::path::Path;

use ndarray::ArrayView2;
use rayon::prelude::*;
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use super::{Candidate, VectorIndex};
use crate::error::StoreError;

pub const HNSW_FILE: &str = "index.usearch";

fn usearch_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Usearch(e.to_string())
}

/// 基于 usearch 的 HNSW 内积索引
pub struct HnswIndex {
    index: Index,
    dim: usize,
}

impl HnswIndex {
    pub fn new(dim: usize) -> Result<Self, StoreError> {
        let options = IndexOptions {
            dimensions: dim,
            // usearch 的内积距离为 1 - <a, b>
            metric: MetricKind::IP,
            quantization: ScalarKind::F32,
            // 此处为 usearch 默认参数
            connectivity: 16,
            expansion_add: 128,
            expansion_search: 64,
            ..Default::default()
        };
        let index = Index::new(&options).map_err(usearch_err)?;
        Ok(Self { index, dim })
    }

    pub fn open(dir: &Path, dim: usize) -> Result<Self, StoreError> {
        let s = Self::new(dim)?;
        let path = dir.join(HNSW_FILE);
        s.index.load(&path.to_string_lossy()).map_err(usearch_err)?;
        if s.index.dimensions() != dim {
            return Err(StoreError::ManifestMismatch(format!(
                "索引维度为 {}，manifest 中为 {}",
                s.index.dimensions(),
                dim
            )));
        }
        Ok(s)
    }
}

impl VectorIndex for HnswIndex {
    fn dim(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        self.index.size()
    }

    fn add(&mut self, vectors: ArrayView2<f32>) -> Result<(), StoreError> {
        if vectors.ncols() != self.dim {
            return Err(StoreError::ManifestMismatch(format!(
                "添加的向量维度为 {}，索引维度为 {}",
                vectors.ncols(),
                self.dim
            )));
        }
        let start = self.index.size();
        self.index.reserve(start + vectors.nrows()).map_err(usearch_err)?;
        let rows = vectors.rows().into_iter().map(|row| row.to_vec()).collect::<Vec<_>>();
        rows.par_iter()
            .enumerate()
            .try_for_each(|(i, row)| self.index.add((start + i) as u64, row.as_slice()))
            .map_err(usearch_err)?;
        Ok(())
    }

    fn search(&self, query: &[f32], count: usize) -> Result<Vec<Candidate>, StoreError> {
        let m = self.index.search(query, count).map_err(usearch_err)?;
        Ok(m.keys
            .into_iter()
            .zip(m.distances)
            .map(|(key, distance)| Candidate { position: key as usize, score: 1.0 - distance })
            .collect())
    }

    fn save(&self, dir: &Path) -> Result<(), StoreError> {
        let path = dir.join(HNSW_FILE);
        self.index.save(&path.to_string_lossy()).map_err(usearch_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_hnsw_search_and_reload() {
        let dir = TempDir::new().unwrap();
        let mut index = HnswIndex::new(3).unwrap();
        index.add(array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.6, 0.8]].view()).unwrap();
        assert_eq!(index.len(), 3);

        let r = index.search(&[0.0, 1.0, 0.0], 2).unwrap();
        assert_eq!(r[0].position, 1);
        assert!((r[0].score - 1.0).abs() < 1e-5);
        assert_eq!(r[1].position, 2);
        assert!((r[1].score - 0.6).abs() < 1e-5);

        index.save(dir.path()).unwrap();
        let loaded = HnswIndex::open(dir.path(), 3).unwrap();
        assert_eq!(loaded.len(), 3);
        let r = loaded.search(&[1.0, 0.0, 0.0], 1).unwrap();
        assert_eq!(r[0].position, 0);
    }
}
