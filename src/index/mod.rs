mod flat;
mod hnsw;

use std::cmp::Ordering;
use std::path::Path;

use clap::ValueEnum;
pub use flat::FlatIndex;
pub use hnsw::HnswIndex;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::error::{QueryError, StoreError};

/// 默认的候选集扩大倍数
pub const DEFAULT_OVERFETCH: usize = 5;

/// 向量索引中的一个候选结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// 图片在三个存储中的位置
    pub position: usize,
    /// 内积相似度
    pub score: f32,
}

/// 向量索引类型
#[derive(ValueEnum, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// 精确的内积暴力搜索
    Flat,
    /// usearch HNSW 近似搜索
    Hnsw,
}

/// 基于内积的单位向量索引
///
/// 向量的 key 即为其位置，只允许按顺序追加。
pub trait VectorIndex: Send + Sync {
    /// 向量维度
    fn dim(&self) -> usize;

    /// 向量数量
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 批量追加向量，形状为 (n, dim)
    fn add(&mut self, vectors: ArrayView2<f32>) -> Result<(), StoreError>;

    /// 返回最多 count 个与查询内积最大的向量
    ///
    /// 调用方保证 query 的维度与索引一致
    fn search(&self, query: &[f32], count: usize) -> Result<Vec<Candidate>, StoreError>;

    /// 将索引写入目录
    fn save(&self, dir: &Path) -> Result<(), StoreError>;
}

/// 创建一个空索引
pub fn create_index(kind: IndexKind, dim: usize) -> Result<Box<dyn VectorIndex>, StoreError> {
    Ok(match kind {
        IndexKind::Flat => Box::new(FlatIndex::new(dim)),
        IndexKind::Hnsw => Box::new(HnswIndex::new(dim)?),
    })
}

/// 从目录中加载索引
pub fn open_index(
    kind: IndexKind,
    dir: &Path,
    dim: usize,
) -> Result<Box<dyn VectorIndex>, StoreError> {
    Ok(match kind {
        IndexKind::Flat => Box::new(FlatIndex::open(dir)?),
        IndexKind::Hnsw => Box::new(HnswIndex::open(dir, dim)?),
    })
}

/// 在索引中搜索 count 个候选
///
/// count 超过索引大小时只返回索引中已有的数量，不会填充。
/// 结果按分数降序排列，分数相同时按位置升序。
pub fn search(
    index: &dyn VectorIndex,
    query: &[f32],
    count: usize,
) -> Result<Vec<Candidate>, QueryError> {
    if query.len() != index.dim() {
        return Err(QueryError::DimensionMismatch { expected: index.dim(), actual: query.len() });
    }
    let count = count.min(index.len());
    if count == 0 {
        return Ok(vec![]);
    }
    let mut candidates = index.search(query, count)?;
    sort_candidates(&mut candidates);
    candidates.truncate(count);
    Ok(candidates)
}

/// 为重排序预留候选：搜索 k * overfetch 个结果
pub fn search_with_overfetch(
    index: &dyn VectorIndex,
    query: &[f32],
    k: usize,
    overfetch: usize,
) -> Result<Vec<Candidate>, QueryError> {
    search(index, query, k.saturating_mul(overfetch.max(1)))
}

pub(crate) fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| match b.score.total_cmp(&a.score) {
        Ordering::Equal => a.position.cmp(&b.position),
        ord => ord,
    });
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn small_index() -> FlatIndex {
        let mut index = FlatIndex::new(2);
        let s = std::f32::consts::FRAC_1_SQRT_2;
        index.add(array![[1.0, 0.0], [0.0, 1.0], [s, s], [-1.0, 0.0]].view()).unwrap();
        index
    }

    #[test]
    fn test_search_order() {
        let index = small_index();
        let r = search(&index, &[1.0, 0.0], 3).unwrap();
        let positions = r.iter().map(|c| c.position).collect::<Vec<_>>();
        assert_eq!(positions, vec![0, 2, 1]);
        assert!((r[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_search_clamped_to_size() {
        let index = small_index();
        let r = search_with_overfetch(&index, &[0.0, 1.0], 5, DEFAULT_OVERFETCH).unwrap();
        assert_eq!(r.len(), 4);
        assert_eq!(r.last().unwrap().position, 3);
    }

    #[test]
    fn test_search_dimension_mismatch() {
        let index = small_index();
        let err = search(&index, &[1.0, 0.0, 0.0], 1).unwrap_err();
        assert!(matches!(err, QueryError::DimensionMismatch { expected: 2, actual: 3 }));
    }

    #[test]
    fn test_ties_sorted_by_position() {
        let mut c = vec![
            Candidate { position: 3, score: 0.5 },
            Candidate { position: 1, score: 0.5 },
            Candidate { position: 2, score: 0.9 },
        ];
        sort_candidates(&mut c);
        assert_eq!(c.iter().map(|c| c.position).collect::<Vec<_>>(), vec![2, 1, 3]);
    }
}
