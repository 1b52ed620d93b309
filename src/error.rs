use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// 构建索引时的错误
#[derive(Debug, Error)]
pub enum BuildError {
    /// 图片目录或标注文件不存在
    #[error("路径不存在: {}", .0.display())]
    SourceNotFound(PathBuf),
    /// 没有任何图片被成功处理
    #[error("没有处理任何图片，请检查图片后缀或路径")]
    EmptyCollection,
    #[error("重复的文件名: {0}")]
    DuplicateFilename(String),
    #[error("{}: {kind}维度不一致，期望 {expected}，实际 {actual}", .path.display())]
    InconsistentDimension { path: PathBuf, kind: VectorKind, expected: usize, actual: usize },
    #[error("解析标注文件失败: {0}")]
    Annotations(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// 维度不一致的是哪一种向量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorKind {
    Embedding,
    Color,
}

impl fmt::Display for VectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VectorKind::Embedding => write!(f, "语义向量"),
            VectorKind::Color => write!(f, "颜色直方图"),
        }
    }
}

/// 索引文件读写时的错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 尚未构建过索引
    #[error("索引不存在，请先运行 build: {}", .0.display())]
    NotBuilt(PathBuf),
    /// 三个存储的长度不一致
    #[error("索引文件不一致: 向量 {vectors} 条，颜色 {colors} 条，元数据 {catalog} 条")]
    Misaligned { vectors: usize, colors: usize, catalog: usize },
    #[error("索引中没有任何图片")]
    Empty,
    #[error("manifest 与索引文件不符: {0}")]
    ManifestMismatch(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("读取 npy 文件失败: {0}")]
    ReadNpy(#[from] ndarray_npy::ReadNpyError),
    #[error("写入 npy 文件失败: {0}")]
    WriteNpy(#[from] ndarray_npy::WriteNpyError),
    #[error("读写元数据失败: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("读写 manifest 失败: {0}")]
    Json(#[from] serde_json::Error),
    #[error("usearch 错误: {0}")]
    Usearch(String),
}

/// 单次查询中的错误，不影响索引状态
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("查询向量维度不匹配，期望 {expected}，实际 {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("编码查询失败: {0}")]
    Encoder(anyhow::Error),
}

/// 重排序时的错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScoreError {
    /// 向量索引中存在，但颜色或元数据中缺失
    #[error("位置 {position} 在颜色或元数据存储中不存在")]
    MissingRecord { position: usize },
}
