//! 外部特征提供者
//!
//! 索引构建和查询都只依赖这里的 trait，具体的模型由调用方构造一次后以引用传入。

mod annotations;
mod color;
mod npy;

use std::path::Path;

use anyhow::Result;
pub use annotations::*;
pub use color::*;
pub use npy::*;

/// 语义向量提供者，图片和文本编码到同一个空间
pub trait Encoder: Sync {
    /// 将图片编码为单位向量
    fn encode_image(&self, path: &Path) -> Result<Vec<f32>>;

    /// 将文本编码为单位向量
    fn encode_text(&self, text: &str) -> Result<Vec<f32>>;
}

/// 颜色信号提供者
pub trait ColorExtractor: Sync {
    /// 返回图片的归一化颜色直方图
    fn extract_color_signal(&self, path: &Path) -> Result<Vec<f32>>;
}
