use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use ndarray::Array1;
use ndarray_npy::read_npy;

use super::Encoder;
use crate::utils::l2_normalize;

/// 读取预先计算好的向量文件
///
/// 目录结构：
/// - 图片：`<dir>/<文件名>.npy`，如 `abc.jpg.npy`
/// - 文本：`<dir>/text/<blake3(文本)>.npy`
///
/// 设置了查询向量时，`encode_text` 直接返回该向量
pub struct NpyEmbeddings {
    dir: PathBuf,
    query: Option<Vec<f32>>,
}

impl NpyEmbeddings {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), query: None }
    }

    /// 使用固定的查询向量
    pub fn with_query(mut self, query: Vec<f32>) -> Self {
        self.query = Some(query);
        self
    }

    /// 图片向量文件路径
    pub fn image_path(&self, image: &Path) -> Result<PathBuf> {
        let name = image
            .file_name()
            .ok_or_else(|| anyhow!("无效的图片路径: {}", image.display()))?;
        let mut name = name.to_os_string();
        name.push(".npy");
        Ok(self.dir.join(name))
    }

    /// 文本向量文件路径
    pub fn text_path(&self, text: &str) -> PathBuf {
        let hash = blake3::hash(text.as_bytes());
        self.dir.join("text").join(format!("{}.npy", hash.to_hex()))
    }
}

/// 读取一维 f32 向量
pub fn read_vector(path: &Path) -> Result<Vec<f32>> {
    let v: Array1<f32> =
        read_npy(path).with_context(|| format!("读取向量失败: {}", path.display()))?;
    Ok(v.to_vec())
}

impl Encoder for NpyEmbeddings {
    fn encode_image(&self, path: &Path) -> Result<Vec<f32>> {
        read_vector(&self.image_path(path)?)
    }

    fn encode_text(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = match &self.query {
            Some(query) => query.clone(),
            None => read_vector(&self.text_path(text))?,
        };
        if !l2_normalize(&mut v) {
            return Err(anyhow!("查询向量为零或包含无效值: {}", text));
        }
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use ndarray::array;
    use ndarray_npy::write_npy;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_image_and_text_lookup() {
        let dir = TempDir::new().unwrap();
        let emb = NpyEmbeddings::new(dir.path());

        write_npy(dir.path().join("a.jpg.npy"), &array![0.6f32, 0.8]).unwrap();
        fs::create_dir(dir.path().join("text")).unwrap();
        write_npy(emb.text_path("red dress"), &array![1.0f32, 0.0]).unwrap();

        assert_eq!(emb.encode_image(Path::new("/photos/a.jpg")).unwrap(), vec![0.6, 0.8]);
        assert_eq!(emb.encode_text("red dress").unwrap(), vec![1.0, 0.0]);
        assert!(emb.encode_text("blue dress").is_err());
        assert!(emb.encode_image(Path::new("b.jpg")).is_err());
    }

    #[test]
    fn test_fixed_query() {
        let emb = NpyEmbeddings::new("/nonexistent").with_query(vec![0.0, 1.0]);
        assert_eq!(emb.encode_text("anything").unwrap(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_text_normalized() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("text")).unwrap();
        let emb = NpyEmbeddings::new(dir.path());
        write_npy(emb.text_path("red shirt"), &array![3.0f32, 4.0]).unwrap();
        assert_eq!(emb.encode_text("red shirt").unwrap(), vec![0.6, 0.8]);

        let emb = emb.with_query(vec![10.0, 0.0]);
        assert_eq!(emb.encode_text("red shirt").unwrap(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_invalid_query_rejected() {
        let emb = NpyEmbeddings::new("/nonexistent").with_query(vec![0.0, 0.0]);
        assert!(emb.encode_text("anything").is_err());
        let emb = NpyEmbeddings::new("/nonexistent").with_query(vec![f32::NAN, 1.0]);
        assert!(emb.encode_text("anything").is_err());
    }
}
