use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use crate::error::BuildError;

#[derive(Deserialize)]
struct RawAnnotations {
    images: Vec<RawImage>,
    #[serde(default)]
    annotations: Vec<RawAnnotation>,
}

#[derive(Deserialize)]
struct RawImage {
    id: u64,
    file_name: String,
}

#[derive(Deserialize)]
struct RawAnnotation {
    image_id: u64,
    #[serde(default)]
    attribute_ids: Vec<u64>,
}

/// Fashionpedia 格式的标注
#[derive(Debug, Clone, Default)]
pub struct Annotations {
    /// 文件名 -> 图片 ID
    file_to_image_id: HashMap<String, u64>,
    /// 图片 ID -> 属性 ID
    image_id_to_attrs: HashMap<u64, Vec<u64>>,
}

impl Annotations {
    pub fn new(
        file_to_image_id: HashMap<String, u64>,
        image_id_to_attrs: HashMap<u64, Vec<u64>>,
    ) -> Self {
        Self { file_to_image_id, image_id_to_attrs }
    }

    pub fn image_id(&self, filename: &str) -> Option<u64> {
        self.file_to_image_id.get(filename).copied()
    }

    pub fn attributes(&self, image_id: u64) -> &[u64] {
        self.image_id_to_attrs.get(&image_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 按文件名查找图片 ID 和属性，找不到时返回 (None, [])
    pub fn lookup(&self, filename: &str) -> (Option<u64>, Vec<u64>) {
        match self.image_id(filename) {
            Some(id) => (Some(id), self.attributes(id).to_vec()),
            None => (None, vec![]),
        }
    }

    pub fn len(&self) -> usize {
        self.file_to_image_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file_to_image_id.is_empty()
    }
}

/// 加载标注文件
///
/// 同一张图片有多条标注时，后出现的覆盖先出现的
pub fn load_annotations(path: impl AsRef<Path>) -> Result<Annotations, BuildError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(BuildError::SourceNotFound(path.to_path_buf()));
    }
    let raw: RawAnnotations = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    Ok(parse(raw))
}

/// 从 JSON 字符串解析标注
pub fn parse_annotations(s: &str) -> Result<Annotations, BuildError> {
    Ok(parse(serde_json::from_str(s)?))
}

fn parse(raw: RawAnnotations) -> Annotations {
    let image_id_to_attrs =
        raw.annotations.into_iter().map(|ann| (ann.image_id, ann.attribute_ids)).collect();
    let file_to_image_id = raw.images.into_iter().map(|img| (img.file_name, img.id)).collect();
    Annotations { file_to_image_id, image_id_to_attrs }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "images": [
            {"id": 3020, "file_name": "abc.jpg", "width": 640},
            {"id": 7, "file_name": "plain.png"}
        ],
        "annotations": [
            {"image_id": 3020, "attribute_ids": [1, 2]},
            {"image_id": 3020, "attribute_ids": [106, 114, 127]},
            {"image_id": 99, "category_id": 3}
        ]
    }"#;

    #[test]
    fn test_parse() {
        let ann = parse_annotations(SAMPLE).unwrap();
        assert_eq!(ann.len(), 2);
        assert_eq!(ann.lookup("abc.jpg"), (Some(3020), vec![106, 114, 127]));
        assert_eq!(ann.lookup("plain.png"), (Some(7), vec![]));
        assert_eq!(ann.lookup("missing.jpg"), (None, vec![]));
        assert_eq!(ann.attributes(99), &[] as &[u64]);
    }

    #[test]
    fn test_missing_file() {
        let r = load_annotations("/nonexistent/annotations.json");
        assert!(matches!(r, Err(BuildError::SourceNotFound(_))));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(parse_annotations("{"), Err(BuildError::Annotations(_))));
    }
}
