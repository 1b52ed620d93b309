use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indicatif::{ParallelProgressIterator, ProgressBar};
use log::{info, warn};
use rayon::prelude::*;
use regex::Regex;
use walkdir::WalkDir;

use crate::error::{BuildError, VectorKind};
use crate::index::IndexKind;
use crate::provider::{Annotations, ColorExtractor, Encoder, load_annotations};
use crate::store::{ImageMeta, ImageRecord, IndexSet};
use crate::utils::{l1_normalize, l2_normalize, pb_style, suffix_regex};

/// 默认识别的图片后缀
pub const DEFAULT_SUFFIX: &str = "jpg,jpeg,png";

/// 一张已经编码完成的图片
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub path: PathBuf,
    pub filename: String,
    pub embedding: Vec<f32>,
    pub color_signal: Vec<f32>,
}

/// 扫描目录下（不递归）所有后缀匹配的图片，按文件名排序
pub fn scan_images(root: &Path, suffix: &Regex) -> Result<Vec<PathBuf>, BuildError> {
    if !root.is_dir() {
        return Err(BuildError::SourceNotFound(root.to_path_buf()));
    }
    let mut images = vec![];
    for entry in WalkDir::new(root).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        match path.extension() {
            Some(ext) if suffix.is_match(&ext.to_string_lossy()) => {
                images.push(path.to_path_buf());
            }
            _ => {}
        }
    }
    Ok(images)
}

/// 索引构建器
///
/// 每张图片的编码互相独立，使用 rayon 并行计算；
/// 位置在收集结果后按扫描顺序分配，保证三个存储对齐。
pub struct IndexBuilder<'a> {
    encoder: &'a dyn Encoder,
    color: &'a dyn ColorExtractor,
    annotations: Option<Annotations>,
    suffix: Regex,
    kind: IndexKind,
    progress: bool,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(encoder: &'a dyn Encoder, color: &'a dyn ColorExtractor) -> Self {
        Self {
            encoder,
            color,
            annotations: None,
            suffix: suffix_regex(DEFAULT_SUFFIX).expect("failed to build regex"),
            kind: IndexKind::Flat,
            progress: false,
        }
    }

    pub fn annotations(mut self, annotations: Annotations) -> Self {
        self.annotations = Some(annotations);
        self
    }

    pub fn suffix(mut self, suffix: Regex) -> Self {
        self.suffix = suffix;
        self
    }

    pub fn kind(mut self, kind: IndexKind) -> Self {
        self.kind = kind;
        self
    }

    /// 是否显示进度条
    pub fn progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// 扫描目录并构建索引
    pub fn build(&self, root: &Path) -> Result<IndexSet, BuildError> {
        let images = scan_images(root, &self.suffix)?;
        info!("扫描完成，共 {} 张图片", images.len());
        let encoded = self.encode(&images);
        self.assemble(encoded)
    }

    /// 并行编码图片，失败的图片会被跳过
    pub fn encode(&self, images: &[PathBuf]) -> Vec<EncodedImage> {
        let pb = if self.progress {
            ProgressBar::new(images.len() as u64).with_style(pb_style())
        } else {
            ProgressBar::hidden()
        };
        let encoded = images
            .par_iter()
            .progress_with(pb.clone())
            .filter_map(|path| match self.encode_one(path) {
                Ok(image) => Some(image),
                Err(e) => {
                    warn!("跳过图片 {}: {:#}", path.display(), e);
                    None
                }
            })
            .collect::<Vec<_>>();
        pb.finish_with_message("图片编码完成");
        encoded
    }

    fn encode_one(&self, path: &Path) -> anyhow::Result<EncodedImage> {
        let filename = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .ok_or_else(|| anyhow::anyhow!("无效的文件名"))?;
        let embedding = self.encoder.encode_image(path)?;
        let color_signal = self.color.extract_color_signal(path)?;
        Ok(EncodedImage { path: path.to_path_buf(), filename, embedding, color_signal })
    }

    /// 按顺序为编码结果分配位置并创建索引
    pub fn assemble(&self, encoded: Vec<EncodedImage>) -> Result<IndexSet, BuildError> {
        let mut seen = HashSet::new();
        let mut records: Vec<ImageRecord> = Vec::with_capacity(encoded.len());
        let mut dims: Option<(usize, usize)> = None;

        for mut image in encoded {
            if !l2_normalize(&mut image.embedding) || !l1_normalize(&mut image.color_signal) {
                warn!("跳过图片 {}: 向量为零或包含无效值", image.path.display());
                continue;
            }

            let actual = (image.embedding.len(), image.color_signal.len());
            let expected = *dims.get_or_insert(actual);
            if actual != expected {
                let (kind, expected, actual) = if actual.0 != expected.0 {
                    (VectorKind::Embedding, expected.0, actual.0)
                } else {
                    (VectorKind::Color, expected.1, actual.1)
                };
                return Err(BuildError::InconsistentDimension {
                    path: image.path,
                    kind,
                    expected,
                    actual,
                });
            }

            if !seen.insert(image.filename.clone()) {
                return Err(BuildError::DuplicateFilename(image.filename));
            }

            let (image_id, attribute_ids) = match &self.annotations {
                Some(annotations) => annotations.lookup(&image.filename),
                None => (None, vec![]),
            };

            records.push(ImageRecord {
                position: records.len(),
                meta: ImageMeta { filename: image.filename, image_id, attribute_ids },
                embedding: image.embedding,
                color_signal: image.color_signal,
            });
        }

        if records.is_empty() {
            return Err(BuildError::EmptyCollection);
        }
        info!("共索引 {} 张图片", records.len());
        Ok(IndexSet::from_records(self.kind, records)?)
    }
}

/// 构建索引
///
/// 标注文件不存在时返回 [`BuildError::SourceNotFound`]
pub fn build(
    collection_root: &Path,
    annotation_source: Option<&Path>,
    encoder: &dyn Encoder,
    color_extractor: &dyn ColorExtractor,
) -> Result<IndexSet, BuildError> {
    if !collection_root.is_dir() {
        return Err(BuildError::SourceNotFound(collection_root.to_path_buf()));
    }
    let mut builder = IndexBuilder::new(encoder, color_extractor);
    if let Some(path) = annotation_source {
        let annotations = load_annotations(path)?;
        info!("加载了 {} 张图片的标注", annotations.len());
        builder = builder.annotations(annotations);
    }
    builder.build(collection_root)
}
