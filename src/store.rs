use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use ndarray::{Array2, ArrayView1};
use ndarray_npy::{read_npy, write_npy};
use serde::{Deserialize, Serialize};

use crate::config::ConfDir;
use crate::error::StoreError;
use crate::index::{IndexKind, VectorIndex, create_index, open_index};

const MANIFEST_FILE: &str = "manifest.json";
const CATALOG_FILE: &str = "catalog.bin";
const COLORS_FILE: &str = "colors.npy";
const MANIFEST_VERSION: u32 = 1;

/// 发布新索引后保留的 generation 数量
///
/// 保留上一个 generation，已经读取了旧 CURRENT 的进程仍然可以加载它
const KEEP_GENERATIONS: usize = 2;

/// 一张图片的元数据
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ImageMeta {
    pub filename: String,
    /// 标注中的图片 ID，没有标注时为 None
    pub image_id: Option<u64>,
    /// 属性 ID，目前不参与评分
    pub attribute_ids: Vec<u64>,
}

/// 一张待索引的图片
#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub position: usize,
    pub meta: ImageMeta,
    /// 单位向量
    pub embedding: Vec<f32>,
    /// 归一化的颜色直方图
    pub color_signal: Vec<f32>,
}

/// 按位置排列的元数据
#[derive(Debug, Clone, Default)]
pub struct Catalog(Vec<ImageMeta>);

impl Catalog {
    pub fn new(records: Vec<ImageMeta>) -> Self {
        Self(records)
    }

    pub fn get(&self, position: usize) -> Option<&ImageMeta> {
        self.0.get(position)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageMeta> {
        self.0.iter()
    }

    fn save(&self, path: &Path) -> Result<(), StoreError> {
        let writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(writer, &self.0)?;
        Ok(())
    }

    fn open(path: &Path) -> Result<Self, StoreError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(Self(bincode::deserialize_from(reader)?))
    }
}

/// 按位置排列的颜色直方图，形状为 (n, bins)
#[derive(Debug, Clone)]
pub struct ColorStore(Array2<f32>);

impl ColorStore {
    pub fn new(colors: Array2<f32>) -> Self {
        Self(colors)
    }

    pub fn get(&self, position: usize) -> Option<ArrayView1<f32>> {
        (position < self.0.nrows()).then(|| self.0.row(position))
    }

    /// 直方图中最大的桶
    pub fn max_bin(&self, position: usize) -> Option<f32> {
        self.get(position).map(|row| row.iter().copied().fold(0.0, f32::max))
    }

    pub fn len(&self) -> usize {
        self.0.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bins(&self) -> usize {
        self.0.ncols()
    }
}

/// 描述一个 generation 中的文件
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub version: u32,
    pub kind: IndexKind,
    /// 向量维度
    pub dim: usize,
    /// 颜色直方图分桶数量
    pub bins: usize,
    /// 图片数量
    pub count: usize,
}

/// 三个按位置对齐的存储：向量索引、颜色直方图、元数据
pub struct IndexSet {
    manifest: Manifest,
    index: Box<dyn VectorIndex>,
    colors: ColorStore,
    catalog: Catalog,
}

impl IndexSet {
    /// 使用按位置排列的记录创建索引
    ///
    /// 调用方保证记录的位置连续，维度一致
    pub fn from_records(kind: IndexKind, records: Vec<ImageRecord>) -> Result<Self, StoreError> {
        let Some(first) = records.first() else {
            return Err(StoreError::Empty);
        };
        let (n, dim, bins) = (records.len(), first.embedding.len(), first.color_signal.len());

        let mut embeddings = Array2::zeros((n, dim));
        let mut colors = Array2::zeros((n, bins));
        let mut catalog = Vec::with_capacity(n);
        for (i, record) in records.into_iter().enumerate() {
            if record.position != i {
                return Err(StoreError::ManifestMismatch(format!(
                    "记录位置 {} 与顺序 {} 不一致",
                    record.position, i
                )));
            }
            if record.embedding.len() != dim || record.color_signal.len() != bins {
                return Err(StoreError::ManifestMismatch(format!(
                    "{} 的向量维度与第一条记录不一致",
                    record.meta.filename
                )));
            }
            embeddings.row_mut(i).assign(&ArrayView1::from(record.embedding.as_slice()));
            colors.row_mut(i).assign(&ArrayView1::from(record.color_signal.as_slice()));
            catalog.push(record.meta);
        }

        let mut index = create_index(kind, dim)?;
        index.add(embeddings.view())?;

        let manifest = Manifest { version: MANIFEST_VERSION, kind, dim, bins, count: n };
        Self::new(manifest, index, ColorStore::new(colors), Catalog::new(catalog))
    }

    fn new(
        manifest: Manifest,
        index: Box<dyn VectorIndex>,
        colors: ColorStore,
        catalog: Catalog,
    ) -> Result<Self, StoreError> {
        let (vectors, ncolors, ncatalog) = (index.len(), colors.len(), catalog.len());
        if vectors != ncolors || vectors != ncatalog || vectors != manifest.count {
            return Err(StoreError::Misaligned { vectors, colors: ncolors, catalog: ncatalog });
        }
        if vectors == 0 {
            return Err(StoreError::Empty);
        }
        if index.dim() != manifest.dim || colors.bins() != manifest.bins {
            return Err(StoreError::ManifestMismatch(format!(
                "manifest 维度为 {}x{}，实际为 {}x{}",
                manifest.dim,
                manifest.bins,
                index.dim(),
                colors.bins()
            )));
        }
        Ok(Self { manifest, index, colors, catalog })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn index(&self) -> &dyn VectorIndex {
        self.index.as_ref()
    }

    pub fn colors(&self) -> &ColorStore {
        &self.colors
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn len(&self) -> usize {
        self.manifest.count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 将所有文件写入目录
    pub fn save(&self, dir: &Path) -> Result<(), StoreError> {
        fs::create_dir_all(dir)?;
        self.index.save(dir)?;
        write_npy(dir.join(COLORS_FILE), &self.colors.0)?;
        self.catalog.save(&dir.join(CATALOG_FILE))?;
        // manifest 最后写入，没有 manifest 的目录视为不完整
        let writer = BufWriter::new(File::create(dir.join(MANIFEST_FILE))?);
        serde_json::to_writer_pretty(writer, &self.manifest)?;
        Ok(())
    }

    /// 从目录加载所有文件，并检查三个存储是否对齐
    pub fn load(dir: &Path) -> Result<Self, StoreError> {
        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Err(StoreError::NotBuilt(dir.to_path_buf()));
        }
        let manifest: Manifest = serde_json::from_reader(BufReader::new(File::open(manifest_path)?))?;
        if manifest.version != MANIFEST_VERSION {
            return Err(StoreError::ManifestMismatch(format!(
                "不支持的版本 {}",
                manifest.version
            )));
        }
        debug!("loading {:?} index from {}", manifest.kind, dir.display());

        let index = open_index(manifest.kind, dir, manifest.dim)?;
        let colors: Array2<f32> = read_npy(dir.join(COLORS_FILE))?;
        let catalog = Catalog::open(&dir.join(CATALOG_FILE))?;
        Self::new(manifest, index, ColorStore::new(colors), catalog)
    }

    /// 加载 CURRENT 指向的 generation
    pub fn open(conf_dir: &ConfDir) -> Result<Self, StoreError> {
        let dir = conf_dir
            .current_generation()
            .ok_or_else(|| StoreError::NotBuilt(conf_dir.path().to_path_buf()))?;
        Self::load(&dir)
    }

    /// 写入新的 generation，并原子替换 CURRENT
    ///
    /// 正在进行的查询持有旧的内存数据，不会看到写了一半的文件
    pub fn publish(&self, conf_dir: &ConfDir) -> Result<PathBuf, StoreError> {
        fs::create_dir_all(conf_dir.path())?;
        let n = conf_dir.next_generation();
        let tmp = conf_dir.generation_tmp(n);
        if tmp.exists() {
            fs::remove_dir_all(&tmp)?;
        }

        let saved = self.save(&tmp);
        if let Err(e) = saved {
            let _ = fs::remove_dir_all(&tmp);
            return Err(e);
        }
        let dir = conf_dir.generation(n);
        fs::rename(&tmp, &dir)?;

        let name = dir.file_name().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        fs::write(conf_dir.current_tmp(), &name)?;
        fs::rename(conf_dir.current_tmp(), conf_dir.current())?;
        info!("已发布索引 {}，共 {} 张图片", name, self.len());

        let gens = conf_dir.all_generations();
        for &old in gens.iter().rev().skip(KEEP_GENERATIONS) {
            let path = conf_dir.generation(old);
            if let Err(e) = fs::remove_dir_all(&path) {
                warn!("清理旧索引失败: {}: {}", path.display(), e);
            }
        }

        Ok(dir)
    }
}
