use std::sync::{Arc, RwLock};
use std::time::Instant;

use log::{debug, info};

use crate::config::ConfDir;
use crate::error::{QueryError, StoreError};
use crate::index::{self, DEFAULT_OVERFETCH};
use crate::intent::{QueryIntent, extract_query_intent};
use crate::provider::Encoder;
use crate::rerank::{SearchResult, rerank};
use crate::store::IndexSet;

/// 默认返回的结果数量
pub const DEFAULT_COUNT: usize = 5;

pub struct RetrieverBuilder {
    conf_dir: ConfDir,
    overfetch: usize,
}

impl RetrieverBuilder {
    pub fn new(conf_dir: ConfDir) -> Self {
        Self { conf_dir, overfetch: DEFAULT_OVERFETCH }
    }

    /// 候选集扩大倍数
    pub fn overfetch(mut self, overfetch: usize) -> Self {
        self.overfetch = overfetch;
        self
    }

    /// 加载 CURRENT 指向的索引
    pub fn open(self) -> Result<Retriever, StoreError> {
        let stores = IndexSet::open(&self.conf_dir)?;
        info!("已加载索引，共 {} 张图片", stores.len());
        Ok(Retriever {
            conf_dir: Some(self.conf_dir),
            stores: RwLock::new(Arc::new(stores)),
            overfetch: self.overfetch,
        })
    }
}

/// 文本检索图片
///
/// 索引加载后只读，多个查询可以并发共享同一份数据。
/// [`Retriever::reload`] 会整体替换索引，正在进行的查询继续使用旧的快照。
pub struct Retriever {
    conf_dir: Option<ConfDir>,
    stores: RwLock<Arc<IndexSet>>,
    overfetch: usize,
}

impl Retriever {
    /// 使用已经在内存中的索引
    pub fn from_index_set(stores: IndexSet) -> Self {
        Self { conf_dir: None, stores: RwLock::new(Arc::new(stores)), overfetch: DEFAULT_OVERFETCH }
    }

    pub fn with_overfetch(mut self, overfetch: usize) -> Self {
        self.overfetch = overfetch;
        self
    }

    /// 当前索引的快照
    pub fn snapshot(&self) -> Arc<IndexSet> {
        // 写锁内只做赋值，中毒后的数据仍然可用
        match self.stores.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// 原子替换为新的索引
    pub fn swap(&self, stores: IndexSet) {
        let stores = Arc::new(stores);
        match self.stores.write() {
            Ok(mut guard) => *guard = stores,
            Err(poisoned) => *poisoned.into_inner() = stores,
        }
    }

    /// 重新加载 CURRENT 指向的索引
    ///
    /// 使用 [`Retriever::from_index_set`] 创建时没有索引目录，不做任何事并返回 false
    pub fn reload(&self) -> Result<bool, StoreError> {
        let Some(conf_dir) = &self.conf_dir else {
            return Ok(false);
        };
        let stores = IndexSet::open(conf_dir)?;
        info!("重新加载索引，共 {} 张图片", stores.len());
        self.swap(stores);
        Ok(true)
    }

    /// 使用文本搜索图片，返回最多 k 个结果
    pub fn search(
        &self,
        encoder: &dyn Encoder,
        query: &str,
        k: usize,
    ) -> Result<Vec<SearchResult>, QueryError> {
        let embedding = encoder.encode_text(query).map_err(QueryError::Encoder)?;
        let intent = extract_query_intent(query);
        debug!("query intent: {:?}", intent);
        self.search_embedding(&embedding, &intent, k)
    }

    /// 使用已经编码好的查询向量和意图搜索
    pub fn search_embedding(
        &self,
        embedding: &[f32],
        intent: &QueryIntent,
        k: usize,
    ) -> Result<Vec<SearchResult>, QueryError> {
        let start = Instant::now();
        let stores = self.snapshot();
        let candidates =
            index::search_with_overfetch(stores.index(), embedding, k, self.overfetch)?;
        debug!("{} candidates in {:.2}ms", candidates.len(), start.elapsed().as_secs_f32() * 1e3);
        let results = rerank(&candidates, intent, stores.colors(), stores.catalog(), k)?;
        debug!("search time: {:.2}ms", start.elapsed().as_secs_f32() * 1e3);
        Ok(results)
    }
}
