use serde::Serialize;

use crate::error::ScoreError;
use crate::index::Candidate;
use crate::intent::QueryIntent;
use crate::store::{Catalog, ColorStore};

/// 命中 formal / casual 时的乘法加权，两者可以叠加
pub const CONTEXT_BOOST: f32 = 1.1;

/// 触发上下文加权的关键词
pub const BOOSTED_CONTEXT: [&str; 2] = ["formal", "casual"];

/// 颜色直方图最大桶的加分系数
pub const COLOR_WEIGHT: f32 = 0.05;

/// 一条搜索结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub filename: String,
    pub score: f32,
}

/// 计算单个候选的最终分数
///
/// 颜色加分只看直方图中最大的桶，与命中的是哪种颜色无关
pub fn fuse_score(raw_score: f32, intent: &QueryIntent, max_bin: f32) -> f32 {
    let mut score = raw_score;
    for word in BOOSTED_CONTEXT {
        if intent.has_context(word) {
            score *= CONTEXT_BOOST;
        }
    }
    if intent.has_colors() {
        score += COLOR_WEIGHT * max_bin;
    }
    score
}

/// 对候选进行软重排序，返回前 k 个结果
///
/// 排序是稳定的，分数相同的候选保持输入顺序。
pub fn rerank(
    candidates: &[Candidate],
    intent: &QueryIntent,
    colors: &ColorStore,
    catalog: &Catalog,
    k: usize,
) -> Result<Vec<SearchResult>, ScoreError> {
    let mut results = candidates
        .iter()
        .map(|c| -> Result<SearchResult, ScoreError> {
            let missing = ScoreError::MissingRecord { position: c.position };
            let meta = catalog.get(c.position).ok_or(missing.clone())?;
            let max_bin = colors.max_bin(c.position).ok_or(missing)?;
            let score = fuse_score(c.score, intent, max_bin);
            Ok(SearchResult { filename: meta.filename.clone(), score })
        })
        .collect::<Result<Vec<_>, _>>()?;

    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(k);
    Ok(results)
}
