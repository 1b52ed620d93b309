use serde::Serialize;

/// 颜色关键词表
pub const COLOR_WORDS: [&str; 10] =
    ["red", "blue", "yellow", "white", "black", "green", "brown", "purple", "pink", "orange"];

/// 场景/风格关键词表
pub const CONTEXT_WORDS: [&str; 9] =
    ["office", "park", "street", "city", "home", "formal", "casual", "business", "party"];

/// 从查询文本中提取的弱语义意图
///
/// 仅用于软重排序，不会过滤任何结果。关键词按照词表顺序排列，而不是查询中出现的顺序。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryIntent {
    pub colors: Vec<&'static str>,
    pub context: Vec<&'static str>,
}

impl QueryIntent {
    pub fn has_context(&self, word: &str) -> bool {
        self.context.contains(&word)
    }

    pub fn has_colors(&self) -> bool {
        !self.colors.is_empty()
    }
}

/// 提取查询意图
///
/// 将查询转为小写后对两个词表做子串匹配，因此 "redo" 也会命中 "red"。
pub fn extract_query_intent(query: &str) -> QueryIntent {
    let query = query.to_lowercase();
    let matched = |words: &[&'static str]| {
        words.iter().copied().filter(|w| query.contains(w)).collect::<Vec<_>>()
    };
    QueryIntent { colors: matched(&COLOR_WORDS), context: matched(&CONTEXT_WORDS) }
}
