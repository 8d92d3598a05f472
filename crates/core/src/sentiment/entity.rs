use serde::{Deserialize, Serialize};

/// # Summary
/// 单条资讯的情绪倾向。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

/// # Summary
/// 已完成情绪标注的资讯条目。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentItem {
    // 资讯标题
    pub title: String,
    pub sentiment: Sentiment,
}
