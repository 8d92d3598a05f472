use crate::common::Symbol;
use crate::sentiment::entity::SentimentItem;
use crate::sentiment::error::SentimentError;
use async_trait::async_trait;

/// # Summary
/// 资讯情绪摘要的来源（可选协作方）。
///
/// # Invariants
/// - 只返回已标注情绪的条目，抓取与标注均由实现者负责。
#[async_trait]
pub trait SentimentSource: Send + Sync {
    /// # Summary
    /// 获取证券最新的资讯情绪列表。
    ///
    /// # Arguments
    /// * `symbol`: 证券代码。
    ///
    /// # Returns
    /// 成功返回条目列表（可能为空）。
    async fn fetch_sentiment(&self, symbol: &Symbol) -> Result<Vec<SentimentItem>, SentimentError>;
}
