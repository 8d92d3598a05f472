use crate::narrative::entity::NarrativeRequest;
use crate::narrative::error::NarrativeError;
use async_trait::async_trait;

/// # Summary
/// 叙述性报告生成器（外部大模型服务）。
///
/// # Invariants
/// - 输出为不透明的 markdown 文本，核心流程不解析其内容。
#[async_trait]
pub trait Narrator: Send + Sync {
    /// # Summary
    /// 基于行情与资金上下文生成 markdown 诊断报告。
    ///
    /// # Arguments
    /// * `request`: 生成上下文。
    ///
    /// # Returns
    /// 成功返回 markdown 文本。
    async fn narrate(&self, request: &NarrativeRequest) -> Result<String, NarrativeError>;
}
