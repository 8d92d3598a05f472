use crate::common::Symbol;
use crate::flow::entity::{CapitalDistributionSnapshot, CapitalFlowRecord, FlowGranularity};
use crate::flow::error::FlowError;
use async_trait::async_trait;

/// # Summary
/// 资金流向与资金分布数据源接口。
///
/// # Invariants
/// - 返回金额必须已换算为亿元。
/// - 实现者自行负责超时控制。
#[async_trait]
pub trait CapitalFlowProvider: Send + Sync {
    /// # Summary
    /// 获取资金流向记录。
    ///
    /// # Logic
    /// 1. 按粒度请求日线历史（约一年）或当日分时资金流向。
    /// 2. 换算金额单位并按时间升序返回。
    ///
    /// # Arguments
    /// * `symbol`: 证券代码。
    /// * `granularity`: 日线或分时。
    ///
    /// # Returns
    /// 成功返回按时间升序排列的记录列表。
    async fn fetch_flow(
        &self,
        symbol: &Symbol,
        granularity: FlowGranularity,
    ) -> Result<Vec<CapitalFlowRecord>, FlowError>;

    /// # Summary
    /// 获取最新的资金分布快照。
    ///
    /// # Arguments
    /// * `symbol`: 证券代码。
    ///
    /// # Returns
    /// 成功返回快照；数据源无数据时返回 `Ok(None)`。
    async fn fetch_distribution(
        &self,
        symbol: &Symbol,
    ) -> Result<Option<CapitalDistributionSnapshot>, FlowError>;
}
