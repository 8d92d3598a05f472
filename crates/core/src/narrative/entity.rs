use crate::flow::entity::CapitalFlowRecord;
use crate::market::entity::EnrichedBar;
use serde::Serialize;

/// # Summary
/// 生成叙述性诊断报告所需的上下文。
#[derive(Debug, Clone, Serialize)]
pub struct NarrativeRequest {
    // "CODE.MARKET" 形式的证券代码
    pub symbol: String,
    // 最近若干根已计算指标的 K 线
    pub recent_bars: Vec<EnrichedBar>,
    // 日线与分时资金流向记录
    pub flow: Vec<CapitalFlowRecord>,
    // 资讯标题
    pub headlines: Vec<String>,
}
