use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// # Summary
/// 资金流向记录的粒度标签。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FlowGranularity {
    // 日线（历史）
    Daily,
    // 当日分时
    Intraday,
}

/// # Summary
/// 单条资金流向记录。
///
/// # Invariants
/// - 所有金额单位统一为亿元，正数表示净流入，负数表示净流出。
/// - 日线与分时记录结构相同，仅以 `granularity` 区分。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalFlowRecord {
    // 记录时间（日线记录时间部分为 00:00:00）
    pub timestamp: NaiveDateTime,
    // 粒度
    pub granularity: FlowGranularity,
    // 整体净流入
    pub net_inflow: f64,
    // 主力净流入（超大单 + 大单）
    pub main_net_inflow: f64,
    // 超大单净流入
    pub super_net_inflow: f64,
    // 大单净流入
    pub big_net_inflow: f64,
    // 中单净流入
    pub mid_net_inflow: f64,
    // 小单净流入
    pub small_net_inflow: f64,
}

/// # Summary
/// 按订单规模划分的四档金额。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBuckets {
    pub super_: f64,
    pub big: f64,
    pub mid: f64,
    pub small: f64,
}

impl OrderBuckets {
    /// 主力部分（超大单 + 大单）
    pub fn main(&self) -> f64 {
        self.super_ + self.big
    }

    /// 散户部分（中单 + 小单）
    pub fn retail(&self) -> f64 {
        self.mid + self.small
    }

    pub fn total(&self) -> f64 {
        self.main() + self.retail()
    }
}

/// # Summary
/// 资金分布快照，记录各档位的流入与流出金额。
///
/// # Invariants
/// - 金额单位为亿元，流入流出均为非负数。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalDistributionSnapshot {
    // 数据更新时间
    pub update_time: NaiveDateTime,
    // 各档流入
    pub inflow: OrderBuckets,
    // 各档流出
    pub outflow: OrderBuckets,
}
