use crate::common::Market;
use crate::market::entity::{BarSeries, HistoryReply, NativeRecord};
use crate::market::error::MarketError;
use async_trait::async_trait;
use chrono::NaiveDate;

/// # Summary
/// 主行情数据源接口（原始数据源）。
///
/// # Invariants
/// - 实现者自行负责超时控制，超时视为一次硬失败，不在内部重试。
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// # Summary
    /// 获取指定区间内的日 K 线。
    ///
    /// # Logic
    /// 1. 将证券代码映射为数据源可识别的形式。
    /// 2. 请求 `[start, end]` 区间内最多 `max_bars` 根日线。
    /// 3. 将数据源结果转换为规范 K 线并附带状态码返回。
    ///
    /// # Arguments
    /// * `code`: 证券代码。
    /// * `market`: 所属市场。
    /// * `start`: 开始日期（包含）。
    /// * `end`: 结束日期（包含）。
    /// * `max_bars`: 返回数量上限。
    ///
    /// # Returns
    /// 成功返回 `(status, rows)`，网络或解析失败返回 MarketError。
    async fn request_history(
        &self,
        code: &str,
        market: Market,
        start: NaiveDate,
        end: NaiveDate,
        max_bars: usize,
    ) -> Result<HistoryReply, MarketError>;
}

/// # Summary
/// 备用行情数据源接口。
///
/// # Invariants
/// - 返回的每一行以数据源原生列名为 Key，列名随市场不同而不同，
///   由调用方负责映射到规范 K 线结构。
#[async_trait]
pub trait FallbackProvider: Send + Sync {
    /// # Summary
    /// 获取指定区间内的原始日线数据。
    ///
    /// # Arguments
    /// * `code`: 证券代码。
    /// * `market`: 所属市场。
    /// * `start`: 开始日期（包含）。
    /// * `end`: 结束日期（包含）。
    ///
    /// # Returns
    /// 成功返回原生列名的记录列表。
    async fn request_fallback(
        &self,
        code: &str,
        market: Market,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NativeRecord>, MarketError>;
}

/// # Summary
/// 可用行情序列的获取契约（主源 + 备用源兜底）。
///
/// # Invariants
/// - 返回的序列按日期严格升序，调用方无法从结构上区分数据来自主源还是备用源。
/// - 不做任何缓存，每次调用都重新抓取。
#[async_trait]
pub trait SeriesSource: Send + Sync {
    /// # Summary
    /// 获取证券最近 `lookback_days` 个自然日的日线序列。
    ///
    /// # Logic
    /// 1. 解析 "CODE.MARKET"，非法代码在发起任何网络请求前即失败。
    /// 2. 请求主数据源，结果不可用时按市场策略决定是否走备用源。
    /// 3. 统一排序后返回。
    ///
    /// # Arguments
    /// * `symbol`: 原始证券代码字符串。
    /// * `lookback_days`: 回溯的自然日数。
    ///
    /// # Returns
    /// 成功返回规范序列；代码非法返回 `MarketError::InvalidSymbol`，
    /// 无可用数据返回 `MarketError::NoData`。
    async fn fetch(&self, symbol: &str, lookback_days: u32) -> Result<BarSeries, MarketError>;
}
