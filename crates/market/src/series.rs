use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use kanpan_core::common::time::TimeProvider;
use kanpan_core::common::{Market, Symbol};
use kanpan_core::market::entity::{Bar, BarSeries, NativeRecord, ReplyStatus, Series};
use kanpan_core::market::error::MarketError;
use kanpan_core::market::port::{FallbackProvider, HistoryProvider, SeriesSource};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 备用数据源原生列名到规范字段的映射（A 股）。
const DATE_COLUMN: &str = "日期";
const OPEN_COLUMN: &str = "开盘";
const CLOSE_COLUMN: &str = "收盘";
const HIGH_COLUMN: &str = "最高";
const LOW_COLUMN: &str = "最低";
const VOLUME_COLUMN: &str = "成交量";

/// A 股原生成交量以手计，1 手 = 100 股。
const SHARES_PER_LOT: f64 = 100.0;

/// 备用数据源可能出现的日期格式。
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y%m%d", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"];

/// # Summary
/// SeriesSource 的具体实现：主数据源优先，沪深两市失败时走备用数据源。
///
/// # Invariants
/// - 不持有任何缓存，每次调用都重新请求。
/// - 返回序列严格按日期升序，与数据来源无关。
pub struct SeriesSourceImpl {
    // 主行情数据源
    primary: Arc<dyn HistoryProvider>,
    // 备用行情数据源（仅 A 股使用）
    fallback: Option<Arc<dyn FallbackProvider>>,
    // 用于确定回溯窗口的结束日期
    clock: Arc<dyn TimeProvider>,
    // 单次请求的 K 线数量上限
    max_bars: usize,
}

impl SeriesSourceImpl {
    /// # Summary
    /// 构造 SeriesSource。
    ///
    /// # Arguments
    /// * `primary`: 主数据源。
    /// * `fallback`: 备用数据源，可为空。
    /// * `clock`: 时间供给器。
    /// * `max_bars`: K 线数量上限。
    ///
    /// # Returns
    /// 返回共享指针。
    pub fn new(
        primary: Arc<dyn HistoryProvider>,
        fallback: Option<Arc<dyn FallbackProvider>>,
        clock: Arc<dyn TimeProvider>,
        max_bars: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            primary,
            fallback,
            clock,
            max_bars,
        })
    }

    /// # Summary
    /// 请求主数据源并判定结果是否可用。
    ///
    /// # Logic
    /// 1. 请求失败、状态非成功、零行、行数据非法，均视为不可用并返回 None。
    /// 2. 可用时返回规范化后的序列。
    async fn try_primary(&self, symbol: &Symbol, start: NaiveDate, end: NaiveDate) -> Option<BarSeries> {
        let reply = match self
            .primary
            .request_history(&symbol.code, symbol.market, start, end, self.max_bars)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Primary provider failed for {}: {}", symbol, e);
                return None;
            }
        };

        if let ReplyStatus::Rejected(reason) = &reply.status {
            warn!("Primary provider rejected {}: {}", symbol, reason);
            return None;
        }
        if reply.bars.is_empty() {
            warn!("Primary provider returned zero rows for {}", symbol);
            return None;
        }

        match canonicalize(reply.bars) {
            Ok(series) => Some(series),
            Err(e) => {
                warn!("Primary rows for {} unusable: {}", symbol, e);
                None
            }
        }
    }

    /// # Summary
    /// 请求备用数据源并把原生列名映射为规范 K 线。
    async fn try_fallback(
        &self,
        fallback: &dyn FallbackProvider,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BarSeries, MarketError> {
        info!("Falling back to secondary provider for {}", symbol);
        let rows = fallback
            .request_fallback(&symbol.code, symbol.market, start, end)
            .await
            .map_err(|e| {
                warn!("Fallback provider failed for {}: {}", symbol, e);
                MarketError::NoData(format!("{}: fallback failed: {}", symbol, e))
            })?;

        let bars = rows
            .iter()
            .map(bar_from_native)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                warn!("Fallback rows for {} unusable: {}", symbol, e);
                MarketError::NoData(format!("{}: {}", symbol, e))
            })?;

        if bars.is_empty() {
            return Err(MarketError::NoData(format!("{}: fallback returned zero rows", symbol)));
        }

        canonicalize(bars).map_err(|e| MarketError::NoData(format!("{}: {}", symbol, e)))
    }
}

#[async_trait]
impl SeriesSource for SeriesSourceImpl {
    async fn fetch(&self, symbol: &str, lookback_days: u32) -> Result<BarSeries, MarketError> {
        let symbol = Symbol::parse(symbol)?;
        let end = symbol.market.local_date(self.clock.now());
        let start = end - Duration::days(i64::from(lookback_days));
        debug!("Fetching {} from {} to {}", symbol, start, end);

        if let Some(series) = self.try_primary(&symbol, start, end).await {
            debug!("Primary provider served {} bars for {}", series.len(), symbol);
            return Ok(series);
        }

        match (&self.fallback, fallback_allowed(symbol.market)) {
            (Some(fallback), true) => self.try_fallback(fallback.as_ref(), &symbol, start, end).await,
            (None, true) => Err(MarketError::NoData(format!(
                "{}: primary unusable and no fallback registered",
                symbol
            ))),
            (_, false) => {
                warn!("No fallback for market {}, giving up on {}", symbol.market, symbol);
                Err(MarketError::NoData(format!("{}: primary unusable", symbol)))
            }
        }
    }
}

/// 只有沪深两市允许走备用数据源。
pub fn fallback_allowed(market: Market) -> bool {
    market.is_domestic()
}

/// # Summary
/// 规范化 K 线列表：校验数值、按日期排序、同日重复保留最后一条。
///
/// # Logic
/// 1. 任一价格或成交量非有限数即判定整批数据非法。
/// 2. 稳定排序后逐条合并，同一日期后出现的记录覆盖先出现的记录。
///
/// # Arguments
/// * `bars`: 任意顺序的 K 线。
///
/// # Returns
/// 成功返回严格升序序列，数值非法返回 `MarketError::MalformedProviderResponse`。
pub fn canonicalize(mut bars: Vec<Bar>) -> Result<BarSeries, MarketError> {
    if let Some(bad) = bars.iter().find(|b| !is_finite_bar(b)) {
        return Err(MarketError::MalformedProviderResponse(format!(
            "non-finite values on {}",
            bad.date
        )));
    }

    bars.sort_by_key(|b| b.date);

    let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
    let mut duplicates = 0usize;
    for bar in bars {
        match deduped.last_mut() {
            Some(last) if last.date == bar.date => {
                *last = bar;
                duplicates += 1;
            }
            _ => deduped.push(bar),
        }
    }
    if duplicates > 0 {
        warn!("Dropped {} duplicate-date rows, kept the last of each", duplicates);
    }

    Series::new(deduped)
}

fn is_finite_bar(bar: &Bar) -> bool {
    [bar.open, bar.high, bar.low, bar.close, bar.volume]
        .iter()
        .all(|v| v.is_finite())
}

/// # Summary
/// 把备用数据源的一行原生记录映射为规范 K 线。
/// 成交量由手换算为股，与主数据源一致。
///
/// # Returns
/// 缺列或数值无法解析时返回 `MarketError::MalformedProviderResponse`。
pub fn bar_from_native(record: &NativeRecord) -> Result<Bar, MarketError> {
    let field = |label: &str| -> Result<&str, MarketError> {
        record
            .get(label)
            .map(|v| v.trim())
            .ok_or_else(|| MarketError::MalformedProviderResponse(format!("missing column {}", label)))
    };
    let number = |label: &str| -> Result<f64, MarketError> {
        let raw = field(label)?;
        raw.replace(',', "")
            .parse::<f64>()
            .map_err(|e| MarketError::MalformedProviderResponse(format!("{} '{}': {}", label, raw, e)))
    };

    Ok(Bar {
        date: normalize_date(field(DATE_COLUMN)?)?,
        open: number(OPEN_COLUMN)?,
        high: number(HIGH_COLUMN)?,
        low: number(LOW_COLUMN)?,
        close: number(CLOSE_COLUMN)?,
        volume: number(VOLUME_COLUMN)? * SHARES_PER_LOT,
    })
}

/// # Summary
/// 将多种日期 / 日期时间写法统一为不带时间的自然日。
pub fn normalize_date(raw: &str) -> Result<NaiveDate, MarketError> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
        .ok_or_else(|| MarketError::MalformedProviderResponse(format!("unrecognized date '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_normalize_date_formats() {
        assert_eq!(normalize_date("2024-01-02").unwrap(), d(2024, 1, 2));
        assert_eq!(normalize_date("20240102").unwrap(), d(2024, 1, 2));
        assert_eq!(normalize_date("2024/01/02").unwrap(), d(2024, 1, 2));
        assert_eq!(normalize_date("2024-01-02 00:00:00").unwrap(), d(2024, 1, 2));
        assert_eq!(normalize_date("2024-01-02T15:00:00").unwrap(), d(2024, 1, 2));
        assert!(normalize_date("02-01-2024x").is_err());
    }

    #[test]
    fn test_native_volume_lots_become_shares() {
        let record: NativeRecord = [
            ("日期", "2024-01-02"),
            ("开盘", "10.0"),
            ("收盘", "10.5"),
            ("最高", "10.8"),
            ("最低", "9.9"),
            ("成交量", "123456"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let bar = bar_from_native(&record).unwrap();
        assert_eq!(bar.volume, 12_345_600.0);
        assert_eq!(bar.close, 10.5);
    }

    #[test]
    fn test_canonicalize_keeps_last_duplicate() {
        let mk = |day: u32, close: f64| Bar {
            date: d(2024, 1, day),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
        };
        let series = canonicalize(vec![mk(3, 3.0), mk(2, 2.0), mk(3, 30.0)]).unwrap();
        let closes: Vec<f64> = series.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![2.0, 30.0]);
    }

    #[test]
    fn test_canonicalize_rejects_nan() {
        let bar = Bar {
            date: d(2024, 1, 2),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: f64::NAN,
            volume: 1.0,
        };
        assert!(matches!(
            canonicalize(vec![bar]),
            Err(MarketError::MalformedProviderResponse(_))
        ));
    }

    #[test]
    fn test_fallback_policy() {
        assert!(fallback_allowed(Market::SH));
        assert!(fallback_allowed(Market::SZ));
        assert!(!fallback_allowed(Market::HK));
        assert!(!fallback_allowed(Market::US));
    }
}
