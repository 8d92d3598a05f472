use crate::market::error::MarketError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// # Summary
/// 单根日 K 线数据实体（规范形态）。
///
/// # Invariants
/// - `date` 为交易所当地的自然日，不带时间部分。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    // 交易日
    pub date: NaiveDate,
    // 开盘价
    pub open: f64,
    // 最高价
    pub high: f64,
    // 最低价
    pub low: f64,
    // 收盘价
    pub close: f64,
    // 成交量（股）
    pub volume: f64,
}

/// # Summary
/// 附带技术指标的 K 线。
///
/// # Invariants
/// - 任何指标在历史不足时为 `None`，绝不以 0 代替。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedBar {
    #[serde(flatten)]
    pub bar: Bar,
    pub ema5: Option<f64>,
    pub ema10: Option<f64>,
    pub ema12: Option<f64>,
    pub ema20: Option<f64>,
    pub ema26: Option<f64>,
    pub ema60: Option<f64>,
    pub dif: Option<f64>,
    pub dea: Option<f64>,
    pub macd: Option<f64>,
    pub rsi: Option<f64>,
}

impl EnrichedBar {
    /// 以原始 K 线构造一根尚未计算任何指标的记录。
    pub fn bare(bar: Bar) -> Self {
        Self {
            bar,
            ema5: None,
            ema10: None,
            ema12: None,
            ema20: None,
            ema26: None,
            ema60: None,
            dif: None,
            dea: None,
            macd: None,
            rsi: None,
        }
    }

    pub fn close(&self) -> f64 {
        self.bar.close
    }

    pub fn date(&self) -> NaiveDate {
        self.bar.date
    }
}

/// # Summary
/// 按日期排序的元素需要暴露其日期，供 `Series` 校验顺序。
pub trait Dated {
    fn date(&self) -> NaiveDate;
}

impl Dated for Bar {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Dated for EnrichedBar {
    fn date(&self) -> NaiveDate {
        self.bar.date
    }
}

/// # Summary
/// 严格按日期升序排列的只读序列。
///
/// # Invariants
/// - 日期严格递增，不存在重复日期。
/// - 构造完成后不提供任何原地修改接口，下游阶段只能生成新序列。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Series<T> {
    items: Vec<T>,
}

/// 规范 K 线序列。
pub type BarSeries = Series<Bar>;

/// 指标增强后的 K 线序列。
pub type EnrichedSeries = Series<EnrichedBar>;

impl<T: Dated> Series<T> {
    /// # Summary
    /// 校验并构造序列。
    ///
    /// # Logic
    /// 1. 逐对比较相邻元素的日期。
    /// 2. 一旦出现非严格递增即拒绝。
    ///
    /// # Arguments
    /// * `items`: 已排序的元素列表。
    ///
    /// # Returns
    /// 成功返回序列，顺序非法返回 `MarketError::MalformedProviderResponse`。
    pub fn new(items: Vec<T>) -> Result<Self, MarketError> {
        if let Some(pair) = items.windows(2).find(|w| w[0].date() >= w[1].date()) {
            return Err(MarketError::MalformedProviderResponse(format!(
                "series not strictly ascending at {} -> {}",
                pair[0].date(),
                pair[1].date()
            )));
        }
        Ok(Self { items })
    }

    pub fn empty() -> Self {
        Self { items: Vec::new() }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn into_inner(self) -> Vec<T> {
        self.items
    }

    /// # Summary
    /// 逐元素映射为新序列（附带下标）。
    ///
    /// # Invariants
    /// - `f` 必须保留每个元素的日期，新序列因此无需再次校验顺序。
    pub fn map_indexed<U: Dated>(&self, mut f: impl FnMut(usize, &T) -> U) -> Series<U> {
        Series {
            items: self.items.iter().enumerate().map(|(i, item)| f(i, item)).collect(),
        }
    }
}

impl<T: Dated> Default for Series<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// # Summary
/// 主数据源返回的状态码。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyStatus {
    // 请求成功
    Success,
    // 数据源拒绝请求（额度不足、代码不存在等），附带原因
    Rejected(String),
}

/// # Summary
/// 主数据源历史 K 线请求的返回值 `(status, rows)`。
#[derive(Debug, Clone)]
pub struct HistoryReply {
    pub status: ReplyStatus,
    pub bars: Vec<Bar>,
}

impl HistoryReply {
    pub fn success(bars: Vec<Bar>) -> Self {
        Self {
            status: ReplyStatus::Success,
            bars,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Rejected(reason.into()),
            bars: Vec::new(),
        }
    }
}

/// # Summary
/// 备用数据源的一行原始数据，Key 为数据源原生列名（例如 "日期"、"开盘"）。
pub type NativeRecord = BTreeMap<String, String>;
