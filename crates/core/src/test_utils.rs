//! 供各 crate 集成测试使用的模拟数据源与样例数据构造器。

use crate::common::{Market, Symbol};
use crate::flow::entity::{
    CapitalDistributionSnapshot, CapitalFlowRecord, FlowGranularity, OrderBuckets,
};
use crate::flow::error::FlowError;
use crate::flow::port::CapitalFlowProvider;
use crate::market::entity::{Bar, HistoryReply, NativeRecord};
use crate::market::error::MarketError;
use crate::market::port::{FallbackProvider, HistoryProvider};
use crate::narrative::entity::NarrativeRequest;
use crate::narrative::error::NarrativeError;
use crate::narrative::port::Narrator;
use crate::sentiment::entity::SentimentItem;
use crate::sentiment::error::SentimentError;
use crate::sentiment::port::SentimentSource;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use std::sync::atomic::{AtomicUsize, Ordering};

/// 以收盘价构造一根 K 线，其余价格取收盘价。
pub fn bar(date: NaiveDate, close: f64) -> Bar {
    Bar {
        date,
        open: close,
        high: close,
        low: close,
        close,
        volume: 1000.0,
    }
}

/// 从 `start` 起按自然日连续构造 K 线。
pub fn bars_from_closes(start: NaiveDate, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .zip(0i64..)
        .map(|(close, offset)| bar(start + Duration::days(offset), *close))
        .collect()
}

/// 构造一条日线资金记录，主力部分平分给超大单与大单，其余平分给中单与小单。
pub fn flow_record(date: NaiveDate, net: f64, main: f64) -> CapitalFlowRecord {
    let retail = net - main;
    CapitalFlowRecord {
        timestamp: date.and_hms_opt(0, 0, 0).unwrap_or_default(),
        granularity: FlowGranularity::Daily,
        net_inflow: net,
        main_net_inflow: main,
        super_net_inflow: main / 2.0,
        big_net_inflow: main / 2.0,
        mid_net_inflow: retail / 2.0,
        small_net_inflow: retail / 2.0,
    }
}

/// 从 `start` 起按自然日连续构造日线资金记录，主力净额等于整体净额。
pub fn daily_flows(start: NaiveDate, nets: &[f64]) -> Vec<CapitalFlowRecord> {
    nets.iter()
        .zip(0i64..)
        .map(|(net, offset)| flow_record(start + Duration::days(offset), *net, *net))
        .collect()
}

pub fn distribution(inflow: OrderBuckets, outflow: OrderBuckets) -> CapitalDistributionSnapshot {
    CapitalDistributionSnapshot {
        update_time: NaiveDate::from_ymd_opt(2024, 1, 2)
            .and_then(|d| d.and_hms_opt(15, 0, 0))
            .unwrap_or_default(),
        inflow,
        outflow,
    }
}

/// # Summary
/// 主数据源模拟，返回预设结果并记录调用次数。
pub struct MockHistoryProvider {
    reply: Result<HistoryReply, MarketError>,
    calls: AtomicUsize,
}

impl MockHistoryProvider {
    pub fn new(reply: Result<HistoryReply, MarketError>) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HistoryProvider for MockHistoryProvider {
    async fn request_history(
        &self,
        _code: &str,
        _market: Market,
        _start: NaiveDate,
        _end: NaiveDate,
        max_bars: usize,
    ) -> Result<HistoryReply, MarketError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().map(|mut reply| {
            reply.bars.truncate(max_bars);
            reply
        })
    }
}

/// # Summary
/// 备用数据源模拟。
pub struct MockFallbackProvider {
    rows: Result<Vec<NativeRecord>, MarketError>,
    calls: AtomicUsize,
}

impl MockFallbackProvider {
    pub fn new(rows: Result<Vec<NativeRecord>, MarketError>) -> Self {
        Self {
            rows,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FallbackProvider for MockFallbackProvider {
    async fn request_fallback(
        &self,
        _code: &str,
        _market: Market,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<NativeRecord>, MarketError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rows.clone()
    }
}

/// # Summary
/// 资金数据源模拟。
pub struct MockFlowProvider {
    pub daily: Result<Vec<CapitalFlowRecord>, FlowError>,
    pub intraday: Result<Vec<CapitalFlowRecord>, FlowError>,
    pub distribution: Result<Option<CapitalDistributionSnapshot>, FlowError>,
}

impl MockFlowProvider {
    /// 所有请求都返回空结果。
    pub fn empty() -> Self {
        Self {
            daily: Ok(Vec::new()),
            intraday: Ok(Vec::new()),
            distribution: Ok(None),
        }
    }

    /// 所有请求都以上游不可用失败。
    pub fn failing() -> Self {
        let err = FlowError::UpstreamUnavailable("mock outage".to_string());
        Self {
            daily: Err(err.clone()),
            intraday: Err(err.clone()),
            distribution: Err(err),
        }
    }
}

#[async_trait]
impl CapitalFlowProvider for MockFlowProvider {
    async fn fetch_flow(
        &self,
        _symbol: &Symbol,
        granularity: FlowGranularity,
    ) -> Result<Vec<CapitalFlowRecord>, FlowError> {
        match granularity {
            FlowGranularity::Daily => self.daily.clone(),
            FlowGranularity::Intraday => self.intraday.clone(),
        }
    }

    async fn fetch_distribution(
        &self,
        _symbol: &Symbol,
    ) -> Result<Option<CapitalDistributionSnapshot>, FlowError> {
        self.distribution.clone()
    }
}

pub struct MockSentimentSource {
    pub items: Result<Vec<SentimentItem>, SentimentError>,
}

#[async_trait]
impl SentimentSource for MockSentimentSource {
    async fn fetch_sentiment(&self, _symbol: &Symbol) -> Result<Vec<SentimentItem>, SentimentError> {
        self.items.clone()
    }
}

/// # Summary
/// 叙述生成器模拟，记录调用次数。
pub struct MockNarrator {
    reply: Result<String, NarrativeError>,
    calls: AtomicUsize,
}

impl MockNarrator {
    pub fn new(reply: Result<String, NarrativeError>) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Narrator for MockNarrator {
    async fn narrate(&self, _request: &NarrativeRequest) -> Result<String, NarrativeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone()
    }
}
