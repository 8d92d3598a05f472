use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use kanpan_core::common::{Market, Symbol};
use kanpan_core::config::FeedConfig;
use kanpan_core::flow::entity::{
    CapitalDistributionSnapshot, CapitalFlowRecord, FlowGranularity, OrderBuckets,
};
use kanpan_core::flow::error::FlowError;
use kanpan_core::flow::port::CapitalFlowProvider;
use kanpan_core::market::entity::NativeRecord;
use kanpan_core::market::error::MarketError;
use kanpan_core::market::port::FallbackProvider;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const KLINE_URL: &str = "https://push2his.eastmoney.com/api/qt/stock/kline/get";
const DAILY_FLOW_URL: &str = "https://push2his.eastmoney.com/api/qt/stock/fflow/daykline/get";
const INTRADAY_FLOW_URL: &str = "https://push2.eastmoney.com/api/qt/stock/fflow/kline/get";
const SNAPSHOT_URL: &str = "https://push2.eastmoney.com/api/qt/stock/get";

/// 东方财富金额单位为元，统一换算为亿元。
const YUAN_PER_YI: f64 = 1e8;

/// 备用日线的原生列名，顺序与 kline 字段 f51..f56 一致（成交量单位为手）。
pub const NATIVE_COLUMNS: [&str; 6] = ["日期", "开盘", "收盘", "最高", "最低", "成交量"];

/// # Summary
/// 东方财富数据源：A 股备用日线、资金流向与资金分布。
///
/// # Invariants
/// - 仅支持沪深两市，其余市场直接拒绝，不发起网络请求。
/// - 所有资金金额在此边界换算为亿元。
#[derive(Clone)]
pub struct EastmoneyProvider {
    client: Client,
}

impl EastmoneyProvider {
    /// # Summary
    /// 创建 EastmoneyProvider。
    ///
    /// # Arguments
    /// * `config`: 数据源配置（超时与 User-Agent）。
    ///
    /// # Returns
    /// 客户端构建失败返回 `MarketError::UpstreamUnavailable`。
    pub fn new(config: &FeedConfig) -> Result<Self, MarketError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| MarketError::UpstreamUnavailable(e.to_string()))?;
        Ok(Self { client })
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<EastmoneyResponse, String> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status()));
        }
        resp.json::<EastmoneyResponse>()
            .await
            .map_err(|e| format!("decode: {}", e))
    }
}

/// 东方财富证券 ID 前缀：沪市 1，深市 0。
pub fn secid(code: &str, market: Market) -> Option<String> {
    match market {
        Market::SH => Some(format!("1.{}", code)),
        Market::SZ => Some(format!("0.{}", code)),
        Market::HK | Market::US => None,
    }
}

/// # Summary
/// 东方财富接口的通用外层结构，`data` 的形状随接口不同。
#[derive(Deserialize, Debug)]
struct EastmoneyResponse {
    data: Option<Value>,
}

#[derive(Deserialize, Debug)]
struct KlineData {
    #[serde(default)]
    klines: Vec<String>,
}

/// # Summary
/// 将 kline 行（逗号分隔）转换为原生列名记录。
///
/// # Logic
/// 1. 按逗号切分，前 6 个字段依次对应日期、开盘、收盘、最高、最低、成交量。
/// 2. 字段不足的行直接丢弃。
pub fn parse_kline_rows(lines: &[String]) -> Vec<NativeRecord> {
    lines
        .iter()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() < NATIVE_COLUMNS.len() {
                return None;
            }
            Some(
                NATIVE_COLUMNS
                    .iter()
                    .zip(fields.iter())
                    .map(|(label, value)| ((*label).to_string(), value.trim().to_string()))
                    .collect(),
            )
        })
        .collect()
}

fn parse_amount(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().map(|v| v / YUAN_PER_YI)
}

fn parse_flow_time(raw: &str, granularity: FlowGranularity) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    match granularity {
        FlowGranularity::Daily => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0)),
        FlowGranularity::Intraday => NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M").ok(),
    }
}

/// # Summary
/// 解析资金流向 kline 行。
///
/// # Logic
/// 1. 字段顺序：时间、主力净额、小单净额、中单净额、大单净额、超大单净额（单位元）。
/// 2. 整体净额 = 主力 + 中单 + 小单。
/// 3. 金额换算为亿元，无法解析的行丢弃。
pub fn parse_flow_rows(lines: &[String], granularity: FlowGranularity) -> Vec<CapitalFlowRecord> {
    lines
        .iter()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() < 6 {
                return None;
            }
            let timestamp = parse_flow_time(fields[0], granularity)?;
            let main = parse_amount(fields[1])?;
            let small = parse_amount(fields[2])?;
            let mid = parse_amount(fields[3])?;
            let big = parse_amount(fields[4])?;
            let super_ = parse_amount(fields[5])?;
            Some(CapitalFlowRecord {
                timestamp,
                granularity,
                net_inflow: main + mid + small,
                main_net_inflow: main,
                super_net_inflow: super_,
                big_net_inflow: big,
                mid_net_inflow: mid,
                small_net_inflow: small,
            })
        })
        .collect()
}

/// # Summary
/// 解析实时快照中的资金分布字段。
///
/// # Logic
/// 1. f138/f139 超大单流入/流出，f141/f142 大单，f144/f145 中单，f147/f148 小单。
/// 2. f86 为更新时间（Unix 秒）。
/// 3. 任一字段缺失或为 "-" 时视为无数据。
pub fn parse_distribution(data: &Value) -> Option<CapitalDistributionSnapshot> {
    let amount = |key: &str| data.get(key).and_then(Value::as_f64).map(|v| v / YUAN_PER_YI);

    let update_time = data
        .get("f86")
        .and_then(Value::as_i64)
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .and_then(|t| FixedOffset::east_opt(8 * 3600).map(|tz| t.with_timezone(&tz).naive_local()))?;

    Some(CapitalDistributionSnapshot {
        update_time,
        inflow: OrderBuckets {
            super_: amount("f138")?,
            big: amount("f141")?,
            mid: amount("f144")?,
            small: amount("f147")?,
        },
        outflow: OrderBuckets {
            super_: amount("f139")?,
            big: amount("f142")?,
            mid: amount("f145")?,
            small: amount("f148")?,
        },
    })
}

#[async_trait]
impl FallbackProvider for EastmoneyProvider {
    /// # Summary
    /// 获取 A 股前复权日线，返回原生列名记录。
    async fn request_fallback(
        &self,
        code: &str,
        market: Market,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NativeRecord>, MarketError> {
        let Some(secid) = secid(code, market) else {
            return Err(MarketError::NoData(format!(
                "fallback does not cover market {}",
                market
            )));
        };

        debug!("Requesting Eastmoney kline for {} ({} -> {})", secid, start, end);
        let query = [
            ("secid", secid.clone()),
            ("fields1", "f1,f2,f3,f4,f5,f6".to_string()),
            ("fields2", "f51,f52,f53,f54,f55,f56,f57".to_string()),
            ("klt", "101".to_string()),
            ("fqt", "1".to_string()),
            ("beg", start.format("%Y%m%d").to_string()),
            ("end", end.format("%Y%m%d").to_string()),
        ];
        let resp = self
            .get_json(KLINE_URL, &query)
            .await
            .map_err(MarketError::UpstreamUnavailable)?;

        let Some(data) = resp.data else {
            return Ok(Vec::new());
        };
        let kline: KlineData = serde_json::from_value(data)
            .map_err(|e| MarketError::MalformedProviderResponse(e.to_string()))?;

        Ok(parse_kline_rows(&kline.klines))
    }
}

#[async_trait]
impl CapitalFlowProvider for EastmoneyProvider {
    async fn fetch_flow(
        &self,
        symbol: &Symbol,
        granularity: FlowGranularity,
    ) -> Result<Vec<CapitalFlowRecord>, FlowError> {
        let secid = secid(&symbol.code, symbol.market)
            .ok_or_else(|| FlowError::Unsupported(symbol.market.to_string()))?;

        let (url, klt) = match granularity {
            FlowGranularity::Daily => (DAILY_FLOW_URL, "101"),
            FlowGranularity::Intraday => (INTRADAY_FLOW_URL, "1"),
        };
        let query = [
            ("secid", secid),
            ("lmt", "0".to_string()),
            ("klt", klt.to_string()),
            ("fields1", "f1,f2,f3,f7".to_string()),
            ("fields2", "f51,f52,f53,f54,f55,f56".to_string()),
        ];
        let resp = self
            .get_json(url, &query)
            .await
            .map_err(FlowError::UpstreamUnavailable)?;

        let Some(data) = resp.data else {
            warn!("Eastmoney returned no {:?} flow for {}", granularity, symbol);
            return Ok(Vec::new());
        };
        let kline: KlineData = serde_json::from_value(data)
            .map_err(|e| FlowError::MalformedProviderResponse(e.to_string()))?;

        let mut records = parse_flow_rows(&kline.klines, granularity);
        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }

    async fn fetch_distribution(
        &self,
        symbol: &Symbol,
    ) -> Result<Option<CapitalDistributionSnapshot>, FlowError> {
        let secid = secid(&symbol.code, symbol.market)
            .ok_or_else(|| FlowError::Unsupported(symbol.market.to_string()))?;

        let query = [
            ("secid", secid),
            (
                "fields",
                "f86,f138,f139,f141,f142,f144,f145,f147,f148".to_string(),
            ),
        ];
        let resp = self
            .get_json(SNAPSHOT_URL, &query)
            .await
            .map_err(FlowError::UpstreamUnavailable)?;

        Ok(resp.data.as_ref().and_then(parse_distribution))
    }
}
