use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate};
use kanpan_core::common::Market;
use kanpan_core::config::FeedConfig;
use kanpan_core::market::entity::{Bar, HistoryReply};
use kanpan_core::market::error::MarketError;
use kanpan_core::market::port::HistoryProvider;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// # Summary
/// Yahoo Finance 日线行情提供者（主数据源）。
///
/// # Invariants
/// - 使用 `reqwest` 异步客户端进行通讯，超时由客户端统一控制。
#[derive(Clone)]
pub struct YahooProvider {
    /// 内部使用的 HTTP 客户端
    client: Client,
    base_url: String,
}

impl YahooProvider {
    /// # Summary
    /// 创建一个新的 YahooProvider 实例。
    ///
    /// # Logic
    /// 1. 按配置设置超时。
    /// 2. 设置浏览器 User-Agent 以减少被拦截风险。
    /// 3. 初始化 reqwest 客户端。
    ///
    /// # Arguments
    /// * `config`: 数据源配置。
    ///
    /// # Returns
    /// 成功返回 YahooProvider，客户端构建失败返回 `MarketError::UpstreamUnavailable`。
    pub fn new(config: &FeedConfig) -> Result<Self, MarketError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let agent = config
            .user_agent
            .parse()
            .map_err(|e| MarketError::UpstreamUnavailable(format!("invalid user agent: {}", e)))?;
        headers.insert(reqwest::header::USER_AGENT, agent);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| MarketError::UpstreamUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: CHART_URL.to_string(),
        })
    }
}

/// # Summary
/// 将证券代码映射为 Yahoo 识别的 ticker。
///
/// # Logic
/// 1. 沪市追加 `.SS`，深市追加 `.SZ`。
/// 2. 港股去掉前导零后补齐到 4 位并追加 `.HK`（00700 -> 0700.HK）。
/// 3. 美股直接使用代码。
pub fn yahoo_ticker(code: &str, market: Market) -> String {
    match market {
        Market::SH => format!("{}.SS", code),
        Market::SZ => format!("{}.SZ", code),
        Market::HK => {
            let trimmed = code.trim_start_matches('0');
            format!("{:0>4}.HK", trimmed)
        }
        Market::US => code.to_string(),
    }
}

/// # Summary
/// Yahoo API 响应顶层结构。
///
/// # Invariants
/// - 映射自 Yahoo v8 chart 接口。
#[derive(Deserialize, Debug)]
struct YahooResponse {
    chart: YahooChart,
}

#[derive(Deserialize, Debug)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

#[derive(Deserialize, Debug)]
struct YahooError {
    description: String,
}

/// # Summary
/// Yahoo API 单个时间序列结果。
#[derive(Deserialize, Debug)]
struct YahooResult {
    // 停牌或新股时可能缺失
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: YahooIndicators,
}

#[derive(Deserialize, Debug)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
}

/// # Summary
/// Yahoo API 原始报价数据。
#[derive(Deserialize, Debug)]
struct YahooQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// # Summary
/// 将 chart 接口响应体转换为 `(status, rows)`。
///
/// # Logic
/// 1. 接口返回 error 字段时视为数据源拒绝。
/// 2. 逐个时间戳组装 K 线，字段缺失的行直接跳过。
/// 3. 时间戳换算为市场当地日期。
/// 4. 仅保留最近的 `max_bars` 根。
///
/// # Arguments
/// * `body`: 原始 JSON 文本。
/// * `market`: 所属市场。
/// * `max_bars`: 数量上限。
///
/// # Returns
/// 成功返回 HistoryReply，JSON 结构非法返回 `MarketError::MalformedProviderResponse`。
pub fn parse_chart(body: &str, market: Market, max_bars: usize) -> Result<HistoryReply, MarketError> {
    let json: YahooResponse = serde_json::from_str(body)
        .map_err(|e| MarketError::MalformedProviderResponse(e.to_string()))?;

    if let Some(err) = json.chart.error {
        return Ok(HistoryReply::rejected(err.description));
    }

    let Some(result) = json.chart.result.and_then(|mut r| r.pop()) else {
        return Ok(HistoryReply::rejected("empty chart result"));
    };

    let quote = result
        .indicators
        .quote
        .first()
        .ok_or_else(|| MarketError::MalformedProviderResponse("no quote data".into()))?;

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let Some(instant) = DateTime::from_timestamp(ts, 0) else {
            continue;
        };
        if let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = (
            quote.open.get(i).and_then(|x| *x),
            quote.high.get(i).and_then(|x| *x),
            quote.low.get(i).and_then(|x| *x),
            quote.close.get(i).and_then(|x| *x),
            quote.volume.get(i).and_then(|x| *x),
        ) {
            bars.push(Bar {
                date: market.local_date(instant),
                open,
                high,
                low,
                close,
                volume,
            });
        }
    }

    if bars.len() > max_bars {
        let excess = bars.len() - max_bars;
        bars.drain(..excess);
    }

    Ok(HistoryReply::success(bars))
}

#[async_trait]
impl HistoryProvider for YahooProvider {
    /// # Summary
    /// 从 Yahoo Finance 抓取日线历史数据。
    ///
    /// # Logic
    /// 1. 映射证券代码为 Yahoo ticker。
    /// 2. 以 `[start, end + 1 天)` 构建 period1 / period2。
    /// 3. 发起请求，非 2xx 视为上游不可用。
    /// 4. 解析响应体。
    async fn request_history(
        &self,
        code: &str,
        market: Market,
        start: NaiveDate,
        end: NaiveDate,
        max_bars: usize,
    ) -> Result<HistoryReply, MarketError> {
        let ticker = yahoo_ticker(code, market);
        let period1 = start.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc().timestamp();
        let period2 = (end + ChronoDuration::days(1))
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc()
            .timestamp();

        let url = format!("{}/{}", self.base_url, ticker);
        debug!("Requesting Yahoo chart for {} ({} -> {})", ticker, start, end);

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
            ])
            .send()
            .await
            .map_err(|e| MarketError::UpstreamUnavailable(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| MarketError::UpstreamUnavailable(e.to_string()))?;

        if status == reqwest::StatusCode::NOT_FOUND {
            warn!("Yahoo rejected ticker {}: HTTP 404", ticker);
            // 404 时响应体仍带有 chart.error 描述
            return parse_chart(&body, market, max_bars)
                .or_else(|_| Ok(HistoryReply::rejected(format!("unknown ticker {}", ticker))));
        }
        if !status.is_success() {
            return Err(MarketError::UpstreamUnavailable(format!("HTTP {}", status)));
        }

        parse_chart(&body, market, max_bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanpan_core::market::entity::ReplyStatus;

    #[test]
    fn test_ticker_mapping() {
        assert_eq!(yahoo_ticker("600519", Market::SH), "600519.SS");
        assert_eq!(yahoo_ticker("000001", Market::SZ), "000001.SZ");
        assert_eq!(yahoo_ticker("00700", Market::HK), "0700.HK");
        assert_eq!(yahoo_ticker("09988", Market::HK), "9988.HK");
        assert_eq!(yahoo_ticker("AAPL", Market::US), "AAPL");
    }

    #[test]
    fn test_parse_chart_skips_incomplete_rows() {
        // 1704153600 = 2024-01-02T00:00:00Z, 1704240000 = 2024-01-03T00:00:00Z
        let body = r#"{"chart":{"result":[{"timestamp":[1704153600,1704240000],
            "indicators":{"quote":[{"open":[10.0,null],"high":[11.0,12.0],
            "low":[9.0,10.0],"close":[10.5,11.5],"volume":[100.0,200.0]}]}}],"error":null}}"#;
        let reply = parse_chart(body, Market::SZ, 1000).unwrap();
        assert_eq!(reply.status, ReplyStatus::Success);
        assert_eq!(reply.bars.len(), 1);
        assert_eq!(reply.bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(reply.bars[0].close, 10.5);
    }

    #[test]
    fn test_parse_chart_keeps_most_recent_bars() {
        let body = r#"{"chart":{"result":[{"timestamp":[1704153600,1704240000],
            "indicators":{"quote":[{"open":[1.0,2.0],"high":[1.0,2.0],
            "low":[1.0,2.0],"close":[1.0,2.0],"volume":[1.0,2.0]}]}}],"error":null}}"#;
        let reply = parse_chart(body, Market::US, 1).unwrap();
        assert_eq!(reply.bars.len(), 1);
        assert_eq!(reply.bars[0].close, 2.0);
    }

    #[test]
    fn test_parse_chart_error_is_rejection() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#;
        let reply = parse_chart(body, Market::HK, 1000).unwrap();
        assert_eq!(reply.status, ReplyStatus::Rejected("No data found".into()));
        assert!(reply.bars.is_empty());
    }

    #[test]
    fn test_parse_chart_malformed() {
        let err = parse_chart("<html>", Market::SH, 1000).unwrap_err();
        assert!(matches!(err, MarketError::MalformedProviderResponse(_)));
    }
}
