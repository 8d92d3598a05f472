use chrono::{Duration, Utc};
use kanpan_core::common::{Market, Symbol};
use kanpan_core::config::{FeedConfig, NarratorConfig};
use kanpan_core::flow::entity::FlowGranularity;
use kanpan_core::flow::port::CapitalFlowProvider;
use kanpan_core::market::entity::ReplyStatus;
use kanpan_core::market::port::{FallbackProvider, HistoryProvider};
use kanpan_core::narrative::entity::NarrativeRequest;
use kanpan_core::narrative::port::Narrator;
use kanpan_feed::deepseek::DeepSeekNarrator;
use kanpan_feed::eastmoney::{EastmoneyProvider, NATIVE_COLUMNS};
use kanpan_feed::yahoo::YahooProvider;
use std::env;

fn install_crypto() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// # Summary
/// 雅虎财经日线抓取的集成测试。
///
/// # Logic
/// 1. 初始化 YahooProvider。
/// 2. 抓取贵州茅台过去 30 天的日线数据。
/// 3. 断言请求成功且数据非空。
#[tokio::test]
#[ignore] // 依赖外部网络
async fn test_yahoo_real_fetch() -> anyhow::Result<()> {
    install_crypto();
    let provider = YahooProvider::new(&FeedConfig::default())?;
    let end = Utc::now().date_naive();
    let start = end - Duration::days(30);

    let reply = provider
        .request_history("600519", Market::SH, start, end, 1000)
        .await?;

    assert_eq!(reply.status, ReplyStatus::Success);
    assert!(!reply.bars.is_empty(), "Bars should not be empty");
    Ok(())
}

/// # Summary
/// 东方财富备用日线应返回原生列名。
#[tokio::test]
#[ignore] // 依赖外部网络
async fn test_eastmoney_fallback_native_columns() -> anyhow::Result<()> {
    install_crypto();
    let provider = EastmoneyProvider::new(&FeedConfig::default())?;
    let end = Utc::now().date_naive();
    let start = end - Duration::days(30);

    let rows = provider
        .request_fallback("000001", Market::SZ, start, end)
        .await?;

    assert!(!rows.is_empty());
    for label in NATIVE_COLUMNS {
        assert!(rows[0].contains_key(label), "missing column {}", label);
    }
    Ok(())
}

/// # Summary
/// 东方财富日线资金流向应按时间升序返回。
#[tokio::test]
#[ignore] // 依赖外部网络
async fn test_eastmoney_daily_flow() -> anyhow::Result<()> {
    install_crypto();
    let provider = EastmoneyProvider::new(&FeedConfig::default())?;
    let symbol = Symbol::parse("600519.SH")?;

    let records = provider.fetch_flow(&symbol, FlowGranularity::Daily).await?;

    assert!(!records.is_empty());
    assert!(records.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    Ok(())
}

/// # Summary
/// 非 A 股市场请求资金数据应直接被拒绝，不依赖网络。
#[tokio::test]
async fn test_eastmoney_rejects_hk_flow() -> anyhow::Result<()> {
    install_crypto();
    let provider = EastmoneyProvider::new(&FeedConfig::default())?;
    let symbol = Symbol::parse("00700.HK")?;

    assert!(provider.fetch_flow(&symbol, FlowGranularity::Daily).await.is_err());
    assert!(provider.fetch_distribution(&symbol).await.is_err());
    Ok(())
}

/// # Summary
/// 集成测试：验证 DeepSeek 叙述生成。
///
/// # Logic
/// 1. 加载 .env 环境变量。
/// 2. 从 KANPAN_DEEPSEEK_API_KEY 读取密钥。
/// 3. 请求一份最小上下文的诊断报告并断言正文非空。
#[tokio::test]
#[ignore] // 默认忽略，仅在手动测试时通过环境变量开启
async fn test_deepseek_narrative() -> anyhow::Result<()> {
    install_crypto();
    let _ = dotenvy::dotenv();
    let config = NarratorConfig {
        api_key: Some(env::var("KANPAN_DEEPSEEK_API_KEY")?),
        ..NarratorConfig::default()
    };
    let narrator = DeepSeekNarrator::new(&config)?;
    let request = NarrativeRequest {
        symbol: "600519.SH".to_string(),
        recent_bars: Vec::new(),
        flow: Vec::new(),
        headlines: Vec::new(),
    };

    let text = narrator.narrate(&request).await?;
    assert!(!text.trim().is_empty());
    Ok(())
}
