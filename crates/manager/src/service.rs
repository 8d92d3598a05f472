use futures::future::join_all;
use kanpan_core::analysis::entity::{Signal, TechnicalAnalysis};
use kanpan_core::common::Symbol;
use kanpan_core::config::AppConfig;
use kanpan_core::flow::entity::{CapitalDistributionSnapshot, CapitalFlowRecord, FlowGranularity};
use kanpan_core::flow::port::CapitalFlowProvider;
use kanpan_core::market::entity::{BarSeries, EnrichedSeries};
use kanpan_core::market::error::MarketError;
use kanpan_core::market::port::SeriesSource;
use kanpan_core::narrative::entity::NarrativeRequest;
use kanpan_core::narrative::port::Narrator;
use kanpan_core::report::entity::{ChartData, DiagnosisReport, FlowPoint, GradeBundle, TechnicalChart};
use kanpan_core::sentiment::entity::SentimentItem;
use kanpan_core::sentiment::port::SentimentSource;
use kanpan_engine::scoring::ScoringEngine;
use kanpan_engine::{advisory, capital_flow, distribution, indicator, technical};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// 送入叙述生成器的最近 K 线与日线资金记录数量。
const NARRATIVE_WINDOW: usize = 30;

/// # Summary
/// Manager 层的统一错误类型。
///
/// # Invariants
/// - 只有无法诊断的输入才会成为错误，上游数据缺失一律降级为数据不足。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiagnosisError {
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),
    #[error("Market error: {0}")]
    Market(MarketError),
}

impl From<MarketError> for DiagnosisError {
    fn from(e: MarketError) -> Self {
        match e {
            MarketError::InvalidSymbol(reason) => DiagnosisError::InvalidSymbol(reason),
            other => DiagnosisError::Market(other),
        }
    }
}

/// 一次诊断所需的全部外部数据。
struct Inputs {
    series: BarSeries,
    // 按时间升序
    daily_flow: Vec<CapitalFlowRecord>,
    intraday_flow: Vec<CapitalFlowRecord>,
    snapshot: Option<CapitalDistributionSnapshot>,
    sentiment: Option<Vec<SentimentItem>>,
}

/// # Summary
/// 诊断服务，系统的应用服务层门面。
/// 编译期仅依赖 `kanpan-core` 中的 Trait 定义，所有数据源通过构造函数注入。
///
/// # Invariants
/// - 每次诊断都是独立的流水线，实例之间只共享只读配置。
/// - 情绪源与叙述生成器是可选协作方，缺失时对应部分为空。
pub struct DiagnosisService {
    // 日线行情来源（含备用源切换）
    series_source: Arc<dyn SeriesSource>,
    // 资金流向与分布数据源
    flow_provider: Arc<dyn CapitalFlowProvider>,
    // 资讯情绪来源
    sentiment_source: Option<Arc<dyn SentimentSource>>,
    // 叙述性报告生成器
    narrator: Option<Arc<dyn Narrator>>,
    config: Arc<AppConfig>,
    scoring: ScoringEngine,
}

impl DiagnosisService {
    /// # Summary
    /// 创建 DiagnosisService 实例。
    ///
    /// # Arguments
    /// * `series_source` - 行情来源。
    /// * `flow_provider` - 资金数据源。
    /// * `sentiment_source` - 可选的情绪来源。
    /// * `narrator` - 可选的叙述生成器。
    /// * `config` - 只读配置。
    ///
    /// # Returns
    /// * `Arc<Self>` - 可共享的服务实例。
    pub fn new(
        series_source: Arc<dyn SeriesSource>,
        flow_provider: Arc<dyn CapitalFlowProvider>,
        sentiment_source: Option<Arc<dyn SentimentSource>>,
        narrator: Option<Arc<dyn Narrator>>,
        config: Arc<AppConfig>,
    ) -> Arc<Self> {
        let scoring = ScoringEngine::new(config.scoring.clone());
        Arc::new(Self {
            series_source,
            flow_provider,
            sentiment_source,
            narrator,
            config,
            scoring,
        })
    }

    /// # Summary
    /// 对单只证券做完整诊断。
    ///
    /// # Logic
    /// 1. 解析证券代码，非法代码直接返回错误。
    /// 2. 并发获取行情、日线与分时资金、资金分布、资讯情绪，失败均降级为空。
    /// 3. 计算指标，执行三个维度的分析与规则建议。
    /// 4. 计算技术、资金与综合评分。
    /// 5. 如已配置叙述生成器则请求叙述，失败时叙述为空。
    /// 6. 组装报告。
    ///
    /// # Arguments
    /// * `raw_symbol` - "CODE.MARKET" 形式的证券代码。
    ///
    /// # Returns
    /// * `Result<DiagnosisReport, DiagnosisError>` - 仅在代码非法时失败。
    pub async fn diagnose(&self, raw_symbol: &str) -> Result<DiagnosisReport, DiagnosisError> {
        let symbol = Symbol::parse(raw_symbol).map_err(DiagnosisError::from)?;
        info!("Diagnosing {}", symbol);

        let inputs = self.gather(&symbol).await?;
        let enriched = indicator::enrich(&inputs.series);

        let technical_analysis = technical::analyze(&enriched);
        let capital_flow_analysis = capital_flow::analyze(&inputs.daily_flow, &self.config.scoring.flow_floors);
        let distribution_analysis = distribution::analyze(inputs.snapshot.as_ref());
        let advisory = advisory::compose(&enriched, &inputs.daily_flow);

        let technical_score = self.scoring.technical_score(&technical_analysis);
        let capital_score = self.scoring.capital_score(&capital_flow_analysis);
        let overall_score = self.scoring.composite(
            &technical_analysis,
            &capital_flow_analysis,
            &distribution_analysis,
            inputs.sentiment.as_deref(),
        );
        log_degraded(&symbol, &technical_analysis, &inputs);

        let sentiment = inputs.sentiment.unwrap_or_default();
        let narrative = self
            .narrate(&symbol, &enriched, &inputs.daily_flow, &inputs.intraday_flow, &sentiment)
            .await;

        info!(
            "Diagnosis for {} finished: overall {} ({})",
            symbol, overall_score.normalized_score, overall_score.grade
        );
        Ok(DiagnosisReport {
            symbol: symbol.to_string(),
            as_of: enriched.last().map(|b| b.date()),
            charts: charts(&enriched, &inputs.daily_flow),
            technical_analysis,
            capital_flow_analysis,
            distribution_analysis,
            investment_advice: advisory.advice_text(),
            risk_warning: advisory.risk_text(),
            sentiment,
            narrative,
            grades: GradeBundle {
                overall: overall_score.grade,
                technical: technical_score.grade,
                capital: capital_score.grade,
            },
            overall_score,
            technical_score,
            capital_score,
        })
    }

    /// # Summary
    /// 并发诊断多只证券，结果顺序与输入一致。
    pub async fn diagnose_many(&self, symbols: &[String]) -> Vec<Result<DiagnosisReport, DiagnosisError>> {
        join_all(symbols.iter().map(|s| self.diagnose(s))).await
    }

    /// # Summary
    /// 获取诊断所需的外部数据。
    ///
    /// # Logic
    /// 1. 各数据源请求并发进行。
    /// 2. 行情非法代码错误向上传播，其余错误记录日志后降级为空数据。
    /// 3. 日线资金记录按时间升序排列。
    async fn gather(&self, symbol: &Symbol) -> Result<Inputs, DiagnosisError> {
        let raw = symbol.to_string();
        let (series, daily, intraday, snapshot, sentiment) = futures::join!(
            self.series_source.fetch(&raw, self.config.feed.lookback_days),
            self.flow_provider.fetch_flow(symbol, FlowGranularity::Daily),
            self.flow_provider.fetch_flow(symbol, FlowGranularity::Intraday),
            self.flow_provider.fetch_distribution(symbol),
            self.fetch_sentiment(symbol),
        );

        let series = match series {
            Ok(series) => series,
            Err(e @ MarketError::InvalidSymbol(_)) => return Err(e.into()),
            Err(e) => {
                warn!("No price history for {}: {}", symbol, e);
                BarSeries::empty()
            }
        };
        let mut daily_flow = daily.unwrap_or_else(|e| {
            warn!("Daily capital flow unavailable for {}: {}", symbol, e);
            Vec::new()
        });
        daily_flow.sort_by_key(|r| r.timestamp);
        let intraday_flow = intraday.unwrap_or_else(|e| {
            debug!("Intraday capital flow unavailable for {}: {}", symbol, e);
            Vec::new()
        });
        let snapshot = snapshot.unwrap_or_else(|e| {
            warn!("Capital distribution unavailable for {}: {}", symbol, e);
            None
        });

        Ok(Inputs {
            series,
            daily_flow,
            intraday_flow,
            snapshot,
            sentiment,
        })
    }

    async fn fetch_sentiment(&self, symbol: &Symbol) -> Option<Vec<SentimentItem>> {
        let source = self.sentiment_source.as_ref()?;
        match source.fetch_sentiment(symbol).await {
            Ok(items) => Some(items),
            Err(e) => {
                warn!("Sentiment unavailable for {}: {}", symbol, e);
                None
            }
        }
    }

    /// # Summary
    /// 请求叙述性报告，上下文为最近 30 根 K 线、最近 30 条日线资金记录、当日分时资金记录和资讯标题。
    async fn narrate(
        &self,
        symbol: &Symbol,
        enriched: &EnrichedSeries,
        daily_flow: &[CapitalFlowRecord],
        intraday_flow: &[CapitalFlowRecord],
        sentiment: &[SentimentItem],
    ) -> Option<String> {
        let narrator = self.narrator.as_ref()?;
        let bars = enriched.as_slice();
        let request = NarrativeRequest {
            symbol: symbol.to_string(),
            recent_bars: bars[bars.len().saturating_sub(NARRATIVE_WINDOW)..].to_vec(),
            flow: daily_flow[daily_flow.len().saturating_sub(NARRATIVE_WINDOW)..]
                .iter()
                .chain(intraday_flow)
                .cloned()
                .collect(),
            headlines: sentiment.iter().map(|s| s.title.clone()).collect(),
        };
        match narrator.narrate(&request).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Narrative generation failed for {}: {}", symbol, e);
                None
            }
        }
    }
}

fn log_degraded(symbol: &Symbol, technical: &TechnicalAnalysis, inputs: &Inputs) {
    if technical.has(Signal::InsufficientData) {
        info!("{}: technical dimension degraded ({} bars)", symbol, inputs.series.len());
    }
    if inputs.daily_flow.is_empty() {
        info!("{}: capital flow dimension degraded", symbol);
    }
    if inputs.snapshot.is_none() {
        info!("{}: distribution dimension degraded", symbol);
    }
}

/// 组装图表数据：价格与 EMA5/10/20/60，以及日线资金净流入。
fn charts(enriched: &EnrichedSeries, daily_flow: &[CapitalFlowRecord]) -> ChartData {
    let mut technical = TechnicalChart::default();
    for bar in enriched.iter() {
        technical.dates.push(bar.date());
        technical.closes.push(bar.close());
        technical.ema5.push(bar.ema5);
        technical.ema10.push(bar.ema10);
        technical.ema20.push(bar.ema20);
        technical.ema60.push(bar.ema60);
    }

    let mut capital_flow: Vec<FlowPoint> = daily_flow
        .iter()
        .map(|r| FlowPoint {
            timestamp: r.timestamp,
            net_inflow: r.net_inflow,
        })
        .collect();
    capital_flow.sort_by_key(|p| p.timestamp);

    ChartData {
        technical,
        capital_flow,
    }
}
