use crate::analysis::entity::{
    CapitalFlowAnalysis, DistributionAnalysis, Grade, ScoreResult, TechnicalAnalysis,
};
use crate::sentiment::entity::SentimentItem;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// # Summary
/// 报告中的评级汇总。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GradeBundle {
    pub overall: Grade,
    pub technical: Grade,
    pub capital: Grade,
}

/// # Summary
/// 价格与均线图表数据，各列与 `dates` 一一对应。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TechnicalChart {
    pub dates: Vec<NaiveDate>,
    pub closes: Vec<f64>,
    pub ema5: Vec<Option<f64>>,
    pub ema10: Vec<Option<f64>>,
    pub ema20: Vec<Option<f64>>,
    pub ema60: Vec<Option<f64>>,
}

/// # Summary
/// 日线资金净流入图表点。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowPoint {
    pub timestamp: NaiveDateTime,
    pub net_inflow: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartData {
    pub technical: TechnicalChart,
    pub capital_flow: Vec<FlowPoint>,
}

/// # Summary
/// 单只证券的完整诊断报告。
///
/// # Invariants
/// - 报告结构与行情来自主源还是备用源无关。
/// - 各维度分析结果始终存在，数据不足时以说明文本体现。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosisReport {
    pub symbol: String,
    // 最新一根 K 线的日期，无行情时为 None
    pub as_of: Option<NaiveDate>,
    pub technical_analysis: TechnicalAnalysis,
    pub capital_flow_analysis: CapitalFlowAnalysis,
    pub distribution_analysis: DistributionAnalysis,
    pub investment_advice: String,
    pub risk_warning: String,
    pub sentiment: Vec<SentimentItem>,
    pub charts: ChartData,
    pub narrative: Option<String>,
    pub overall_score: ScoreResult,
    pub technical_score: ScoreResult,
    pub capital_score: ScoreResult,
    pub grades: GradeBundle,
}
