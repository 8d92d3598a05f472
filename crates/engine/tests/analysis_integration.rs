use chrono::NaiveDate;
use kanpan_core::analysis::entity::{Grade, Horizon, Signal};
use kanpan_core::config::{CompositePolicy, FlowFloors, ScoringConfig};
use kanpan_core::flow::entity::OrderBuckets;
use kanpan_core::market::entity::{EnrichedSeries, Series};
use kanpan_core::sentiment::entity::{Sentiment, SentimentItem};
use kanpan_core::test_utils::{bars_from_closes, daily_flows, distribution, flow_record};
use kanpan_engine::scoring::ScoringEngine;
use kanpan_engine::{advisory, capital_flow, distribution as dist, indicator, technical};

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn enriched(closes: &[f64]) -> EnrichedSeries {
    indicator::enrich(&Series::new(bars_from_closes(start(), closes)).unwrap())
}

fn linear(n: u32, from: f64, step: f64) -> Vec<f64> {
    (0..n).map(|i| from + f64::from(i) * step).collect()
}

fn engine(policy: CompositePolicy) -> ScoringEngine {
    ScoringEngine::new(ScoringConfig {
        composite_policy: policy,
        ..ScoringConfig::default()
    })
}

/// # Summary
/// 30 条净流入 +1 的日线记录：净流入结论，30 日部分得 40 分。
#[test]
fn test_thirty_days_of_inflow() {
    let records = daily_flows(start(), &[1.0; 30]);
    let result = capital_flow::analyze(&records, &FlowFloors::default());

    assert!(result.thirty_day_trend.has(Signal::NetInflow));
    assert_eq!(result.strength_assessment.evidence_value("thirty_day_points"), Some(40.0));
    assert!(result.thirty_day_trend.text.starts_with("近30日累计净流入30.00亿元"));
    assert!(result.main_capital.has(Signal::MainCapitalInflow));
    assert!(result.strength_assessment.has(Signal::StrengthStrong));
    assert!(result.strength_assessment.text.contains("综合评估：资金实力雄厚"));
}

#[test]
fn test_flow_window_uses_most_recent_records() {
    // 前 10 条大幅流出落在 30 日窗口之外，记录顺序打乱
    let mut nets = vec![-50.0; 10];
    nets.extend(std::iter::repeat_n(0.5, 30));
    let mut records = daily_flows(start(), &nets);
    records.reverse();

    let result = capital_flow::analyze(&records, &FlowFloors::default());

    assert_eq!(result.thirty_day_trend.evidence_value("net_30d"), Some(15.0));
    assert_eq!(result.main_capital.evidence_value("net_5d"), Some(2.5));
}

#[test]
fn test_mild_outflow_stays_above_floor() {
    // 30 日合计 -0.06：高于 -0.1 底线；主力 -0.06 低于 -0.05 底线
    let mut records = daily_flows(start(), &[0.0; 29]);
    records.push(flow_record(NaiveDate::from_ymd_opt(2024, 2, 15).unwrap(), -0.06, -0.06));

    let result = capital_flow::analyze(&records, &FlowFloors::default());

    assert_eq!(result.strength_assessment.evidence_value("thirty_day_points"), Some(20.0));
    // 20 + 0 + 0
    assert_eq!(result.strength_assessment.evidence_value("strength_score"), Some(20.0));
    assert!(result.strength_assessment.has(Signal::StrengthWeak));
    assert!(result.main_capital.has(Signal::MainCapitalOutflow));
}

#[test]
fn test_no_flow_records_is_insufficient() {
    let result = capital_flow::analyze(&[], &FlowFloors::default());
    assert!(result.has(Signal::InsufficientData));
    assert_eq!(result.thirty_day_trend.text, "暂无历史资金流向数据");
}

#[test]
fn test_rising_series_is_bullish() {
    let series = enriched(&linear(80, 10.0, 0.5));
    let analysis = technical::analyze(&series);

    assert!(analysis.price_ema_relation.has(Signal::PriceAboveAll));
    assert!(analysis.price_ema_relation.has(Signal::BullishAlignment));
    assert!(analysis.trend_judgment.has(Signal::StrongUptrend));
    assert!(analysis.ema_trends.has(Signal::EmaRising(Horizon::Long)));
    assert_eq!(analysis.ema_crosses.text, "暂无均线交叉信号");

    // 30 + 30 + 20 + 10
    let score = engine(CompositePolicy::PenalizeMissing).technical_score(&analysis);
    assert_eq!(score.raw_score, 90.0);
    assert_eq!(score.grade, Grade::A);
}

#[test]
fn test_falling_series_is_bearish() {
    let series = enriched(&linear(80, 100.0, -0.5));
    let analysis = technical::analyze(&series);

    assert!(analysis.has(Signal::PriceBelowAll));
    assert!(analysis.has(Signal::BearishAlignment));
    assert!(analysis.has(Signal::StrongDowntrend));
    assert!(analysis.trend_judgment.text.contains("短期趋势向下，建议观望为主"));

    // 10 + 10 + 5 + 10
    let score = engine(CompositePolicy::PenalizeMissing).technical_score(&analysis);
    assert_eq!(score.raw_score, 35.0);
    assert_eq!(score.grade, Grade::E);
}

#[test]
fn test_breakout_produces_golden_crosses() {
    // 缓慢下跌后放量突破，三组均线同时上穿
    let mut closes = linear(79, 20.0, -0.1);
    closes.push(100.0);
    let analysis = technical::analyze(&enriched(&closes));

    assert!(analysis.has_any_golden_cross());
    assert!(!analysis.has_any_death_cross());
    assert!(analysis.ema_crosses.text.contains("EMA5上穿EMA10，形成短期金叉，预示短期看涨"));
    assert!(analysis.ema_crosses.text.contains("EMA20上穿EMA60，形成长期金叉"));
}

#[test]
fn test_short_series_is_neutral_everywhere() {
    let series = enriched(&linear(30, 10.0, 0.1));
    let analysis = technical::analyze(&series);

    for finding in analysis.findings() {
        assert_eq!(finding.text, "数据不足，无法进行技术分析");
        assert_eq!(finding.signals, vec![Signal::InsufficientData]);
    }
    // 20 + 20 + 12 + 10
    let score = engine(CompositePolicy::PenalizeMissing).technical_score(&analysis);
    assert_eq!(score.raw_score, 62.0);
}

#[test]
fn test_composite_denominator_follows_policy() {
    let technical = technical::analyze(&enriched(&[10.0, 11.0]));
    let capital = capital_flow::analyze(&[], &FlowFloors::default());
    let distribution = dist::analyze(None);

    // 技术 26 + 资金 20 + 分布 10 = 56
    let penalized =
        engine(CompositePolicy::PenalizeMissing).composite(&technical, &capital, &distribution, None);
    assert_eq!(penalized.raw_score, 56.0);
    assert_eq!(penalized.max_score, 100.0);
    assert_eq!(penalized.grade, Grade::D);

    let empty: Vec<SentimentItem> = Vec::new();
    let excluded = engine(CompositePolicy::ExcludeMissing).composite(
        &technical,
        &capital,
        &distribution,
        Some(empty.as_slice()),
    );
    assert_eq!(excluded.max_score, 90.0);
    assert_eq!(excluded.normalized_score, 62.2);
    assert_eq!(excluded.grade, Grade::C);
}

#[test]
fn test_distribution_line_distinguishes_missing_from_low_share() {
    let technical = technical::analyze(&enriched(&[10.0, 11.0]));
    let capital = capital_flow::analyze(&[], &FlowFloors::default());
    let scoring = engine(CompositePolicy::PenalizeMissing);

    let missing = scoring.composite(&technical, &capital, &dist::analyze(None), None);
    assert_eq!(missing.explanation[2], "资金分布得分：10/20，暂无资金分布数据；资金结构趋势中性");

    // 主力占比 20%
    let snapshot = distribution(
        OrderBuckets { super_: 1.0, big: 1.0, mid: 4.0, small: 4.0 },
        OrderBuckets { super_: 1.0, big: 1.0, mid: 4.0, small: 4.0 },
    );
    let low = scoring.composite(&technical, &capital, &dist::analyze(Some(&snapshot)), None);
    assert_eq!(low.explanation[2], "资金分布得分：10/20，主力资金占比偏低；资金结构趋势中性");
    assert_eq!(low.raw_score, missing.raw_score);
}

#[test]
fn test_composite_best_case() {
    let technical = technical::analyze(&enriched(&linear(80, 10.0, 0.5)));
    let capital = capital_flow::analyze(&daily_flows(start(), &[1.0; 30]), &FlowFloors::default());
    let snapshot = distribution(
        OrderBuckets { super_: 5.0, big: 3.0, mid: 0.5, small: 0.5 },
        OrderBuckets { super_: 1.0, big: 1.0, mid: 1.0, small: 1.0 },
    );
    let distribution = dist::analyze(Some(&snapshot));
    let sentiment = vec![
        SentimentItem { title: "业绩预增".into(), sentiment: Sentiment::Positive },
        SentimentItem { title: "获机构增持".into(), sentiment: Sentiment::Positive },
    ];

    let score = engine(CompositePolicy::PenalizeMissing).composite(
        &technical,
        &capital,
        &distribution,
        Some(sentiment.as_slice()),
    );

    assert_eq!(score.raw_score, 100.0);
    assert_eq!(score.normalized_score, 100.0);
    assert_eq!(score.grade, Grade::A);
    assert_eq!(score.explanation.len(), 4);
    assert!(score.explanation[0].starts_with("技术分析得分：40/40，均线多头排列，趋势良好"));
    assert!(score.explanation[3].contains("新闻舆情非常正面"));
}

#[test]
fn test_advisory_insufficient_bars() {
    let advisory = advisory::compose(&enriched(&[10.0]), &[]);
    assert_eq!(advisory.advice_text(), "数据不足，无法给出投资建议");
    assert_eq!(advisory.risk_text(), "数据不足，无法给出风险提示");
}

#[test]
fn test_advisory_on_steady_rise() {
    let advisory = advisory::compose(&enriched(&linear(80, 10.0, 0.5)), &[]);

    assert_eq!(advisory.advice[0], "当前价格位于短期和中期均线之上，技术面偏强");
    assert!(advisory.advice.iter().any(|a| a == "RSI处于超买区域，注意回调风险"));
    assert!(advisory.risks.iter().any(|r| r == "RSI处于严重超买区域，存在大幅回调风险"));
}

#[test]
fn test_advisory_accelerating_outflow() {
    let series = enriched(&linear(80, 100.0, -0.5));
    let flows = daily_flows(start(), &[-1.0, -2.0]);

    let advisory = advisory::compose(&series, &flows);

    assert!(advisory.advice.iter().any(|a| a == "资金持续流出且加速，建议控制仓位"));
    assert!(advisory.risks.iter().any(|r| r == "资金持续流出且加速，存在继续下跌风险"));
    assert!(advisory.risks.iter().any(|r| r == "主力资金持续流出且加速，存在较大下跌风险"));
    assert!(advisory.risks.iter().any(|r| r == "价格位于短期和中期均线之下，存在继续下跌风险"));
}

#[test]
fn test_advisory_volatility_warning() {
    let closes: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 10.0 } else { 12.0 }).collect();
    let advisory = advisory::compose(&enriched(&closes), &[]);

    assert!(advisory.risks.iter().any(|r| r.starts_with("近期波动率较大")));
}

#[test]
fn test_advisory_quiet_market_defaults() {
    let advisory = advisory::compose(&enriched(&[10.0, 10.0, 10.0]), &[]);
    assert_eq!(advisory.advice_text(), "暂无明确投资建议，建议观望为主");
    assert_eq!(advisory.risk_text(), "暂无明确风险提示，但仍需注意市场风险");
}
