use crate::indicator::len_f64;
use kanpan_core::analysis::entity::{Finding, FindingKey, Horizon, Signal, TechnicalAnalysis};
use kanpan_core::market::entity::{EnrichedBar, EnrichedSeries};
use tracing::debug;

/// 技术分析所需的最少 K 线数量。
pub const MIN_BARS: usize = 60;

/// 均线趋势判定阈值（0.1%）。
pub const TREND_THRESHOLD: f64 = 0.001;

const INSUFFICIENT: &str = "数据不足，无法进行技术分析";

/// 最新一根 K 线上技术分析用到的数值。
#[derive(Debug, Clone, Copy)]
struct Point {
    close: f64,
    ema5: f64,
    ema10: f64,
    ema20: f64,
    ema60: f64,
}

impl Point {
    fn from_bar(bar: &EnrichedBar) -> Option<Self> {
        Some(Self {
            close: bar.close(),
            ema5: bar.ema5?,
            ema10: bar.ema10?,
            ema20: bar.ema20?,
            ema60: bar.ema60?,
        })
    }
}

/// 均线对：(快线周期, 慢线周期, 周期, 快线取值, 慢线取值)
type EmaPair = (u32, u32, Horizon, fn(&Point) -> f64, fn(&Point) -> f64);

const CROSS_PAIRS: [EmaPair; 3] = [
    (5, 10, Horizon::Short, |p| p.ema5, |p| p.ema10),
    (10, 20, Horizon::Medium, |p| p.ema10, |p| p.ema20),
    (20, 60, Horizon::Long, |p| p.ema20, |p| p.ema60),
];

/// 每个周期的趋势均线与观察窗口：(周期, 均线名, 周期数, 窗口长度, 取值)
type TrendSpec = (Horizon, &'static str, u32, usize, fn(&EnrichedBar) -> Option<f64>);

const TREND_SPECS: [TrendSpec; 3] = [
    (Horizon::Short, "EMA5", 5, 5, |b| b.ema5),
    (Horizon::Medium, "EMA20", 20, 10, |b| b.ema20),
    (Horizon::Long, "EMA60", 60, 20, |b| b.ema60),
];

/// # Summary
/// 计算窗口内相邻值变化率的均值。
///
/// # Logic
/// 1. 取末尾 `window` 个值，逐对求 `v[i] / v[i-1] - 1`。
/// 2. 非有限值（除零）忽略。
/// 3. 没有可用变化率时返回 None。
pub fn mean_pct_change(values: &[f64], window: usize) -> Option<f64> {
    let tail = &values[values.len().saturating_sub(window)..];
    let changes: Vec<f64> = tail
        .windows(2)
        .map(|w| w[1] / w[0] - 1.0)
        .filter(|c| c.is_finite())
        .collect();
    if changes.is_empty() {
        return None;
    }
    Some(changes.iter().sum::<f64>() / len_f64(changes.len()))
}

fn classify(trend: Option<f64>) -> Option<bool> {
    match trend {
        Some(t) if t > TREND_THRESHOLD => Some(true),
        Some(t) if t < -TREND_THRESHOLD => Some(false),
        _ => None,
    }
}

fn insufficient() -> TechnicalAnalysis {
    TechnicalAnalysis {
        ema_crosses: Finding::insufficient(FindingKey::EmaCrosses, INSUFFICIENT),
        ema_trends: Finding::insufficient(FindingKey::EmaTrends, INSUFFICIENT),
        price_ema_relation: Finding::insufficient(FindingKey::PriceEmaRelation, INSUFFICIENT),
        trend_judgment: Finding::insufficient(FindingKey::TrendJudgment, INSUFFICIENT),
    }
}

fn finish(mut finding: Finding, parts: Vec<String>, empty_text: &str) -> Finding {
    finding.text = if parts.is_empty() {
        empty_text.to_string()
    } else {
        parts.join("；")
    };
    finding
}

/// # Summary
/// 技术面分析：均线交叉、均线趋势、价格与均线关系、综合趋势判断。
///
/// # Logic
/// 1. 不足 60 根或最新两根缺少均线时返回数据不足的完整结论集。
/// 2. 比较最新与前一根 K 线判断三组均线交叉。
/// 3. 以 EMA5/EMA20/EMA60 近 5/10/20 根的平均变化率判断趋势。
/// 4. 收盘价与三条均线的位置关系及多空排列。
/// 5. 按周期结合趋势方向与价格位置给出判断，三周期同向时标记强势。
///
/// # Arguments
/// * `series`: 已计算指标的日线序列。
///
/// # Returns
/// 始终返回四项结论。
pub fn analyze(series: &EnrichedSeries) -> TechnicalAnalysis {
    let bars = series.as_slice();
    if bars.len() < MIN_BARS {
        debug!("Technical analysis skipped: {} bars", bars.len());
        return insufficient();
    }
    let (Some(latest), Some(prev)) = (
        bars.last().and_then(Point::from_bar),
        bars.get(bars.len() - 2).and_then(Point::from_bar),
    ) else {
        return insufficient();
    };

    // 1. 均线交叉
    let mut crosses = Finding::new(FindingKey::EmaCrosses, "");
    let mut cross_texts = Vec::new();
    for (fast, slow, horizon, fast_of, slow_of) in CROSS_PAIRS {
        let spread = fast_of(&latest) - slow_of(&latest);
        crosses = crosses.with_evidence(&format!("ema{}_ema{}_spread", fast, slow), spread);
        if fast_of(&latest) > slow_of(&latest) && fast_of(&prev) <= slow_of(&prev) {
            cross_texts.push(format!(
                "EMA{}上穿EMA{}，形成{}金叉，预示{}看涨",
                fast,
                slow,
                horizon.label(),
                horizon.label()
            ));
            crosses = crosses.with_signal(Signal::GoldenCross(horizon));
        } else if fast_of(&latest) <= slow_of(&latest) && fast_of(&prev) > slow_of(&prev) {
            cross_texts.push(format!(
                "EMA{}下穿EMA{}，形成{}死叉，预示{}看跌",
                fast,
                slow,
                horizon.label(),
                horizon.label()
            ));
            crosses = crosses.with_signal(Signal::DeathCross(horizon));
        }
    }
    let crosses = finish(crosses, cross_texts, "暂无均线交叉信号");

    // 2. 均线趋势
    let mut trends = Finding::new(FindingKey::EmaTrends, "");
    let mut trend_texts = Vec::new();
    let mut directions = Vec::with_capacity(TREND_SPECS.len());
    for (horizon, name, period, window, value_of) in TREND_SPECS {
        let values: Vec<f64> = bars.iter().filter_map(value_of).collect();
        let trend = mean_pct_change(&values, window);
        if let Some(t) = trend {
            trends = trends.with_evidence(&format!("ema{}_trend", period), t);
        }
        let direction = classify(trend);
        match direction {
            Some(true) => {
                trend_texts.push(format!(
                    "{}均线（{}）呈上升趋势，{}看涨",
                    horizon.label(),
                    name,
                    horizon.label()
                ));
                trends = trends.with_signal(Signal::EmaRising(horizon));
            }
            Some(false) => {
                trend_texts.push(format!(
                    "{}均线（{}）呈下降趋势，{}看跌",
                    horizon.label(),
                    name,
                    horizon.label()
                ));
                trends = trends.with_signal(Signal::EmaFalling(horizon));
            }
            None => {}
        }
        directions.push((horizon, direction));
    }
    let trends = finish(trends, trend_texts, "暂无明确均线趋势");

    // 3. 价格与均线关系
    let mut relation = Finding::new(FindingKey::PriceEmaRelation, "")
        .with_evidence("close", latest.close)
        .with_evidence("ema5", latest.ema5)
        .with_evidence("ema20", latest.ema20)
        .with_evidence("ema60", latest.ema60);
    let levels = [
        (Horizon::Short, "EMA5", latest.ema5),
        (Horizon::Medium, "EMA20", latest.ema20),
        (Horizon::Long, "EMA60", latest.ema60),
    ];
    let mut relation_texts = Vec::new();
    for (horizon, name, level) in levels {
        if latest.close > level {
            relation_texts.push(format!(
                "当前价格位于{}之上，{}支撑较强",
                name,
                horizon.label()
            ));
        } else {
            relation_texts.push(format!(
                "当前价格位于{}之下，{}压力较大",
                name,
                horizon.label()
            ));
        }
    }
    if levels.iter().all(|(_, _, level)| latest.close > *level) {
        relation = relation.with_signal(Signal::PriceAboveAll);
    } else if levels.iter().all(|(_, _, level)| latest.close <= *level) {
        relation = relation.with_signal(Signal::PriceBelowAll);
    }
    if latest.ema5 > latest.ema20 && latest.ema20 > latest.ema60 {
        relation_texts.push("均线呈多头排列，整体趋势向上".to_string());
        relation = relation.with_signal(Signal::BullishAlignment);
    } else if latest.ema5 < latest.ema20 && latest.ema20 < latest.ema60 {
        relation_texts.push("均线呈空头排列，整体趋势向下".to_string());
        relation = relation.with_signal(Signal::BearishAlignment);
    }
    let relation = finish(relation, relation_texts, "暂无明确价格与均线关系");

    // 4. 综合趋势判断
    let mut judgment = Finding::new(FindingKey::TrendJudgment, "");
    let mut judgment_texts = Vec::new();
    let mut ups = 0;
    let mut downs = 0;
    for ((horizon, direction), (_, _, level)) in directions.iter().zip(levels.iter()) {
        match direction {
            Some(true) if latest.close > *level => {
                let advice = match horizon {
                    Horizon::Short => "可考虑逢低布局",
                    Horizon::Medium => "可考虑中线布局",
                    Horizon::Long => "可考虑长线布局",
                };
                judgment_texts.push(format!("{}趋势向上，{}", horizon.label(), advice));
                judgment = judgment.with_signal(Signal::TrendUp(*horizon));
                ups += 1;
            }
            Some(false) if latest.close < *level => {
                let advice = match horizon {
                    Horizon::Short => "建议观望为主",
                    Horizon::Medium => "建议谨慎操作",
                    Horizon::Long => "建议等待企稳",
                };
                judgment_texts.push(format!("{}趋势向下，{}", horizon.label(), advice));
                judgment = judgment.with_signal(Signal::TrendDown(*horizon));
                downs += 1;
            }
            _ => {}
        }
    }
    if ups == TREND_SPECS.len() {
        judgment_texts.push("短中长期趋势共振向上，呈强势上涨格局".to_string());
        judgment = judgment.with_signal(Signal::StrongUptrend);
    } else if downs == TREND_SPECS.len() {
        judgment_texts.push("短中长期趋势共振向下，呈强势下跌格局".to_string());
        judgment = judgment.with_signal(Signal::StrongDowntrend);
    }
    let judgment = finish(judgment, judgment_texts, "暂无明确趋势判断");

    TechnicalAnalysis {
        ema_crosses: crosses,
        ema_trends: trends,
        price_ema_relation: relation,
        trend_judgment: judgment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_pct_change_uses_tail() {
        let values = [100.0, 1.0, 2.0, 4.0];
        // 尾部 3 个值：1 -> 2 -> 4，变化率均为 100%
        assert_eq!(mean_pct_change(&values, 3), Some(1.0));
        assert_eq!(mean_pct_change(&[1.0], 5), None);
    }

    /// 60 根收盘价为 10 的 K 线，EMA20 = EMA60 = 10，最后两根的 (EMA5, EMA10) 由参数给出。
    fn series_with_short_pair(prev: (f64, f64), latest: (f64, f64)) -> EnrichedSeries {
        let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut bars: Vec<EnrichedBar> = kanpan_core::test_utils::bars_from_closes(start, &[10.0; 60])
            .into_iter()
            .map(|bar| EnrichedBar {
                ema5: Some(10.0),
                ema10: Some(10.0),
                ema20: Some(10.0),
                ema60: Some(10.0),
                ..EnrichedBar::bare(bar)
            })
            .collect();
        let n = bars.len();
        bars[n - 2].ema5 = Some(prev.0);
        bars[n - 2].ema10 = Some(prev.1);
        bars[n - 1].ema5 = Some(latest.0);
        bars[n - 1].ema10 = Some(latest.1);
        EnrichedSeries::new(bars).unwrap()
    }

    #[test]
    fn test_death_cross_touching_slow_line() {
        // 从上方回落到与慢线持平即为死叉
        let analysis = analyze(&series_with_short_pair((11.0, 10.0), (10.0, 10.0)));
        assert_eq!(analysis.ema_crosses.signals, vec![Signal::DeathCross(Horizon::Short)]);
        assert!(analysis.ema_crosses.text.starts_with("EMA5下穿EMA10，形成短期死叉"));
    }

    #[test]
    fn test_leaving_tie_downward_is_not_a_cross() {
        // 前一根已持平，继续下行不再重复报死叉
        let analysis = analyze(&series_with_short_pair((10.0, 10.0), (9.0, 10.0)));
        assert!(analysis.ema_crosses.signals.is_empty());
        assert_eq!(analysis.ema_crosses.text, "暂无均线交叉信号");
    }

    #[test]
    fn test_leaving_tie_upward_is_golden_cross() {
        let analysis = analyze(&series_with_short_pair((10.0, 10.0), (11.0, 10.0)));
        assert_eq!(analysis.ema_crosses.signals, vec![Signal::GoldenCross(Horizon::Short)]);
    }

    #[test]
    fn test_classify_threshold() {
        assert_eq!(classify(Some(0.0011)), Some(true));
        assert_eq!(classify(Some(-0.0011)), Some(false));
        assert_eq!(classify(Some(0.001)), None);
        assert_eq!(classify(None), None);
    }
}
