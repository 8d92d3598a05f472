use crate::indicator::len_f64;
use kanpan_core::analysis::entity::{CapitalFlowAnalysis, Finding, FindingKey, Signal};
use kanpan_core::config::FlowFloors;
use kanpan_core::flow::entity::CapitalFlowRecord;
use tracing::debug;

/// 资金趋势观察窗口（条）。
pub const LONG_WINDOW: usize = 30;
pub const SHORT_WINDOW: usize = 5;

/// 资金实力评级阈值。
const STRONG_TOTAL: u32 = 80;
const MODERATE_TOTAL: u32 = 50;

/// 窗口内各项净额合计（亿元）。
#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    net: f64,
    main: f64,
    super_: f64,
    big: f64,
}

impl Totals {
    fn of(records: &[&CapitalFlowRecord]) -> Self {
        records.iter().fold(Self::default(), |acc, r| Self {
            net: acc.net + r.net_inflow,
            main: acc.main + r.main_net_inflow,
            super_: acc.super_ + r.super_net_inflow,
            big: acc.big + r.big_net_inflow,
        })
    }
}

fn flow_word(value: f64) -> &'static str {
    if value > 0.0 { "净流入" } else { "净流出" }
}

/// 按正值 / 底线之上 / 底线之下三档给分。
fn tier(value: f64, floor: f64, full: u32, half: u32) -> u32 {
    if value > 0.0 {
        full
    } else if value > floor {
        half
    } else {
        0
    }
}

/// # Summary
/// 日线资金流向分析：近 30 日趋势、主力资金、资金实力评估。
///
/// # Logic
/// 1. 无记录时三项结论均为数据不足。
/// 2. 记录按时间排序，取最近 30 条与最近 5 条。
/// 3. 资金实力 = 30 日合计 (40/20/0) + 主力合计 (30/15/0) + 5 日合计 (30/15/0)。
///
/// # Arguments
/// * `records`: 日线资金记录，单位亿元，顺序任意。
/// * `floors`: 三档评分的底线。
pub fn analyze(records: &[CapitalFlowRecord], floors: &FlowFloors) -> CapitalFlowAnalysis {
    if records.is_empty() {
        debug!("Capital flow analysis skipped: no records");
        return CapitalFlowAnalysis {
            thirty_day_trend: Finding::insufficient(FindingKey::ThirtyDayTrend, "暂无历史资金流向数据"),
            main_capital: Finding::insufficient(FindingKey::MainCapital, "暂无主力资金数据"),
            strength_assessment: Finding::insufficient(FindingKey::StrengthAssessment, "暂无资金实力评估"),
        };
    }

    let mut sorted: Vec<&CapitalFlowRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.timestamp);
    let long = &sorted[sorted.len().saturating_sub(LONG_WINDOW)..];
    let short = &sorted[sorted.len().saturating_sub(SHORT_WINDOW)..];

    let thirty = Totals::of(long);
    let five = Totals::of(short);
    let average = thirty.net / len_f64(long.len());

    // 1. 近 30 日趋势
    let thirty_day_trend = Finding::new(
        FindingKey::ThirtyDayTrend,
        format!(
            "近30日累计{}{:.2}亿元，日均{}{:.2}亿元",
            flow_word(thirty.net),
            thirty.net.abs(),
            flow_word(average),
            average.abs()
        ),
    )
    .with_evidence("net_30d", thirty.net)
    .with_evidence("avg_30d", average)
    .with_signal(if thirty.net > 0.0 {
        Signal::NetInflow
    } else {
        Signal::NetOutflow
    });

    // 2. 主力资金
    let activity = if five.net > 0.0 {
        format!("近5日净流入{:.2}亿元，资金活跃度较高", five.net)
    } else {
        format!("近5日净流出{:.2}亿元，资金活跃度较低", five.net.abs())
    };
    let main_capital = Finding::new(
        FindingKey::MainCapital,
        [
            format!("主力资金近30日{}{:.2}亿元", flow_word(thirty.main), thirty.main.abs()),
            format!("超大单{}{:.2}亿元", flow_word(thirty.super_), thirty.super_.abs()),
            format!("大单{}{:.2}亿元", flow_word(thirty.big), thirty.big.abs()),
            activity,
        ]
        .join("；"),
    )
    .with_evidence("main_30d", thirty.main)
    .with_evidence("super_30d", thirty.super_)
    .with_evidence("big_30d", thirty.big)
    .with_evidence("net_5d", five.net)
    .with_signal(if thirty.main > 0.0 {
        Signal::MainCapitalInflow
    } else {
        Signal::MainCapitalOutflow
    });

    // 3. 资金实力
    let long_score = tier(thirty.net, floors.thirty_day, 40, 20);
    let main_score = tier(thirty.main, floors.main, 30, 15);
    let short_score = tier(five.net, floors.five_day, 30, 15);
    let total = long_score + main_score + short_score;

    let mut parts = vec![
        match long_score {
            40 => "近30日资金持续流入，资金实力较强",
            20 => "近30日资金小幅流出，资金实力一般",
            _ => "近30日资金大幅流出，资金实力较弱",
        },
        match main_score {
            30 => "主力资金持续流入，主力资金实力较强",
            15 => "主力资金小幅流出，主力资金实力一般",
            _ => "主力资金大幅流出，主力资金实力较弱",
        },
        match short_score {
            30 => "近期资金活跃度较高，短期资金实力较强",
            15 => "近期资金活跃度一般，短期资金实力一般",
            _ => "近期资金活跃度较低，短期资金实力较弱",
        },
    ];
    let signal = if total >= STRONG_TOTAL {
        parts.push("综合评估：资金实力雄厚，有能力推动股价上涨");
        Signal::StrengthStrong
    } else if total >= MODERATE_TOTAL {
        parts.push("综合评估：资金实力一般，可能维持震荡");
        Signal::StrengthModerate
    } else {
        parts.push("综合评估：资金实力较弱，可能面临调整");
        Signal::StrengthWeak
    };
    let strength_assessment = Finding::new(FindingKey::StrengthAssessment, parts.join("；"))
        .with_evidence("strength_score", f64::from(total))
        .with_evidence("thirty_day_points", f64::from(long_score))
        .with_signal(signal);

    CapitalFlowAnalysis {
        thirty_day_trend,
        main_capital,
        strength_assessment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_breakpoints() {
        assert_eq!(tier(0.5, -0.1, 40, 20), 40);
        assert_eq!(tier(0.0, -0.1, 40, 20), 20);
        assert_eq!(tier(-0.05, -0.1, 40, 20), 20);
        assert_eq!(tier(-0.1, -0.1, 40, 20), 0);
        assert_eq!(tier(-3.0, -0.1, 40, 20), 0);
    }

    #[test]
    fn test_flow_word() {
        assert_eq!(flow_word(1.0), "净流入");
        assert_eq!(flow_word(-1.0), "净流出");
    }
}
