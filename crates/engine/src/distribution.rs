use kanpan_core::analysis::entity::{DistributionAnalysis, Finding, FindingKey, Signal};
use kanpan_core::flow::entity::CapitalDistributionSnapshot;

fn direction(value: f64) -> &'static str {
    if value > 0.0 { "净流入" } else { "净流出" }
}

fn amount(label: &str, value: f64) -> String {
    format!("{}{}{:.2}亿元", label, direction(value), value.abs())
}

/// # Summary
/// 由主力与散户两侧净额判定资金结构，任一侧为零时无结论。
fn structure(main_net: f64, retail_net: f64) -> Option<(Signal, &'static str)> {
    if main_net == 0.0 || retail_net == 0.0 {
        return None;
    }
    Some(match (main_net > 0.0, retail_net > 0.0) {
        (true, false) => (Signal::MainInRetailOut, "主力资金流入，散户资金流出，市场结构良好"),
        (false, true) => (Signal::MainOutRetailIn, "主力资金流出，散户资金流入，需警惕风险"),
        (true, true) => (Signal::BothIn, "主力资金和散户资金同步流入，市场情绪较好"),
        (false, false) => (Signal::BothOut, "主力资金和散户资金同步流出，市场情绪较差"),
    })
}

/// # Summary
/// 资金分布分析：主力（超大单 + 大单）与散户（中单 + 小单）的净额与占比。
///
/// # Logic
/// 1. 无快照时三项结论均为数据不足。
/// 2. 各档净额 = 流入 - 流出。
/// 3. 主力占比 = 主力成交额 / 总成交额 × 100，总成交额为零时不给出占比。
/// 4. 依据两侧净额方向给出四种结构状态之一。
pub fn analyze(snapshot: Option<&CapitalDistributionSnapshot>) -> DistributionAnalysis {
    let Some(snapshot) = snapshot else {
        return DistributionAnalysis {
            main_distribution: Finding::insufficient(FindingKey::MainDistribution, "暂无资金分布数据"),
            retail_distribution: Finding::insufficient(FindingKey::RetailDistribution, "暂无资金分布数据"),
            capital_structure: Finding::insufficient(FindingKey::CapitalStructure, "暂无资金分布数据"),
        };
    };
    let (inflow, outflow) = (&snapshot.inflow, &snapshot.outflow);

    let super_net = inflow.super_ - outflow.super_;
    let big_net = inflow.big - outflow.big;
    let mid_net = inflow.mid - outflow.mid;
    let small_net = inflow.small - outflow.small;
    let main_net = inflow.main() - outflow.main();
    let retail_net = inflow.retail() - outflow.retail();
    let total_net = inflow.total() - outflow.total();

    let main_distribution = Finding::new(
        FindingKey::MainDistribution,
        [
            amount("主力资金（超大单+大单）", main_net),
            amount("超大单", super_net),
            amount("大单", big_net),
        ]
        .join("；"),
    )
    .with_evidence("main_net", main_net)
    .with_evidence("super_net", super_net)
    .with_evidence("big_net", big_net);

    let retail_distribution = Finding::new(
        FindingKey::RetailDistribution,
        [
            amount("散户资金（中单+小单）", retail_net),
            amount("中单", mid_net),
            amount("小单", small_net),
        ]
        .join("；"),
    )
    .with_evidence("retail_net", retail_net)
    .with_evidence("mid_net", mid_net)
    .with_evidence("small_net", small_net);

    let mut capital_structure = Finding::new(FindingKey::CapitalStructure, "")
        .with_evidence("total_net", total_net);
    let mut parts = vec![amount("总体资金", total_net)];

    let turnover = inflow.total() + outflow.total();
    if turnover > 0.0 {
        let main_ratio = (inflow.main() + outflow.main()) / turnover * 100.0;
        parts.push(format!(
            "主力资金占比{:.1}%，散户资金占比{:.1}%",
            main_ratio,
            100.0 - main_ratio
        ));
        capital_structure = capital_structure.with_evidence("main_ratio", main_ratio);
    }
    if let Some((signal, text)) = structure(main_net, retail_net) {
        parts.push(text.to_string());
        capital_structure = capital_structure.with_signal(signal);
    }
    capital_structure.text = parts.join("；");

    DistributionAnalysis {
        main_distribution,
        retail_distribution,
        capital_structure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanpan_core::flow::entity::OrderBuckets;
    use kanpan_core::test_utils::distribution;

    fn buckets(super_: f64, big: f64, mid: f64, small: f64) -> OrderBuckets {
        OrderBuckets {
            super_,
            big,
            mid,
            small,
        }
    }

    #[test]
    fn test_missing_snapshot_is_insufficient() {
        let result = analyze(None);
        assert!(result.has(Signal::InsufficientData));
        assert_eq!(result.main_ratio(), None);
        assert_eq!(result.capital_structure.text, "暂无资金分布数据");
    }

    #[test]
    fn test_main_in_retail_out() {
        let snap = distribution(buckets(3.0, 2.0, 1.0, 1.0), buckets(1.0, 1.0, 2.0, 2.0));
        let result = analyze(Some(&snap));

        assert!(result.capital_structure.has(Signal::MainInRetailOut));
        // 主力成交 7，总成交 13
        let ratio = result.main_ratio().unwrap();
        assert!((ratio - 7.0 / 13.0 * 100.0).abs() < 1e-9);
        assert!(result.main_distribution.text.starts_with("主力资金（超大单+大单）净流入3.00亿元"));
        assert!(result.retail_distribution.text.starts_with("散户资金（中单+小单）净流出2.00亿元"));
    }

    #[test]
    fn test_zero_side_has_no_structure_state() {
        let snap = distribution(buckets(1.0, 1.0, 1.0, 1.0), buckets(1.0, 1.0, 0.5, 0.5));
        let result = analyze(Some(&snap));

        assert!(result.capital_structure.signals.is_empty());
        assert!(result.main_ratio().is_some());
    }

    #[test]
    fn test_zero_turnover_has_no_ratio() {
        let snap = distribution(OrderBuckets::default(), OrderBuckets::default());
        let result = analyze(Some(&snap));
        assert_eq!(result.main_ratio(), None);
        assert!(result.capital_structure.signals.is_empty());
    }
}
