use crate::indicator::len_f64;
use kanpan_core::analysis::entity::Advisory;
use kanpan_core::flow::entity::CapitalFlowRecord;
use kanpan_core::market::entity::{EnrichedBar, EnrichedSeries};

const RSI_OVERBOUGHT: f64 = 70.0;
const RSI_OVERSOLD: f64 = 30.0;
const RSI_EXTREME_HIGH: f64 = 80.0;
const RSI_EXTREME_LOW: f64 = 20.0;

/// 波动率（百分比）超过该值时提示风险。
const VOLATILITY_LIMIT: f64 = 5.0;

/// 最新与前一根 K 线上同一数值的相对变化。
#[derive(Debug, Clone, Copy)]
enum Crossing {
    Up,
    Down,
}

fn crossing(prev: (f64, f64), latest: (f64, f64)) -> Option<Crossing> {
    if prev.0 <= prev.1 && latest.0 > latest.1 {
        Some(Crossing::Up)
    } else if prev.0 > prev.1 && latest.0 <= latest.1 {
        Some(Crossing::Down)
    } else {
        None
    }
}

fn pair(a: Option<f64>, b: Option<f64>) -> Option<(f64, f64)> {
    Some((a?, b?))
}

/// # Summary
/// 收盘价涨跌幅的样本标准差（百分比）。
pub fn volatility_pct(bars: &[EnrichedBar]) -> Option<f64> {
    let changes: Vec<f64> = bars
        .windows(2)
        .map(|w| w[1].close() / w[0].close() - 1.0)
        .filter(|c| c.is_finite())
        .collect();
    if changes.len() < 2 {
        return None;
    }
    let n = len_f64(changes.len());
    let mean = changes.iter().sum::<f64>() / n;
    let variance = changes.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt() * 100.0)
}

/// 最近两条资金记录上的 (前值, 最新值)。
fn last_two(flows: &[CapitalFlowRecord], value_of: fn(&CapitalFlowRecord) -> f64) -> Option<(f64, f64)> {
    let mut sorted: Vec<&CapitalFlowRecord> = flows.iter().collect();
    sorted.sort_by_key(|r| r.timestamp);
    match sorted.as_slice() {
        [.., prev, latest] => Some((value_of(prev), value_of(latest))),
        _ => None,
    }
}

/// # Summary
/// 依据固定规则生成投资建议与风险提示。
///
/// # Logic
/// 1. 不足两根 K 线时给出数据不足说明。
/// 2. 建议：价格与 EMA5/EMA20 位置、EMA5/EMA20 交叉、资金加速、RSI 70/30、MACD 零轴穿越。
/// 3. 风险：价格位于均线之下、RSI 80/20、MACD 死叉、资金与主力加速流出、波动率。
/// 4. 无规则触发时给出固定的兜底语句。
///
/// # Arguments
/// * `series`: 已计算指标的日线序列。
/// * `flows`: 日线资金记录，顺序任意。
pub fn compose(series: &EnrichedSeries, flows: &[CapitalFlowRecord]) -> Advisory {
    let bars = series.as_slice();
    let [.., prev, latest] = bars else {
        return Advisory {
            advice: vec!["数据不足，无法给出投资建议".to_string()],
            risks: vec!["数据不足，无法给出风险提示".to_string()],
        };
    };

    let mut advice: Vec<String> = Vec::new();
    let mut risks: Vec<String> = Vec::new();
    let close = latest.close();

    // 价格与均线
    if let (Some(ema5), Some(ema20)) = (latest.ema5, latest.ema20) {
        if close > ema5 && close > ema20 {
            advice.push("当前价格位于短期和中期均线之上，技术面偏强".to_string());
        } else if close < ema5 && close < ema20 {
            advice.push("当前价格位于短期和中期均线之下，技术面偏弱".to_string());
            risks.push("价格位于短期和中期均线之下，存在继续下跌风险".to_string());
        }
    }

    if let (Some(p), Some(l)) = (pair(prev.ema5, prev.ema20), pair(latest.ema5, latest.ema20)) {
        match crossing(p, l) {
            Some(Crossing::Up) => advice.push("短期均线上穿中期均线，可考虑逢低布局".to_string()),
            Some(Crossing::Down) => advice.push("短期均线下穿中期均线，建议观望为主".to_string()),
            None => {}
        }
    }

    // 资金加速
    let net = last_two(flows, |r| r.net_inflow);
    if let Some((prev_net, latest_net)) = net {
        if latest_net > 0.0 && latest_net > prev_net {
            advice.push("资金持续流入且加速，可考虑适当加仓".to_string());
        } else if latest_net < 0.0 && latest_net < prev_net {
            advice.push("资金持续流出且加速，建议控制仓位".to_string());
        }
    }

    if let Some(rsi) = latest.rsi {
        if rsi > RSI_OVERBOUGHT {
            advice.push("RSI处于超买区域，注意回调风险".to_string());
        } else if rsi < RSI_OVERSOLD {
            advice.push("RSI处于超卖区域，可考虑逢低布局".to_string());
        }
        if rsi > RSI_EXTREME_HIGH {
            risks.push("RSI处于严重超买区域，存在大幅回调风险".to_string());
        } else if rsi < RSI_EXTREME_LOW {
            risks.push("RSI处于严重超卖区域，存在继续下跌风险".to_string());
        }
    }

    if let (Some(prev_macd), Some(latest_macd)) = (prev.macd, latest.macd) {
        match crossing((prev_macd, 0.0), (latest_macd, 0.0)) {
            Some(Crossing::Up) => advice.push("MACD金叉，可考虑逢低布局".to_string()),
            Some(Crossing::Down) => {
                advice.push("MACD死叉，建议观望为主".to_string());
                risks.push("MACD死叉，存在下跌风险".to_string());
            }
            None => {}
        }
    }

    if let Some((prev_net, latest_net)) = net
        && latest_net < 0.0
        && latest_net < prev_net
    {
        risks.push("资金持续流出且加速，存在继续下跌风险".to_string());
    }
    if let Some((prev_main, latest_main)) = last_two(flows, |r| r.main_net_inflow)
        && latest_main < 0.0
        && latest_main < prev_main
    {
        risks.push("主力资金持续流出且加速，存在较大下跌风险".to_string());
    }

    if let Some(vol) = volatility_pct(bars)
        && vol > VOLATILITY_LIMIT
    {
        risks.push(format!("近期波动率较大（{:.1}%），存在较大波动风险", vol));
    }

    if advice.is_empty() {
        advice.push("暂无明确投资建议，建议观望为主".to_string());
    }
    if risks.is_empty() {
        risks.push("暂无明确风险提示，但仍需注意市场风险".to_string());
    }
    Advisory { advice, risks }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crossing() {
        assert!(matches!(crossing((1.0, 2.0), (3.0, 2.0)), Some(Crossing::Up)));
        assert!(matches!(crossing((3.0, 2.0), (1.0, 2.0)), Some(Crossing::Down)));
        assert!(crossing((3.0, 2.0), (4.0, 2.0)).is_none());
        // 持平边界：> 到 <= 为下穿，从持平继续下行不算
        assert!(matches!(crossing((3.0, 2.0), (2.0, 2.0)), Some(Crossing::Down)));
        assert!(crossing((2.0, 2.0), (1.0, 2.0)).is_none());
        assert!(matches!(crossing((2.0, 2.0), (3.0, 2.0)), Some(Crossing::Up)));
    }
}
