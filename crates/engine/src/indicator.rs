//! 指标计算：EMA / MACD / RSI。
//!
//! EMA(n)_t = c_t * k + EMA(n)_{t-1} * (1 - k)，k = 2 / (n + 1)，EMA(n)_0 = c_0。
//! 序列短于 n 根时 EMA(n) 在所有 K 线上缺失。
//! DIF = EMA12 - EMA26，DEA = EMA9(DIF)，MACD = 2 * (DIF - DEA)，从下标 26 起输出。
//! RSI(14) 取最近 14 个涨跌幅的简单均值，从下标 14 起输出，avgLoss = 0 时为 100。

use kanpan_core::market::entity::{BarSeries, EnrichedBar, EnrichedSeries};

pub const MACD_FAST: u32 = 12;
pub const MACD_SLOW: u32 = 26;
pub const MACD_SIGNAL: u32 = 9;
pub const RSI_PERIOD: u32 = 14;

/// MACD 家族的首个输出下标。
pub const MACD_START: usize = 26;

/// 把长度换算为 f64，超出 u32 的长度按 u32::MAX 处理。
pub(crate) fn len_f64(n: usize) -> f64 {
    u32::try_from(n).map(f64::from).unwrap_or(f64::from(u32::MAX))
}

/// # Summary
/// 计算 EMA 序列。
///
/// # Logic
/// 1. 长度小于周期时全部缺失。
/// 2. 以首个值为种子逐点递推，之后每个位置都有值。
///
/// # Arguments
/// * `values`: 输入序列。
/// * `period`: 周期 n。
///
/// # Returns
/// 与输入等长的可选值序列。
pub fn ema(values: &[f64], period: u32) -> Vec<Option<f64>> {
    let enough = usize::try_from(period).is_ok_and(|p| p > 0 && values.len() >= p);
    if !enough {
        return vec![None; values.len()];
    }
    ema_recursive(values, period).into_iter().map(Some).collect()
}

/// 不检查长度的 EMA 递推，种子为首个值。
fn ema_recursive(values: &[f64], period: u32) -> Vec<f64> {
    let k = 2.0 / (f64::from(period) + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &v in values {
        let next = match prev {
            None => v,
            Some(p) => v * k + p * (1.0 - k),
        };
        out.push(next);
        prev = Some(next);
    }
    out
}

/// # Summary
/// 计算 RSI 序列（简单均值版本）。
///
/// # Logic
/// 1. 对相邻收盘价求差，拆分为涨幅与跌幅。
/// 2. 下标 i >= period 时取最近 period 个差值的均值。
/// 3. 平均跌幅为 0 时 RSI = 100。
pub fn rsi(closes: &[f64], period: u32) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    let Ok(p) = usize::try_from(period) else {
        return out;
    };
    if p == 0 || closes.len() <= p {
        return out;
    }

    // deltas[i] 对应 closes[i] - closes[i - 1]，deltas[0] 不使用
    let deltas: Vec<f64> = std::iter::once(0.0)
        .chain(closes.windows(2).map(|w| w[1] - w[0]))
        .collect();

    for (i, slot) in out.iter_mut().enumerate().skip(p) {
        let window = &deltas[i + 1 - p..=i];
        let gain: f64 = window.iter().filter(|d| **d > 0.0).sum::<f64>() / f64::from(period);
        let loss: f64 = window.iter().filter(|d| **d < 0.0).map(|d| -d).sum::<f64>() / f64::from(period);
        *slot = Some(if loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + gain / loss)
        });
    }
    out
}

/// # Summary
/// MACD 三元组 (DIF, DEA, MACD)。
///
/// # Logic
/// 1. 序列短于慢线周期时全部缺失。
/// 2. DIF 与 DEA 自下标 0 起递推，但只在下标 >= 26 处输出。
pub fn macd(closes: &[f64]) -> Vec<(Option<f64>, Option<f64>, Option<f64>)> {
    let n = closes.len();
    if n <= MACD_START {
        return vec![(None, None, None); n];
    }

    let fast = ema_recursive(closes, MACD_FAST);
    let slow = ema_recursive(closes, MACD_SLOW);
    let dif: Vec<f64> = fast.iter().zip(slow.iter()).map(|(f, s)| f - s).collect();
    let dea = ema_recursive(&dif, MACD_SIGNAL);

    dif.iter()
        .zip(dea.iter())
        .enumerate()
        .map(|(i, (d, e))| {
            if i < MACD_START {
                (None, None, None)
            } else {
                (Some(*d), Some(*e), Some(2.0 * (d - e)))
            }
        })
        .collect()
}

/// # Summary
/// 为日线序列补充全部技术指标，纯函数。
///
/// # Logic
/// 1. 提取收盘价。
/// 2. 分别计算六条 EMA、MACD 三元组与 RSI。
/// 3. 逐根组装为 EnrichedBar，历史不足的字段保持缺失。
///
/// # Arguments
/// * `series`: 规范日线序列。
///
/// # Returns
/// 与输入等长的新序列，空输入返回空序列。
pub fn enrich(series: &BarSeries) -> EnrichedSeries {
    let closes: Vec<f64> = series.iter().map(|b| b.close).collect();

    let ema5 = ema(&closes, 5);
    let ema10 = ema(&closes, 10);
    let ema12 = ema(&closes, MACD_FAST);
    let ema20 = ema(&closes, 20);
    let ema26 = ema(&closes, MACD_SLOW);
    let ema60 = ema(&closes, 60);
    let macd_rows = macd(&closes);
    let rsi_values = rsi(&closes, RSI_PERIOD);

    series.map_indexed(|i, bar| {
        let (dif, dea, hist) = macd_rows[i];
        EnrichedBar {
            bar: bar.clone(),
            ema5: ema5[i],
            ema10: ema10[i],
            ema12: ema12[i],
            ema20: ema20[i],
            ema26: ema26[i],
            ema60: ema60[i],
            dif,
            dea,
            macd: hist,
            rsi: rsi_values[i],
        }
    })
}
