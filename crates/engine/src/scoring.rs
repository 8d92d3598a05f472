use crate::indicator::len_f64;
use kanpan_core::analysis::entity::{
    CapitalFlowAnalysis, DistributionAnalysis, ScoreResult, Signal, TechnicalAnalysis,
};
use kanpan_core::config::{CompositePolicy, ScoringConfig};
use kanpan_core::sentiment::entity::{Sentiment, SentimentItem};
use tracing::debug;

/// 综合评分各维度的满分。
pub const TECHNICAL_WEIGHT: f64 = 40.0;
pub const CAPITAL_WEIGHT: f64 = 30.0;
pub const DISTRIBUTION_WEIGHT: f64 = 20.0;
pub const SENTIMENT_WEIGHT: f64 = 10.0;

/// 单项评分：(得分, 说明)。
type Part = (f64, &'static str);

/// 三态评分：正向信号、负向信号、其余情况。
fn pick(positive: bool, negative: bool, scores: [Part; 3]) -> Part {
    if positive {
        scores[0]
    } else if negative {
        scores[1]
    } else {
        scores[2]
    }
}

fn sum(parts: &[Part]) -> f64 {
    parts.iter().map(|(score, _)| score).sum()
}

fn texts(parts: &[Part]) -> Vec<String> {
    parts.iter().map(|(_, text)| text.to_string()).collect()
}

fn dimension_line(name: &str, parts: &[Part], weight: f64) -> String {
    let points: Vec<&str> = parts.iter().map(|(_, text)| *text).collect();
    format!("{}得分：{}/{}，{}", name, sum(parts), weight, points.join("；"))
}

/// # Summary
/// 评分引擎：依据结论上的信号标签计算各维度分数与综合分。
///
/// # Invariants
/// - 只读取信号标签与数值依据，从不解析结论文本。
/// - 数据不足的结论不携带方向信号，对应子项落在中性分。
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    fn technical_parts(analysis: &TechnicalAnalysis, table: [[Part; 3]; 3]) -> [Part; 3] {
        [
            pick(
                analysis.has(Signal::BullishAlignment),
                analysis.has(Signal::BearishAlignment),
                table[0],
            ),
            pick(
                analysis.has(Signal::PriceAboveAll),
                analysis.has(Signal::PriceBelowAll),
                table[1],
            ),
            pick(
                analysis.has(Signal::StrongUptrend),
                analysis.has(Signal::StrongDowntrend),
                table[2],
            ),
        ]
    }

    fn capital_parts(analysis: &CapitalFlowAnalysis, table: [[Part; 3]; 2]) -> [Part; 2] {
        let strength = if analysis.has(Signal::StrengthStrong) {
            table[1][0]
        } else if analysis.has(Signal::StrengthWeak) {
            table[1][1]
        } else {
            table[1][2]
        };
        [
            pick(
                analysis.has(Signal::MainCapitalInflow),
                analysis.has(Signal::MainCapitalOutflow),
                table[0],
            ),
            strength,
        ]
    }

    /// # Summary
    /// 技术面单独评分（满分 100）。
    ///
    /// # Logic
    /// 均线排列 30/10/20，价格位置 30/10/20，强势趋势 20/5/12，交叉信号 20/5/10。
    /// 任一周期金叉优先于其他周期的死叉。
    pub fn technical_score(&self, analysis: &TechnicalAnalysis) -> ScoreResult {
        let [alignment, position, trend] = Self::technical_parts(
            analysis,
            [
                [(30.0, "均线多头排列"), (10.0, "均线空头排列"), (20.0, "均线排列中性")],
                [
                    (30.0, "价格位于所有均线之上"),
                    (10.0, "价格位于所有均线之下"),
                    (20.0, "价格与均线关系中性"),
                ],
                [(20.0, "强势上涨趋势"), (5.0, "强势下跌趋势"), (12.0, "趋势中性")],
            ],
        );
        let cross = pick(
            analysis.has_any_golden_cross(),
            analysis.has_any_death_cross(),
            [(20.0, "出现金叉信号"), (5.0, "出现死叉信号"), (10.0, "无明显交叉信号")],
        );
        let parts = [alignment, position, trend, cross];
        ScoreResult::new(sum(&parts), 100.0, texts(&parts))
    }

    /// # Summary
    /// 资金面单独评分（满分 100）：主力方向 60/20/40 + 资金实力 40/10/25。
    pub fn capital_score(&self, analysis: &CapitalFlowAnalysis) -> ScoreResult {
        let parts = Self::capital_parts(
            analysis,
            [
                [
                    (60.0, "主力资金持续净流入"),
                    (20.0, "主力资金持续净流出"),
                    (40.0, "主力资金流向中性"),
                ],
                [(40.0, "资金实力雄厚"), (10.0, "资金实力较弱"), (25.0, "资金实力一般")],
            ],
        );
        ScoreResult::new(sum(&parts), 100.0, texts(&parts))
    }

    /// # Summary
    /// 综合评分。
    ///
    /// # Logic
    /// 1. 技术 40 分：排列 15/5/10，价格位置 15/5/10，强势趋势 10/2/6。
    /// 2. 资金 30 分：主力方向 15/5/10，资金实力 15/5/10。
    /// 3. 分布 20 分：主力占比 >60 得 10、>40 得 7、其余或缺失得 4；结构 10/3/6。
    /// 4. 情绪 10 分：正面占比 >0.6 得 10、>0.4 得 7；负面占比 >0.6 得 2、>0.4 得 4；其余 6。
    /// 5. 无情绪数据时情绪得 0 分；`ExcludeMissing` 策略下同时从满分中扣除。
    ///
    /// # Arguments
    /// * `sentiment`: 情绪数据，None 或空列表均视为缺失。
    pub fn composite(
        &self,
        technical: &TechnicalAnalysis,
        capital: &CapitalFlowAnalysis,
        distribution: &DistributionAnalysis,
        sentiment: Option<&[SentimentItem]>,
    ) -> ScoreResult {
        let technical_parts = Self::technical_parts(
            technical,
            [
                [
                    (15.0, "均线多头排列，趋势良好"),
                    (5.0, "均线空头排列，趋势较弱"),
                    (10.0, "均线趋势中性"),
                ],
                [
                    (15.0, "价格位于所有均线之上，强势特征明显"),
                    (5.0, "价格位于所有均线之下，弱势特征明显"),
                    (10.0, "价格与均线关系中性"),
                ],
                [(10.0, "强势上涨趋势"), (2.0, "强势下跌趋势"), (6.0, "趋势中性")],
            ],
        );
        let capital_parts = Self::capital_parts(
            capital,
            [
                [
                    (15.0, "主力资金持续净流入"),
                    (5.0, "主力资金持续净流出"),
                    (10.0, "主力资金流向中性"),
                ],
                [(15.0, "资金实力雄厚"), (5.0, "资金实力较弱"), (10.0, "资金实力一般")],
            ],
        );
        let share = match distribution.main_ratio() {
            Some(ratio) if ratio > 60.0 => (10.0, "主力资金占比高，市场结构良好"),
            Some(ratio) if ratio > 40.0 => (7.0, "主力资金占比适中"),
            Some(_) => (4.0, "主力资金占比偏低"),
            None => (4.0, "暂无资金分布数据"),
        };
        let structure = pick(
            distribution.has(Signal::MainInRetailOut),
            distribution.has(Signal::MainOutRetailIn),
            [
                (10.0, "资金结构趋势良好"),
                (3.0, "资金结构存在风险"),
                (6.0, "资金结构趋势中性"),
            ],
        );
        let distribution_parts = [share, structure];

        let mut raw = sum(&technical_parts) + sum(&capital_parts) + sum(&distribution_parts);
        let mut max = TECHNICAL_WEIGHT + CAPITAL_WEIGHT + DISTRIBUTION_WEIGHT;
        let mut explanation = vec![
            dimension_line("技术分析", &technical_parts, TECHNICAL_WEIGHT),
            dimension_line("资金流向", &capital_parts, CAPITAL_WEIGHT),
            dimension_line("资金分布", &distribution_parts, DISTRIBUTION_WEIGHT),
        ];

        match sentiment.filter(|items| !items.is_empty()) {
            Some(items) => {
                let part = sentiment_part(items);
                raw += part.0;
                max += SENTIMENT_WEIGHT;
                explanation.push(dimension_line("情绪分析", &[part], SENTIMENT_WEIGHT));
            }
            None => match self.config.composite_policy {
                CompositePolicy::PenalizeMissing => {
                    max += SENTIMENT_WEIGHT;
                    explanation.push(format!("情绪分析得分：0/{}，暂无舆情数据", SENTIMENT_WEIGHT));
                }
                CompositePolicy::ExcludeMissing => {
                    explanation.push("情绪分析未纳入评分，暂无舆情数据".to_string());
                }
            },
        }

        debug!("Composite score {}/{}", raw, max);
        ScoreResult::new(raw, max, explanation)
    }
}

/// 按正负面占比给情绪打分。
fn sentiment_part(items: &[SentimentItem]) -> Part {
    let total = len_f64(items.len());
    let ratio = |kind: Sentiment| len_f64(items.iter().filter(|i| i.sentiment == kind).count()) / total;
    let positive = ratio(Sentiment::Positive);
    let negative = ratio(Sentiment::Negative);
    if positive > 0.6 {
        (10.0, "新闻舆情非常正面")
    } else if positive > 0.4 {
        (7.0, "新闻舆情偏正面")
    } else if negative > 0.6 {
        (2.0, "新闻舆情非常负面")
    } else if negative > 0.4 {
        (4.0, "新闻舆情偏负面")
    } else {
        (6.0, "新闻舆情中性")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(kinds: &[Sentiment]) -> Vec<SentimentItem> {
        kinds
            .iter()
            .map(|k| SentimentItem {
                title: "资讯".to_string(),
                sentiment: *k,
            })
            .collect()
    }

    #[test]
    fn test_sentiment_ratios() {
        use Sentiment::*;
        assert_eq!(sentiment_part(&items(&[Positive, Positive, Positive, Neutral])).0, 10.0);
        assert_eq!(sentiment_part(&items(&[Positive, Neutral])).0, 7.0);
        assert_eq!(sentiment_part(&items(&[Negative, Negative, Negative, Neutral])).0, 2.0);
        assert_eq!(sentiment_part(&items(&[Negative, Neutral])).0, 4.0);
        assert_eq!(sentiment_part(&items(&[Neutral, Neutral, Positive])).0, 6.0);
    }

    #[test]
    fn test_dimension_line_format() {
        let line = dimension_line("技术分析", &[(15.0, "甲"), (10.0, "乙")], 40.0);
        assert_eq!(line, "技术分析得分：25/40，甲；乙");
    }
}
