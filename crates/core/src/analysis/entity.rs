use serde::{Deserialize, Serialize};
use std::fmt;

/// # Summary
/// 分析周期（短期 / 中期 / 长期）。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Horizon {
    Short,
    Medium,
    Long,
}

impl Horizon {
    pub fn label(&self) -> &'static str {
        match self {
            Horizon::Short => "短期",
            Horizon::Medium => "中期",
            Horizon::Long => "长期",
        }
    }
}

/// # Summary
/// 结论附带的枚举信号标签，评分只依据这些标签，不解析文本。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Signal {
    // 均线金叉 / 死叉
    GoldenCross(Horizon),
    DeathCross(Horizon),
    // 均线趋势方向
    EmaRising(Horizon),
    EmaFalling(Horizon),
    // 多头 / 空头排列 (EMA5 > EMA20 > EMA60 及其反向)
    BullishAlignment,
    BearishAlignment,
    // 收盘价相对全部均线的位置
    PriceAboveAll,
    PriceBelowAll,
    // 单周期趋势判断
    TrendUp(Horizon),
    TrendDown(Horizon),
    // 三个周期趋势判断全部一致
    StrongUptrend,
    StrongDowntrend,
    // 资金流向
    NetInflow,
    NetOutflow,
    MainCapitalInflow,
    MainCapitalOutflow,
    StrengthStrong,
    StrengthModerate,
    StrengthWeak,
    // 资金结构
    MainInRetailOut,
    MainOutRetailIn,
    BothIn,
    BothOut,
    // 数据不足，结论仅为说明文本
    InsufficientData,
}

/// # Summary
/// 结论所属的分析项。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FindingKey {
    EmaCrosses,
    EmaTrends,
    PriceEmaRelation,
    TrendJudgment,
    ThirtyDayTrend,
    MainCapital,
    StrengthAssessment,
    MainDistribution,
    RetailDistribution,
    CapitalStructure,
}

/// # Summary
/// 支撑某条结论的一个数值事实。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub name: String,
    pub value: f64,
}

/// # Summary
/// 单条分类结论：自然语言文本 + 数值依据 + 信号标签。
///
/// # Invariants
/// - 数据不足时 `evidence` 为空，`signals` 仅含 `InsufficientData`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub key: FindingKey,
    pub text: String,
    pub evidence: Vec<Evidence>,
    pub signals: Vec<Signal>,
}

impl Finding {
    pub fn new(key: FindingKey, text: impl Into<String>) -> Self {
        Self {
            key,
            text: text.into(),
            evidence: Vec::new(),
            signals: Vec::new(),
        }
    }

    /// 构造一条数据不足的结论。
    pub fn insufficient(key: FindingKey, text: impl Into<String>) -> Self {
        let mut finding = Self::new(key, text);
        finding.signals.push(Signal::InsufficientData);
        finding
    }

    pub fn with_evidence(mut self, name: &str, value: f64) -> Self {
        self.evidence.push(Evidence {
            name: name.to_string(),
            value,
        });
        self
    }

    pub fn with_signal(mut self, signal: Signal) -> Self {
        self.signals.push(signal);
        self
    }

    pub fn has(&self, signal: Signal) -> bool {
        self.signals.contains(&signal)
    }

    /// 按名称查找数值依据。
    pub fn evidence_value(&self, name: &str) -> Option<f64> {
        self.evidence.iter().find(|e| e.name == name).map(|e| e.value)
    }
}

/// # Summary
/// 技术面分析结果，四项结论始终齐全。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalAnalysis {
    pub ema_crosses: Finding,
    pub ema_trends: Finding,
    pub price_ema_relation: Finding,
    pub trend_judgment: Finding,
}

impl TechnicalAnalysis {
    pub fn findings(&self) -> [&Finding; 4] {
        [
            &self.ema_crosses,
            &self.ema_trends,
            &self.price_ema_relation,
            &self.trend_judgment,
        ]
    }

    /// 任意一项结论携带该信号即返回 true。
    pub fn has(&self, signal: Signal) -> bool {
        self.findings().iter().any(|f| f.has(signal))
    }

    /// 是否出现任一周期的金叉（死叉同理）。
    pub fn has_any_golden_cross(&self) -> bool {
        self.ema_crosses
            .signals
            .iter()
            .any(|s| matches!(s, Signal::GoldenCross(_)))
    }

    pub fn has_any_death_cross(&self) -> bool {
        self.ema_crosses
            .signals
            .iter()
            .any(|s| matches!(s, Signal::DeathCross(_)))
    }
}

/// # Summary
/// 资金流向分析结果。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalFlowAnalysis {
    pub thirty_day_trend: Finding,
    pub main_capital: Finding,
    pub strength_assessment: Finding,
}

impl CapitalFlowAnalysis {
    pub fn findings(&self) -> [&Finding; 3] {
        [
            &self.thirty_day_trend,
            &self.main_capital,
            &self.strength_assessment,
        ]
    }

    pub fn has(&self, signal: Signal) -> bool {
        self.findings().iter().any(|f| f.has(signal))
    }
}

/// # Summary
/// 资金分布分析结果。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionAnalysis {
    pub main_distribution: Finding,
    pub retail_distribution: Finding,
    pub capital_structure: Finding,
}

impl DistributionAnalysis {
    pub fn findings(&self) -> [&Finding; 3] {
        [
            &self.main_distribution,
            &self.retail_distribution,
            &self.capital_structure,
        ]
    }

    pub fn has(&self, signal: Signal) -> bool {
        self.findings().iter().any(|f| f.has(signal))
    }

    /// 主力资金占总成交的百分比，无分布数据时为 None。
    pub fn main_ratio(&self) -> Option<f64> {
        self.capital_structure.evidence_value("main_ratio")
    }
}

/// # Summary
/// 字母评级。
///
/// # Invariants
/// - 阈值 80/70/60/50，对分数单调。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Grade {
    A,
    B,
    C,
    D,
    E,
}

impl Grade {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Grade::A
        } else if score >= 70.0 {
            Grade::B
        } else if score >= 60.0 {
            Grade::C
        } else if score >= 50.0 {
            Grade::D
        } else {
            Grade::E
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Grade::A => "优秀",
            Grade::B => "良好",
            Grade::C => "一般",
            Grade::D => "较差",
            Grade::E => "差",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::E => "E",
        };
        write!(f, "{}", s)
    }
}

/// # Summary
/// 一个评分维度的结果。
///
/// # Invariants
/// - `normalized_score = round(raw_score / max_score * 100, 1)`。
/// - `grade` 由 `normalized_score` 决定。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub raw_score: f64,
    pub max_score: f64,
    pub normalized_score: f64,
    pub grade: Grade,
    pub explanation: Vec<String>,
}

impl ScoreResult {
    /// # Summary
    /// 由原始分和满分构造评分结果。
    ///
    /// # Arguments
    /// * `raw_score`: 原始得分。
    /// * `max_score`: 满分，必须为正数；非正数时视为 0 分。
    /// * `explanation`: 按贡献顺序排列的说明文本。
    pub fn new(raw_score: f64, max_score: f64, explanation: Vec<String>) -> Self {
        let normalized_score = if max_score > 0.0 {
            (raw_score / max_score * 1000.0).round() / 10.0
        } else {
            0.0
        };
        Self {
            raw_score,
            max_score,
            normalized_score,
            grade: Grade::from_score(normalized_score),
            explanation,
        }
    }
}

/// # Summary
/// 规则生成的投资建议与风险提示。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    pub advice: Vec<String>,
    pub risks: Vec<String>,
}

impl Advisory {
    pub fn advice_text(&self) -> String {
        self.advice.join("；")
    }

    pub fn risk_text(&self) -> String {
        self.risks.join("；")
    }
}
