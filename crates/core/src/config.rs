use serde::{Deserialize, Serialize};

/// 全局应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub feed: FeedConfig,
    pub scoring: ScoringConfig,
    pub narrator: NarratorConfig,
    pub log: LogConfig,
}

/// 行情与资金数据源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    // 单次请求超时（秒）
    pub timeout_secs: u64,
    // 日线回溯的自然日数
    pub lookback_days: u32,
    // 单次请求的 K 线数量上限
    pub max_bars: usize,
    pub user_agent: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            lookback_days: 730,
            max_bars: 1000,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        }
    }
}

/// # Summary
/// 综合评分在缺少资讯情绪时的分母策略。
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompositePolicy {
    // 情绪缺失时仍计入 10 分满分（分母恒为 100）
    #[default]
    PenalizeMissing,
    // 情绪缺失时从分母中剔除（分母为 90）
    ExcludeMissing,
}

/// # Summary
/// 资金实力评分中「小幅流出」与「大幅流出」的分界线，单位亿元。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FlowFloors {
    pub thirty_day: f64,
    pub main: f64,
    pub five_day: f64,
}

impl Default for FlowFloors {
    fn default() -> Self {
        Self {
            thirty_day: -0.1,
            main: -0.05,
            five_day: -0.02,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub composite_policy: CompositePolicy,
    pub flow_floors: FlowFloors,
}

/// 叙述生成（大模型）配置，未设置 `api_key` 时不生成叙述
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarratorConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.deepseek.com/v1".to_string(),
            model: "deepseek-chat".to_string(),
            temperature: 0.5,
            max_tokens: 1500,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    // 默认日志级别，可被 RUST_LOG 覆盖
    pub level: String,
    // 日志文件目录，为空时只输出到终端
    pub dir: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.feed.timeout_secs, 10);
        assert_eq!(config.feed.lookback_days, 730);
        assert_eq!(config.feed.max_bars, 1000);
        assert_eq!(config.scoring.composite_policy, CompositePolicy::PenalizeMissing);
        assert_eq!(config.scoring.flow_floors.thirty_day, -0.1);
        assert_eq!(config.scoring.flow_floors.main, -0.05);
        assert_eq!(config.scoring.flow_floors.five_day, -0.02);
        assert!(config.narrator.api_key.is_none());
        assert_eq!(config.narrator.model, "deepseek-chat");
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let raw = r#"{"scoring": {"composite_policy": "exclude_missing"}}"#;
        let config: AppConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.scoring.composite_policy, CompositePolicy::ExcludeMissing);
        assert_eq!(config.scoring.flow_floors, FlowFloors::default());
        assert_eq!(config.feed.max_bars, 1000);
    }
}
