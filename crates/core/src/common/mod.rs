pub mod time;

use crate::market::error::MarketError;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// # Summary
/// 支持的交易市场枚举。
///
/// # Invariants
/// - 仅包含沪市、深市、港股、美股四个市场，其余市场代码一律视为非法。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Market {
    // 上海证券交易所
    SH,
    // 深圳证券交易所
    SZ,
    // 香港交易所
    HK,
    // 美国市场
    US,
}

impl Market {
    /// # Summary
    /// 判断该市场是否属于 A 股（境内）市场。
    ///
    /// # Logic
    /// 1. SH 与 SZ 返回 true，其余返回 false。
    ///
    /// # Returns
    /// 是否为境内市场。
    pub fn is_domestic(self) -> bool {
        matches!(self, Market::SH | Market::SZ)
    }

    /// 市场所在时区相对 UTC 的小时偏移（美股按美东标准时间近似）。
    pub fn utc_offset_hours(self) -> i32 {
        match self {
            Market::SH | Market::SZ | Market::HK => 8,
            Market::US => -5,
        }
    }

    /// # Summary
    /// 将 UTC 时刻换算为该市场当地的自然日。
    ///
    /// # Arguments
    /// * `instant`: UTC 时刻。
    ///
    /// # Returns
    /// 市场当地日期。
    pub fn local_date(self, instant: DateTime<Utc>) -> NaiveDate {
        match FixedOffset::east_opt(self.utc_offset_hours() * 3600) {
            Some(offset) => instant.with_timezone(&offset).date_naive(),
            None => instant.date_naive(),
        }
    }
}

impl FromStr for Market {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SH" => Ok(Market::SH),
            "SZ" => Ok(Market::SZ),
            "HK" => Ok(Market::HK),
            "US" => Ok(Market::US),
            other => Err(MarketError::InvalidSymbol(format!(
                "unsupported market: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Market::SH => write!(f, "SH"),
            Market::SZ => write!(f, "SZ"),
            Market::HK => write!(f, "HK"),
            Market::US => write!(f, "US"),
        }
    }
}

/// # Summary
/// 证券标的实体，由 "代码.市场" 形式的字符串解析而来（例如 `000001.SZ`、`00700.HK`）。
///
/// # Invariants
/// - `code` 非空且不含 '.'。
/// - `market` 必须是受支持的市场。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Symbol {
    // 证券代码 (例如: 000001, 00700, AAPL)
    pub code: String,
    // 所属市场
    pub market: Market,
}

impl Symbol {
    /// # Summary
    /// 解析 "CODE.MARKET" 形式的证券代码。
    ///
    /// # Logic
    /// 1. 按 '.' 切分，必须恰好得到两段。
    /// 2. 代码段去除空白后不得为空。
    /// 3. 市场段（大小写不敏感）必须属于受支持集合。
    ///
    /// # Arguments
    /// * `raw`: 原始证券代码字符串。
    ///
    /// # Returns
    /// 成功返回 Symbol，失败返回 `MarketError::InvalidSymbol`。
    pub fn parse(raw: &str) -> Result<Self, MarketError> {
        let mut parts = raw.trim().split('.');
        let (code, market) = match (parts.next(), parts.next(), parts.next()) {
            (Some(code), Some(market), None) => (code.trim(), market.trim()),
            _ => {
                return Err(MarketError::InvalidSymbol(format!(
                    "expected CODE.MARKET, got '{}'",
                    raw
                )));
            }
        };

        if code.is_empty() {
            return Err(MarketError::InvalidSymbol(format!("empty code in '{}'", raw)));
        }

        Ok(Self {
            code: code.to_uppercase(),
            market: market.parse()?,
        })
    }
}

impl FromStr for Symbol {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.code, self.market)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_domestic_symbol() {
        let symbol = Symbol::parse("000001.sz").unwrap();
        assert_eq!(symbol.code, "000001");
        assert_eq!(symbol.market, Market::SZ);
        assert!(symbol.market.is_domestic());
        assert_eq!(symbol.to_string(), "000001.SZ");
    }

    #[test]
    fn test_parse_rejects_unknown_market() {
        let err = Symbol::parse("00700.XX").unwrap_err();
        assert!(matches!(err, MarketError::InvalidSymbol(_)));
    }

    #[test]
    fn test_local_date_crosses_midnight() {
        let instant = DateTime::parse_from_rfc3339("2024-03-01T17:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(Market::SH.local_date(instant), NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert_eq!(Market::US.local_date(instant), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn test_parse_rejects_bad_shape() {
        assert!(Symbol::parse("00700").is_err());
        assert!(Symbol::parse(".HK").is_err());
        assert!(Symbol::parse("A.B.HK").is_err());
    }
}
