use thiserror::Error;

/// # Summary
/// 行情序列获取域错误枚举。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - `UpstreamUnavailable` 与 `MalformedProviderResponse` 只在数据源边界内部流转，
///   对外统一收敛为 `NoData`。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    // 证券代码格式错误或市场不受支持，直接返回给调用方
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),
    // 主数据源与备用数据源均无可用数据
    #[error("No data: {0}")]
    NoData(String),
    // 网络层或数据源服务错误（含超时）
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    // 数据源返回的结构与预期不符
    #[error("Malformed provider response: {0}")]
    MalformedProviderResponse(String),
}
