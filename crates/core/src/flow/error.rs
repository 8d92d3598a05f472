use thiserror::Error;

/// # Summary
/// 资金数据域错误枚举。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    // 当前市场不提供资金数据
    #[error("Unsupported market: {0}")]
    Unsupported(String),
    // 网络层或数据源服务错误
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    // 数据源返回的结构与预期不符
    #[error("Malformed provider response: {0}")]
    MalformedProviderResponse(String),
}
