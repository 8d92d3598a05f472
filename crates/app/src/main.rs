use std::sync::Arc;

use kanpan_core::common::time::RealTimeProvider;
use kanpan_core::config::{AppConfig, LogConfig};
use kanpan_core::narrative::port::Narrator;
use kanpan_feed::deepseek::DeepSeekNarrator;
use kanpan_feed::eastmoney::EastmoneyProvider;
use kanpan_feed::yahoo::YahooProvider;
use kanpan_manager::service::DiagnosisService;
use kanpan_market::series::SeriesSourceImpl;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// 可选配置文件（不含扩展名）。
const CONFIG_FILE: &str = "config/kanpan";
const ENV_PREFIX: &str = "KANPAN";

/// # Summary
/// 按 默认值 → 配置文件 → 环境变量 的顺序加载配置。
fn load_config() -> Result<AppConfig, config::ConfigError> {
    config::Config::builder()
        .add_source(config::File::with_name(CONFIG_FILE).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

/// # Summary
/// 初始化日志：终端输出到 stderr，配置了目录时额外按天滚动写文件。
///
/// # Returns
/// 文件写入器的 guard，必须在进程生命周期内持有。
fn init_logging(log: &LogConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let console = fmt::layer().with_writer(std::io::stderr);

    match &log.dir {
        Some(dir) => {
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "kanpan.log"));
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(console).init();
            None
        }
    }
}

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责实例化所有具体实现组件并通过 Arc<dyn Trait> 注入到 DiagnosisService。
///
/// # Logic
/// 1. 加载配置并初始化日志。
/// 2. 实例化基础设施层（Yahoo、东方财富、DeepSeek）。
/// 3. 实例化领域实现层（SeriesSource）。
/// 4. 构造应用服务层（DiagnosisService）。
/// 5. 并发诊断命令行给出的证券代码，逐个输出 JSON 报告。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 配置与日志
    let config = Arc::new(load_config()?);
    let _guard = init_logging(&config.log);
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("TLS crypto provider already installed");
    }
    info!("Kanpan starting...");

    // 2. 实例化基础设施层
    let yahoo = Arc::new(YahooProvider::new(&config.feed)?);
    let eastmoney = Arc::new(EastmoneyProvider::new(&config.feed)?);
    let narrator: Option<Arc<dyn Narrator>> = if config.narrator.api_key.is_some() {
        Some(Arc::new(DeepSeekNarrator::new(&config.narrator)?))
    } else {
        info!("No narrator API key configured, narrative disabled");
        None
    };

    // 3. 实例化领域实现层
    let series_source = SeriesSourceImpl::new(
        yahoo,
        Some(eastmoney.clone()),
        Arc::new(RealTimeProvider),
        config.feed.max_bars,
    );

    // 4. 构造应用服务层
    let service = DiagnosisService::new(series_source, eastmoney, None, narrator, config.clone());

    // 5. 诊断
    let symbols: Vec<String> = std::env::args().skip(1).collect();
    if symbols.is_empty() {
        warn!("No symbols given. Usage: kanpan-app <CODE.MARKET>...");
        return Ok(());
    }

    for (symbol, result) in symbols.iter().zip(service.diagnose_many(&symbols).await) {
        match result {
            Ok(report) => match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(e) => error!("Failed to serialize report for {}: {}", symbol, e),
            },
            Err(e) => error!("Diagnosis failed for {}: {}", symbol, e),
        }
    }

    info!("Kanpan finished");
    Ok(())
}
