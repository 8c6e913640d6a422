//! 日志初始化

use tracing_subscriber::EnvFilter;

/// 安装全局 tracing subscriber
///
/// 过滤规则读取 `RUST_LOG`，未设置时默认 `info`。`json` 为 true 时输出 JSON 格式。
pub fn init_tracing(json: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
}
