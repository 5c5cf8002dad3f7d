//! 可观测性：tracing 日志初始化
//!
//! 默认级别来自 [app].log_level；设置 RUST_LOG 时以 RUST_LOG 为准。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 构造日志过滤器：RUST_LOG 优先，其次配置的级别，都无效时退回 info
pub fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level.to_lowercase()))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 初始化全局订阅者；重复调用时忽略（测试中可能多次初始化）
pub fn init(log_level: &str) {
    let _ = tracing_subscriber::registry()
        .with(env_filter(log_level))
        .with(fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_level_is_lowercased() {
        if std::env::var("RUST_LOG").is_err() {
            assert_eq!(env_filter("WARN").to_string(), "warn");
        }
    }
}
