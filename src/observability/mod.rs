//! 可观测性：tracing 订阅器初始化
//!
//! 库代码只发出事件，订阅器由二进制入口安装。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 安装全局订阅器；RUST_LOG 优先于 default_level，重复调用时保留已安装的订阅器
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
