//! 可观测性：控制台 + 可选文件日志
//!
//! RUST_LOG 可覆盖默认级别 info；配置了 log_file 时额外写一份纯文本日志（non-blocking writer）。

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 初始化全局 subscriber；返回的 guard 需持有到进程退出，否则文件日志可能丢尾
pub fn init(log_file: Option<&Path>) -> Option<WorkerGuard> {
    let console = fmt::layer().with_target(false).with_filter(env_filter());

    let Some(path) = log_file else {
        let _ = tracing_subscriber::registry().with(console).try_init();
        return None;
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "litsynth.log".into());
    let _ = std::fs::create_dir_all(dir);

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file = fmt::layer()
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(env_filter());

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init();
    Some(guard)
}
