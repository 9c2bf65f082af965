//! 优雅关闭处理
//!
//! Ctrl+C / SIGTERM 触发 CancellationToken；管线在阶段之间、精修循环在每次状态迁移前检查该 token，
//! 取消后仍会返回目前为止最好的文档。

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// 关闭信号管理器
#[derive(Clone, Default)]
pub struct ShutdownManager {
    shutdown_token: CancellationToken,
}

/// 关闭原因（仅写入日志）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownReason {
    /// 用户发起 (Ctrl+C)
    UserInitiated,
    /// SIGTERM 信号
    #[cfg_attr(not(unix), allow(dead_code))]
    Signal,
}

impl ShutdownManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取关闭 token（传给管线与精修循环）
    pub fn token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    fn shutdown(&self, reason: ShutdownReason) {
        tracing::info!(reason = ?reason, "cancelling current run");
        self.shutdown_token.cancel();
    }

    /// 安装系统信号处理器 (Ctrl+C, SIGTERM)
    pub fn install_signal_handlers(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                manager.shutdown(ShutdownReason::UserInitiated);
            }
        });

        #[cfg(unix)]
        {
            let manager = Arc::clone(self);
            tokio::spawn(async move {
                use tokio::signal::unix::{signal, SignalKind};
                if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                    sigterm.recv().await;
                    manager.shutdown(ShutdownReason::Signal);
                }
            });
        }
    }
}
