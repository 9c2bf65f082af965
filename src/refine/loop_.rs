//! 精修主循环
//!
//! Scoring -> {Approved, Revising, Exhausted, Failed}；Revising -> Scoring。
//! 严格串行：同一时刻只有一个外部调用在途，每次调用受 call_timeout 限制，超时等同于对应的失败。
//! 每次状态迁移前检查 CancellationToken；无论以何种原因终止，都返回 (最佳文档, 状态)。

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::refine::error::{FailureKind, InvalidConfig, RefineError};
use crate::refine::events::RefineEvent;
use crate::refine::policy::{Decision, RefinementConfig};
use crate::refine::types::{Document, RefinementState, TerminationReason};
use crate::refine::{Drafter, Scorer};

/// 有界迭代精修：持有 Scorer、Drafter 与配置，可多次 run（每次 run 状态独立）
pub struct RefinementLoop {
    scorer: Arc<dyn Scorer>,
    drafter: Arc<dyn Drafter>,
    config: RefinementConfig,
    /// 可选：进度事件推送
    event_tx: Option<mpsc::UnboundedSender<RefineEvent>>,
}

impl RefinementLoop {
    /// 配置非法时返回 InvalidConfig
    pub fn new(
        scorer: Arc<dyn Scorer>,
        drafter: Arc<dyn Drafter>,
        config: RefinementConfig,
    ) -> Result<Self, InvalidConfig> {
        config.validate()?;
        Ok(Self {
            scorer,
            drafter,
            config,
            event_tx: None,
        })
    }

    /// 设置事件推送通道
    pub fn with_event_tx(mut self, tx: mpsc::UnboundedSender<RefineEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn config(&self) -> &RefinementConfig {
        &self.config
    }

    fn send_event(&self, ev: RefineEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(ev);
        }
    }

    /// 从起始文档开始精修，直到通过、预算用尽、失败或取消
    ///
    /// 通过时返回通过的那一稿；其余情况返回历史最高分的一稿（同分取最早），
    /// 若一轮评分都没完成则返回起始文档。
    pub async fn run(
        &self,
        start: Document,
        cancel: CancellationToken,
    ) -> (Document, RefinementState) {
        let mut state = RefinementState::new(start, self.config.max_iterations);
        let reason = self.drive(&mut state, &cancel).await;

        match &reason {
            TerminationReason::Failed { .. } => tracing::warn!(reason = %reason, "refinement failed"),
            _ => tracing::info!(reason = %reason, "refinement finished"),
        }
        self.send_event(RefineEvent::Finished {
            reason: reason.label().to_string(),
            detail: reason.to_string(),
            best_iteration: state.best_iteration(),
            best_score: state.best_score(),
        });

        let output = if reason.is_approved() {
            state.current().clone()
        } else {
            state.best_document().clone()
        };
        state.finish(reason);
        (output, state)
    }

    async fn drive(
        &self,
        state: &mut RefinementState,
        cancel: &CancellationToken,
    ) -> TerminationReason {
        if state.current().is_blank() {
            return TerminationReason::Failed {
                error: RefineError::EvaluationUnavailable("starting document is empty".to_string()),
                iteration: 0,
            };
        }

        loop {
            // Scoring
            if cancel.is_cancelled() {
                return TerminationReason::Cancelled {
                    iteration: state.history().len(),
                };
            }
            let iteration = state.begin_round();
            self.send_event(RefineEvent::RoundStarted {
                iteration,
                max_iterations: self.config.max_iterations,
            });
            tracing::debug!(iteration, words = state.current().word_count(), "scoring draft");

            let evaluated = self
                .guarded(
                    cancel,
                    FailureKind::EvaluationUnavailable,
                    self.scorer.evaluate(state.current()),
                )
                .await;
            let result = match evaluated {
                None => {
                    return TerminationReason::Cancelled {
                        iteration: state.history().len(),
                    }
                }
                Some(Err(error)) => return TerminationReason::Failed { error, iteration },
                Some(Ok(result)) => result,
            };

            state.record(&result);
            let passed = result.passes(self.config.approval_threshold);
            tracing::info!(
                iteration,
                score = result.score(),
                threshold = self.config.approval_threshold,
                feedback_items = result.feedback().len(),
                passed,
                "draft evaluated"
            );
            self.send_event(RefineEvent::Evaluated {
                iteration,
                score: result.score(),
                passed,
                feedback: result.feedback().to_vec(),
            });

            match self.config.decide(result.score(), iteration) {
                Decision::Approve => {
                    return TerminationReason::Approved {
                        iteration,
                        score: result.score(),
                    }
                }
                Decision::Exhaust => {
                    return TerminationReason::Exhausted {
                        best_iteration: state.best_iteration().unwrap_or(iteration),
                        best_score: state.best_score().unwrap_or(result.score()),
                    }
                }
                Decision::Revise => {}
            }

            // Revising
            if cancel.is_cancelled() {
                return TerminationReason::Cancelled {
                    iteration: state.history().len(),
                };
            }
            self.send_event(RefineEvent::Revising { iteration });

            let revised = self
                .guarded(
                    cancel,
                    FailureKind::GenerationFailed,
                    self.drafter.revise(state.current(), result.feedback()),
                )
                .await;
            let revised = match revised {
                None => {
                    return TerminationReason::Cancelled {
                        iteration: state.history().len(),
                    }
                }
                Some(Err(error)) => return TerminationReason::Failed { error, iteration },
                Some(Ok(doc)) if doc.is_blank() => {
                    return TerminationReason::Failed {
                        error: RefineError::GenerationFailed("drafter returned empty text".to_string()),
                        iteration,
                    }
                }
                Some(Ok(doc)) => doc,
            };

            tracing::debug!(iteration, words = revised.word_count(), "draft revised");
            self.send_event(RefineEvent::Revised {
                iteration,
                word_count: revised.word_count(),
            });
            state.replace_current(revised);
        }
    }

    /// 带超时与取消的外部调用：取消返回 None；超时与调用错误都归一为 kind 对应的失败
    async fn guarded<T>(
        &self,
        cancel: &CancellationToken,
        kind: FailureKind,
        call: impl Future<Output = Result<T, RefineError>>,
    ) -> Option<Result<T, RefineError>> {
        let timeout = self.config.call_timeout;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            outcome = tokio::time::timeout(timeout, call) => Some(match outcome {
                Ok(result) => result.map_err(|e| e.into_kind(kind)),
                Err(_) => Err(RefineError::of_kind(
                    kind,
                    format!("call timed out after {:.1}s", timeout.as_secs_f64()),
                )),
            }),
        }
    }
}
