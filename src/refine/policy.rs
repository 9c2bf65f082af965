//! 终止与轮数预算策略
//!
//! RefinementConfig 持有三个可配置参数；decide 根据本轮分数与已用轮数给出下一步：
//! 达标 -> Approve，预算用尽 -> Exhaust，否则 Revise。BestDraft 记录历史最高分草稿（同分取最早）。

use std::time::Duration;

use crate::config::RefinementSection;
use crate::refine::error::InvalidConfig;
use crate::refine::types::{Document, SCORE_MAX, SCORE_MIN};

/// 精修循环配置
#[derive(Debug, Clone, PartialEq)]
pub struct RefinementConfig {
    /// 通过阈值（分数 >= 阈值即通过）
    pub approval_threshold: f64,
    /// 最多评分轮数（>= 1）；修订次数最多为 max_iterations - 1
    pub max_iterations: usize,
    /// 单次 Scorer / Drafter 调用超时
    pub call_timeout: Duration,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            approval_threshold: 8.0,
            max_iterations: 3,
            call_timeout: Duration::from_secs(120),
        }
    }
}

impl From<&RefinementSection> for RefinementConfig {
    fn from(section: &RefinementSection) -> Self {
        Self {
            approval_threshold: section.approval_threshold,
            max_iterations: section.max_iterations,
            call_timeout: section.call_timeout(),
        }
    }
}

/// 一轮评分后的决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Exhaust,
    Revise,
}

impl RefinementConfig {
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if !self.approval_threshold.is_finite()
            || !(SCORE_MIN..=SCORE_MAX).contains(&self.approval_threshold)
        {
            return Err(InvalidConfig(format!(
                "approval_threshold {} outside [{SCORE_MIN}, {SCORE_MAX}]",
                self.approval_threshold
            )));
        }
        if self.max_iterations == 0 {
            return Err(InvalidConfig("max_iterations must be at least 1".to_string()));
        }
        if self.call_timeout.is_zero() {
            return Err(InvalidConfig("call_timeout must be positive".to_string()));
        }
        Ok(())
    }

    /// round 为刚完成评分的轮次（从 1 开始）
    pub fn decide(&self, score: f64, round: usize) -> Decision {
        if score >= self.approval_threshold {
            Decision::Approve
        } else if round >= self.max_iterations {
            Decision::Exhaust
        } else {
            Decision::Revise
        }
    }
}

/// 历史最高分草稿
#[derive(Debug, Clone, PartialEq)]
pub struct BestDraft {
    pub iteration: usize,
    pub score: f64,
    pub document: Document,
}

impl BestDraft {
    /// 仅当分数严格更高时替换
    pub fn offer(slot: &mut Option<BestDraft>, iteration: usize, score: f64, document: &Document) {
        if slot.as_ref().map_or(true, |best| score > best.score) {
            *slot = Some(BestDraft {
                iteration,
                score,
                document: document.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide_follows_threshold_then_budget() {
        let cfg = RefinementConfig::default();
        assert_eq!(cfg.decide(8.0, 1), Decision::Approve);
        assert_eq!(cfg.decide(9.5, 3), Decision::Approve);
        assert_eq!(cfg.decide(7.9, 1), Decision::Revise);
        assert_eq!(cfg.decide(7.9, 2), Decision::Revise);
        assert_eq!(cfg.decide(7.9, 3), Decision::Exhaust);
    }

    #[test]
    fn test_budget_of_one_never_revises() {
        let cfg = RefinementConfig {
            max_iterations: 1,
            ..RefinementConfig::default()
        };
        assert_eq!(cfg.decide(2.0, 1), Decision::Exhaust);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let ok = RefinementConfig::default();
        assert!(ok.validate().is_ok());

        let zero_budget = RefinementConfig {
            max_iterations: 0,
            ..ok.clone()
        };
        assert!(zero_budget.validate().is_err());

        let bad_threshold = RefinementConfig {
            approval_threshold: 11.0,
            ..ok.clone()
        };
        assert!(bad_threshold.validate().is_err());

        let no_timeout = RefinementConfig {
            call_timeout: Duration::ZERO,
            ..ok
        };
        assert!(no_timeout.validate().is_err());
    }

    #[test]
    fn test_best_draft_prefers_earliest_on_tie() {
        let mut best = None;
        let held = |best: &Option<BestDraft>| best.as_ref().map(|b| b.iteration);

        BestDraft::offer(&mut best, 1, 6.0, &Document::new("a"));
        assert_eq!(held(&best), Some(1));
        BestDraft::offer(&mut best, 2, 6.0, &Document::new("b"));
        assert_eq!(held(&best), Some(1));
        BestDraft::offer(&mut best, 3, 6.5, &Document::new("c"));
        assert_eq!(held(&best), Some(3));
        BestDraft::offer(&mut best, 4, 5.0, &Document::new("d"));
        assert_eq!(held(&best), Some(3));

        let best = best.unwrap();
        assert_eq!(best.score, 6.5);
        assert_eq!(best.document.text(), "c");
    }
}
