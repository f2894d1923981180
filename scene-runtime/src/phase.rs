//! # Phase 模块
//!
//! 场景切换的固定阶段序列，以及每个阶段对应的钩子槽位。
//!
//! ## 阶段顺序
//!
//! ```text
//! BeforeTransition → BeforeLoad → BeforeActivate → BeforeUnload
//!   → AfterUnload → BeforeSceneReady → SceneReady → Complete
//! ```
//!
//! 首次激活场景时从 `BeforeSceneReady` 开始，跳过加载/激活/卸载阶段。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 场景切换阶段
///
/// 顺序固定，不支持动态重排。每个阶段在一次切换中恰好触发一次对应钩子。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    BeforeTransition,
    BeforeLoad,
    BeforeActivate,
    BeforeUnload,
    AfterUnload,
    BeforeSceneReady,
    SceneReady,
    Complete,
}

impl Phase {
    /// 完整切换的阶段序列
    pub const SEQUENCE: [Phase; 8] = [
        Phase::BeforeTransition,
        Phase::BeforeLoad,
        Phase::BeforeActivate,
        Phase::BeforeUnload,
        Phase::AfterUnload,
        Phase::BeforeSceneReady,
        Phase::SceneReady,
        Phase::Complete,
    ];

    /// 首次激活的阶段序列
    pub const INITIAL_SEQUENCE: [Phase; 3] =
        [Phase::BeforeSceneReady, Phase::SceneReady, Phase::Complete];

    /// 序列中的下一个阶段，`Complete` 之后为 `None`
    pub fn next(self) -> Option<Phase> {
        let index = Self::SEQUENCE.iter().position(|p| *p == self)?;
        Self::SEQUENCE.get(index + 1).copied()
    }

    /// 该阶段的等待周期是否需要上报聚合进度
    ///
    /// 只有 `BeforeLoad` 与 `BeforeActivate` 与加载进度重叠，需要合并成同一个进度信号。
    pub fn reports_progress(self) -> bool {
        matches!(self, Phase::BeforeLoad | Phase::BeforeActivate)
    }

    /// 钩子触发后是否等待阻塞操作清空
    ///
    /// `Complete` 是唯一例外：其钩子中注册的操作被忽略。
    pub fn waits_for_operations(self) -> bool {
        self != Phase::Complete
    }

    /// 对应的钩子槽位
    pub fn slot(self) -> HookSlot {
        match self {
            Phase::BeforeTransition => HookSlot::BeforeTransition,
            Phase::BeforeLoad => HookSlot::BeforeLoad,
            Phase::BeforeActivate => HookSlot::BeforeActivate,
            Phase::BeforeUnload => HookSlot::BeforeUnload,
            Phase::AfterUnload => HookSlot::AfterUnload,
            Phase::BeforeSceneReady => HookSlot::BeforeSceneReady,
            Phase::SceneReady => HookSlot::SceneReady,
            Phase::Complete => HookSlot::Complete,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::BeforeTransition => "OnBeforeTransition",
            Phase::BeforeLoad => "OnBeforeLoad",
            Phase::BeforeActivate => "OnBeforeActivate",
            Phase::BeforeUnload => "OnBeforeUnload",
            Phase::AfterUnload => "OnAfterUnload",
            Phase::BeforeSceneReady => "OnBeforeSceneReady",
            Phase::SceneReady => "OnSceneReady",
            Phase::Complete => "OnSceneTransitionComplete",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 钩子槽位
///
/// 每个阶段一个槽位，另加一个用于转发原始加载进度的 `LoadProgress`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookSlot {
    BeforeTransition,
    BeforeLoad,
    LoadProgress,
    BeforeActivate,
    BeforeUnload,
    AfterUnload,
    BeforeSceneReady,
    SceneReady,
    Complete,
}

impl HookSlot {
    /// 全部槽位
    pub const ALL: [HookSlot; 9] = [
        HookSlot::BeforeTransition,
        HookSlot::BeforeLoad,
        HookSlot::LoadProgress,
        HookSlot::BeforeActivate,
        HookSlot::BeforeUnload,
        HookSlot::AfterUnload,
        HookSlot::BeforeSceneReady,
        HookSlot::SceneReady,
        HookSlot::Complete,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_sequence_order() {
        let mut walked = vec![Phase::BeforeTransition];
        while let Some(next) = walked.last().and_then(|p| p.next()) {
            walked.push(next);
        }
        assert_eq!(walked, Phase::SEQUENCE.to_vec());
        assert_eq!(Phase::Complete.next(), None);
    }

    #[test]
    fn test_initial_sequence_is_tail_of_full_sequence() {
        assert!(Phase::SEQUENCE.ends_with(&Phase::INITIAL_SEQUENCE));
    }

    #[test]
    fn test_progress_reporting_phases() {
        let reporting: Vec<Phase> = Phase::SEQUENCE
            .into_iter()
            .filter(|p| p.reports_progress())
            .collect();
        assert_eq!(reporting, vec![Phase::BeforeLoad, Phase::BeforeActivate]);
    }

    #[test]
    fn test_only_complete_skips_wait() {
        for phase in Phase::SEQUENCE {
            assert_eq!(phase.waits_for_operations(), phase != Phase::Complete);
        }
    }

    #[test]
    fn test_slot_indices_are_distinct() {
        for (i, slot) in HookSlot::ALL.iter().enumerate() {
            assert_eq!(slot.index(), i);
        }
    }
}
