//! # State 模块
//!
//! 切换状态与等待模型。
//!
//! ## 设计原则
//!
//! - `TransitionState` 由调度器独占修改，只在调度器自己的 tick 上变更
//! - 协作者通过 [`TransitionStatus`] 读取，不能写入
//! - 不允许隐式全局状态

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

use crate::phase::Phase;
use crate::scene::SceneId;

/// 切换状态
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionState {
    /// 切换开始前的活动场景
    pub current: Option<SceneId>,
    /// 切换目标场景
    pub next: Option<SceneId>,
    /// 当前活动场景（激活步骤完成后才指向目标场景）
    pub active: Option<SceneId>,
    /// 从切换开始到 `Complete` 为 true
    pub is_loading: bool,
    /// `SceneReady` 钩子触发前置为 true，下次切换开始时重置
    pub is_scene_ready: bool,
    /// 全局时间冻结标志（`SchedulerConfig::control_time_scale` 开启时使用）
    pub time_frozen: bool,
}

impl TransitionState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// 调度器挂起原因
///
/// `tick` 的返回值。Host 据此决定是否展示进度等，调度器本身不关心。
///
/// ```text
/// Idle        -> 没有进行中的切换
/// Operations  -> 等待阻塞操作清空
/// SceneLoad   -> 等待加载器达到可激活阈值
/// Activation  -> 等待加载器完成激活
/// Unload      -> 等待加载器完成卸载
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WaitingOn {
    Idle,
    Operations { phase: Phase, progress: f32 },
    SceneLoad { progress: f32 },
    Activation,
    Unload,
}

impl WaitingOn {
    pub fn is_idle(&self) -> bool {
        matches!(self, WaitingOn::Idle)
    }
}

/// 切换状态的只读视图
///
/// 克隆后共享同一份状态，适合交给钩子订阅者保存。
#[derive(Debug, Clone, Default)]
pub struct TransitionStatus {
    inner: Rc<RefCell<TransitionState>>,
}

impl TransitionStatus {
    pub(crate) fn new(inner: Rc<RefCell<TransitionState>>) -> Self {
        Self { inner }
    }

    pub fn is_loading(&self) -> bool {
        self.inner.borrow().is_loading
    }

    pub fn is_scene_ready(&self) -> bool {
        self.inner.borrow().is_scene_ready
    }

    pub fn is_time_frozen(&self) -> bool {
        self.inner.borrow().time_frozen
    }

    pub fn active_scene(&self) -> Option<SceneId> {
        self.inner.borrow().active.clone()
    }

    pub fn current_scene(&self) -> Option<SceneId> {
        self.inner.borrow().current.clone()
    }

    pub fn next_scene(&self) -> Option<SceneId> {
        self.inner.borrow().next.clone()
    }

    /// 当前状态的快照
    pub fn snapshot(&self) -> TransitionState {
        self.inner.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reflects_shared_state() {
        let shared = Rc::new(RefCell::new(TransitionState::new()));
        let status = TransitionStatus::new(shared.clone());
        assert!(!status.is_loading());
        assert_eq!(status.active_scene(), None);

        {
            let mut state = shared.borrow_mut();
            state.is_loading = true;
            state.active = Some(SceneId::from("title"));
        }

        let view = status.clone();
        assert!(view.is_loading());
        assert_eq!(view.active_scene(), Some(SceneId::from("title")));
    }

    #[test]
    fn test_snapshot_does_not_hold_borrow() {
        let shared = Rc::new(RefCell::new(TransitionState::new()));
        let status = TransitionStatus::new(shared.clone());

        let before = status.snapshot();
        // 快照期间调度器仍可写入
        shared.borrow_mut().is_loading = true;

        assert!(!before.is_loading);
        assert!(status.snapshot().is_loading);
    }

    #[test]
    fn test_state_serialization() {
        let state = TransitionState {
            current: Some(SceneId::from("a")),
            next: Some(SceneId::from("b")),
            active: Some(SceneId::from("a")),
            is_loading: true,
            is_scene_ready: false,
            time_frozen: true,
        };
        let json = serde_json::to_string(&state).unwrap();
        let back: TransitionState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, back);
    }

    #[test]
    fn test_waiting_on() {
        assert!(WaitingOn::Idle.is_idle());
        assert!(!WaitingOn::Activation.is_idle());
        assert!(
            !WaitingOn::Operations {
                phase: Phase::BeforeLoad,
                progress: 0.5
            }
            .is_idle()
        );
    }
}
