//! # Request 模块
//!
//! 切换请求句柄。
//!
//! 钩子运行时调度器处于 `tick` 的可变借用中，订阅者无法直接调用
//! `begin_transition`。订阅者通过 [`TransitionRequests`] 登记下一次切换，
//! 调度器回到空闲时在同一次 `tick` 中开始该切换。
//!
//! 只有空闲状态和 `Complete` 钩子期间接受请求，其余阶段返回 `Busy`，
//! 与直接调用 `begin_transition` 的结果一致。

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{info, warn};

use crate::error::{TransitionError, TransitionResult};
use crate::scene::SceneId;
use crate::state::TransitionState;

#[derive(Debug, Default)]
struct RequestState {
    pending: Option<SceneId>,
    /// 调度器当前是否接受新的切换
    accepting: bool,
}

/// 切换请求句柄
///
/// 克隆后共享同一份请求，可交给钩子订阅者保存。
#[derive(Debug, Clone)]
pub struct TransitionRequests {
    inner: Rc<RefCell<RequestState>>,
    state: Rc<RefCell<TransitionState>>,
}

impl TransitionRequests {
    pub(crate) fn new(state: Rc<RefCell<TransitionState>>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(RequestState {
                pending: None,
                accepting: true,
            })),
            state,
        }
    }

    /// 请求切换到 `next`
    ///
    /// 切换进行中（`Complete` 钩子除外）或已有待处理请求时返回 `Busy`；
    /// 尚未激活任何场景时返回 `NotStarted`。
    pub fn request(&self, next: impl Into<SceneId>) -> TransitionResult<()> {
        let next = next.into();
        let mut inner = self.inner.borrow_mut();

        if let Some(pending) = &inner.pending {
            warn!(pending = %pending, requested = %next, "[STM] 已有待处理的切换请求");
            return Err(TransitionError::Busy {
                current: pending.clone(),
                requested: next,
            });
        }

        let state = self.state.borrow();
        let Some(active) = state.active.clone() else {
            warn!(requested = %next, "[STM] 尚未激活任何场景，无法切换");
            return Err(TransitionError::NotStarted { requested: next });
        };

        if !inner.accepting {
            let current = state.current.clone().unwrap_or(active);
            warn!(current = %current, requested = %next, "[STM] 切换进行中，拒绝切换请求");
            return Err(TransitionError::Busy {
                current,
                requested: next,
            });
        }

        info!(requested = %next, "[STM] 登记切换请求");
        inner.pending = Some(next);
        Ok(())
    }

    /// 待处理的请求
    pub fn pending(&self) -> Option<SceneId> {
        self.inner.borrow().pending.clone()
    }

    /// 撤回待处理的请求
    pub fn cancel(&self) -> Option<SceneId> {
        self.inner.borrow_mut().pending.take()
    }

    pub(crate) fn take(&self) -> Option<SceneId> {
        self.inner.borrow_mut().pending.take()
    }

    pub(crate) fn set_accepting(&self, accepting: bool) {
        self.inner.borrow_mut().accepting = accepting;
    }
}
