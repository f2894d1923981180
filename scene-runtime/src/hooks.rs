//! # Hooks 模块
//!
//! 阶段钩子注册表：每个阶段一个多订阅者槽位，另有一个加载进度槽位。
//!
//! ## 订阅方式
//!
//! - 闭包：`registry.subscribe(HookSlot::BeforeLoad, |event, barrier| { ... })`
//! - 监听器：实现 [`TransitionListener`]，`registry.subscribe_listener(&listener)`
//!
//! 同一槽位内按注册顺序同步调用。钩子在调度器自己的 tick 上执行，不能无限期阻塞；
//! 需要长时间的工作应在屏障上注册一个阻塞操作，稍后再推进其进度。

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::warn;

use crate::barrier::OperationBarrier;
use crate::phase::{HookSlot, Phase};
use crate::scene::SceneId;

/// 钩子事件
#[derive(Debug, Clone, PartialEq)]
pub enum HookEvent {
    BeforeTransition { from: SceneId, to: SceneId },
    BeforeLoad { to: SceneId },
    /// 加载进度，取值约定在 [0, 1]
    LoadProgress { progress: f32 },
    BeforeActivate { to: SceneId },
    BeforeUnload { from: SceneId },
    AfterUnload { from: SceneId },
    BeforeSceneReady { to: SceneId },
    SceneReady { to: SceneId },
    Complete { to: SceneId },
}

impl HookEvent {
    /// 为阶段构造事件
    ///
    /// 参数按阶段取用：`BeforeTransition` 使用 `(from, to)`，
    /// 加载/激活/就绪阶段使用 `to`，卸载阶段使用 `from`。
    pub fn for_phase(phase: Phase, from: &SceneId, to: &SceneId) -> Self {
        match phase {
            Phase::BeforeTransition => HookEvent::BeforeTransition {
                from: from.clone(),
                to: to.clone(),
            },
            Phase::BeforeLoad => HookEvent::BeforeLoad { to: to.clone() },
            Phase::BeforeActivate => HookEvent::BeforeActivate { to: to.clone() },
            Phase::BeforeUnload => HookEvent::BeforeUnload { from: from.clone() },
            Phase::AfterUnload => HookEvent::AfterUnload { from: from.clone() },
            Phase::BeforeSceneReady => HookEvent::BeforeSceneReady { to: to.clone() },
            Phase::SceneReady => HookEvent::SceneReady { to: to.clone() },
            Phase::Complete => HookEvent::Complete { to: to.clone() },
        }
    }

    pub fn slot(&self) -> HookSlot {
        match self {
            HookEvent::BeforeTransition { .. } => HookSlot::BeforeTransition,
            HookEvent::BeforeLoad { .. } => HookSlot::BeforeLoad,
            HookEvent::LoadProgress { .. } => HookSlot::LoadProgress,
            HookEvent::BeforeActivate { .. } => HookSlot::BeforeActivate,
            HookEvent::BeforeUnload { .. } => HookSlot::BeforeUnload,
            HookEvent::AfterUnload { .. } => HookSlot::AfterUnload,
            HookEvent::BeforeSceneReady { .. } => HookSlot::BeforeSceneReady,
            HookEvent::SceneReady { .. } => HookSlot::SceneReady,
            HookEvent::Complete { .. } => HookSlot::Complete,
        }
    }

    /// 对应的阶段，`LoadProgress` 没有阶段
    pub fn phase(&self) -> Option<Phase> {
        match self {
            HookEvent::BeforeTransition { .. } => Some(Phase::BeforeTransition),
            HookEvent::BeforeLoad { .. } => Some(Phase::BeforeLoad),
            HookEvent::LoadProgress { .. } => None,
            HookEvent::BeforeActivate { .. } => Some(Phase::BeforeActivate),
            HookEvent::BeforeUnload { .. } => Some(Phase::BeforeUnload),
            HookEvent::AfterUnload { .. } => Some(Phase::AfterUnload),
            HookEvent::BeforeSceneReady { .. } => Some(Phase::BeforeSceneReady),
            HookEvent::SceneReady { .. } => Some(Phase::SceneReady),
            HookEvent::Complete { .. } => Some(Phase::Complete),
        }
    }
}

/// 切换监听器
///
/// 所有方法默认空实现，只需覆盖关心的钩子。
pub trait TransitionListener {
    fn on_before_transition(&mut self, _from: &SceneId, _to: &SceneId, _barrier: &OperationBarrier) {}
    fn on_before_load(&mut self, _to: &SceneId, _barrier: &OperationBarrier) {}
    fn on_load_progress(&mut self, _progress: f32) {}
    fn on_before_activate(&mut self, _to: &SceneId, _barrier: &OperationBarrier) {}
    fn on_before_unload(&mut self, _from: &SceneId, _barrier: &OperationBarrier) {}
    fn on_after_unload(&mut self, _from: &SceneId, _barrier: &OperationBarrier) {}
    fn on_before_scene_ready(&mut self, _to: &SceneId, _barrier: &OperationBarrier) {}
    fn on_scene_ready(&mut self, _to: &SceneId, _barrier: &OperationBarrier) {}
    /// 此回调中注册的阻塞操作不会被等待
    fn on_transition_complete(&mut self, _to: &SceneId, _barrier: &OperationBarrier) {}
}

fn dispatch(listener: &mut dyn TransitionListener, event: &HookEvent, barrier: &OperationBarrier) {
    match event {
        HookEvent::BeforeTransition { from, to } => listener.on_before_transition(from, to, barrier),
        HookEvent::BeforeLoad { to } => listener.on_before_load(to, barrier),
        HookEvent::LoadProgress { progress } => listener.on_load_progress(*progress),
        HookEvent::BeforeActivate { to } => listener.on_before_activate(to, barrier),
        HookEvent::BeforeUnload { from } => listener.on_before_unload(from, barrier),
        HookEvent::AfterUnload { from } => listener.on_after_unload(from, barrier),
        HookEvent::BeforeSceneReady { to } => listener.on_before_scene_ready(to, barrier),
        HookEvent::SceneReady { to } => listener.on_scene_ready(to, barrier),
        HookEvent::Complete { to } => listener.on_transition_complete(to, barrier),
    }
}

/// 订阅 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

type HookFn = dyn FnMut(&HookEvent, &OperationBarrier);

struct Subscriber {
    id: SubscriptionId,
    callback: Rc<RefCell<HookFn>>,
}

/// 已注册的监听器（用于重复订阅去重）
struct ListenerEntry {
    id: SubscriptionId,
    /// 监听器地址
    addr: *const (),
    alive: Box<dyn Fn() -> bool>,
}

struct RegistryState {
    slots: [Vec<Subscriber>; HookSlot::ALL.len()],
    listeners: Vec<ListenerEntry>,
    next_id: u64,
}

impl Default for RegistryState {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| Vec::new()),
            listeners: Vec::new(),
            next_id: 0,
        }
    }
}

impl RegistryState {
    fn next_id(&mut self) -> SubscriptionId {
        self.next_id += 1;
        SubscriptionId(self.next_id)
    }

    fn remove(&mut self, id: SubscriptionId) -> bool {
        let mut removed = false;
        for slot in &mut self.slots {
            let before = slot.len();
            slot.retain(|s| s.id != id);
            removed |= slot.len() != before;
        }
        self.listeners.retain(|l| l.id != id);
        removed
    }

    fn prune_dead_listeners(&mut self) {
        let dead: Vec<SubscriptionId> = self
            .listeners
            .iter()
            .filter(|l| !(l.alive)())
            .map(|l| l.id)
            .collect();
        for id in dead {
            self.remove(id);
        }
    }
}

/// 钩子注册表
///
/// 单线程共享句柄，克隆后指向同一组订阅。订阅与取消订阅可以在任何时候调用，
/// 包括钩子执行期间；正在进行的一次分发使用分发开始时的订阅者快照。
#[derive(Clone, Default)]
pub struct HookRegistry {
    inner: Rc<RefCell<RegistryState>>,
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        let counts: Vec<usize> = state.slots.iter().map(Vec::len).collect();
        f.debug_struct("HookRegistry")
            .field("subscribers", &counts)
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 订阅单个槽位
    pub fn subscribe<F>(&self, slot: HookSlot, hook: F) -> SubscriptionId
    where
        F: FnMut(&HookEvent, &OperationBarrier) + 'static,
    {
        let mut state = self.inner.borrow_mut();
        let id = state.next_id();
        let callback: Rc<RefCell<HookFn>> = Rc::new(RefCell::new(hook));
        state.slots[slot.index()].push(Subscriber { id, callback });
        id
    }

    /// 订阅监听器的全部钩子
    ///
    /// 注册表只持有弱引用：监听器被丢弃后不再被调用。
    /// 同一个监听器重复订阅返回已有的订阅 ID。
    pub fn subscribe_listener<L>(&self, listener: &Rc<RefCell<L>>) -> SubscriptionId
    where
        L: TransitionListener + 'static,
    {
        let addr = Rc::as_ptr(listener) as *const ();
        let mut state = self.inner.borrow_mut();
        state.prune_dead_listeners();

        if let Some(existing) = state.listeners.iter().find(|l| l.addr == addr) {
            return existing.id;
        }

        let id = state.next_id();
        let weak: Weak<RefCell<L>> = Rc::downgrade(listener);
        for slot in HookSlot::ALL {
            let weak = weak.clone();
            let callback: Rc<RefCell<HookFn>> =
                Rc::new(RefCell::new(move |event: &HookEvent, barrier: &OperationBarrier| {
                    let Some(listener) = weak.upgrade() else {
                        return;
                    };
                    match listener.try_borrow_mut() {
                        Ok(mut listener) => dispatch(&mut *listener, event, barrier),
                        Err(_) => warn!(slot = ?event.slot(), "监听器正被借用，跳过本次钩子"),
                    };
                }));
            state.slots[slot.index()].push(Subscriber { id, callback });
        }

        let alive_ref = weak.clone();
        state.listeners.push(ListenerEntry {
            id,
            addr,
            alive: Box::new(move || alive_ref.strong_count() > 0),
        });
        id
    }

    /// 取消订阅
    ///
    /// 重复取消是无操作，返回 `false`。
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.borrow_mut().remove(id)
    }

    /// 槽位上的订阅者数量
    pub fn subscriber_count(&self, slot: HookSlot) -> usize {
        self.inner.borrow().slots[slot.index()].len()
    }

    /// 同步分发事件
    ///
    /// 按注册顺序依次调用事件所属槽位的订阅者。
    pub fn emit(&self, event: &HookEvent, barrier: &OperationBarrier) {
        let snapshot: Vec<Rc<RefCell<HookFn>>> = self.inner.borrow().slots[event.slot().index()]
            .iter()
            .map(|s| s.callback.clone())
            .collect();

        for callback in snapshot {
            match callback.try_borrow_mut() {
                Ok(mut hook) => (&mut *hook)(event, barrier),
                // 钩子内部再次触发同一钩子
                Err(_) => warn!(slot = ?event.slot(), "钩子重入，跳过"),
            }
        }
    }
}
