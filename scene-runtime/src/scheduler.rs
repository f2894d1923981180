//! # Scheduler 模块
//!
//! 场景切换调度器：持有阶段序列与切换状态，由外部 tick 驱动。
//!
//! ## 执行模型
//!
//! ```text
//! begin_transition(next)   // 只做校验和状态记录，不触发钩子
//! loop {
//!     match scheduler.tick() {
//!         WaitingOn::Idle => break,
//!         _ => 等待下一帧,
//!     }
//! }
//! ```
//!
//! 每次 `tick` 连续推进状态机，直到遇到挂起点（阻塞操作未清空、加载未达到阈值、
//! 激活或卸载未完成）或回到空闲。
//!
//! ## 切换流程
//!
//! ```text
//! BeforeTransition → 等待
//! BeforeLoad → [冻结时间] → 等待(上报进度) → 开始加载 → 等待达到激活阈值(上报加载进度)
//! BeforeActivate → 等待(上报进度) → 激活 → 等待激活完成 → 设为活动场景
//! BeforeUnload → 等待 → 卸载旧场景 → 等待卸载完成
//! AfterUnload → 等待
//! BeforeSceneReady → 等待
//! [is_scene_ready = true] SceneReady → 等待 → [恢复时间]
//! Complete → [is_loading = false]（不等待）
//! ```
//!
//! 没有取消机制：切换一旦开始必须运行到 `Complete`。
//! 永远达不到进度 1 的阻塞操作会让切换无限期停在所在阶段。

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, error, info, trace, warn};

use crate::barrier::{DrainPoll, OperationBarrier};
use crate::config::SchedulerConfig;
use crate::error::{TransitionError, TransitionResult};
use crate::hooks::{HookEvent, HookRegistry};
use crate::phase::Phase;
use crate::provider::SceneLoadProvider;
use crate::request::TransitionRequests;
use crate::scene::SceneId;
use crate::state::{TransitionState, TransitionStatus, WaitingOn};

/// 状态机步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// 没有进行中的切换
    Idle,
    /// 触发阶段钩子
    Fire(Phase),
    /// 等待阶段内注册的阻塞操作清空
    Drain(Phase),
    /// 等待加载器达到激活阈值
    Load,
    /// 等待激活完成
    Activate,
    /// 等待卸载完成
    Unload,
}

impl Step {
    /// 只有空闲状态可以开始新的切换
    fn accepts_begin(self) -> bool {
        matches!(self, Step::Idle)
    }
}

/// 单步推进结果
enum Flow {
    Next(Step),
    Suspend(WaitingOn),
    Idle,
}

/// 切换开始的结果
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionStarted {
    pub from: SceneId,
    pub to: SceneId,
    /// 开始时被清除的过期阻塞操作数
    pub stale_cleared: usize,
}

/// 场景切换调度器
pub struct TransitionScheduler<P: SceneLoadProvider> {
    provider: P,
    barrier: OperationBarrier,
    hooks: HookRegistry,
    config: SchedulerConfig,
    state: Rc<RefCell<TransitionState>>,
    requests: TransitionRequests,
    step: Step,
    /// 最近一次触发的阶段
    last_phase: Option<Phase>,
}

impl<P: SceneLoadProvider> TransitionScheduler<P> {
    /// 创建调度器
    ///
    /// 屏障与钩子注册表由调用方构造并注入，协作者持有它们的克隆。
    pub fn new(
        provider: P,
        barrier: OperationBarrier,
        hooks: HookRegistry,
        config: SchedulerConfig,
    ) -> Self {
        let state = Rc::new(RefCell::new(TransitionState::new()));
        let requests = TransitionRequests::new(state.clone());
        Self {
            provider,
            barrier,
            hooks,
            config,
            state,
            requests,
            step: Step::Idle,
            last_phase: None,
        }
    }

    // ========== 入口 ==========

    /// 激活首个场景
    ///
    /// 没有可切换的旧场景，跳过加载/激活/卸载，直接从 `BeforeSceneReady` 开始。
    pub fn start(&mut self, scene: impl Into<SceneId>) -> TransitionResult<()> {
        let scene = scene.into();
        self.ensure_idle(&scene)?;

        if let Some(active) = self.state.borrow().active.clone() {
            warn!(active = %active, requested = %scene, "[STM] 首个场景已激活");
            return Err(TransitionError::AlreadyStarted { active });
        }

        self.clear_stale_operations();
        {
            let mut state = self.state.borrow_mut();
            state.current = Some(scene.clone());
            state.next = Some(scene.clone());
            state.active = Some(scene.clone());
            state.is_loading = true;
            state.is_scene_ready = false;
        }
        self.set_time_frozen(true);
        self.requests.set_accepting(false);
        self.step = Step::Fire(Phase::BeforeSceneReady);
        info!(scene = %scene, "[STM] 激活首个场景");
        Ok(())
    }

    /// 开始从当前活动场景切换到 `next`
    ///
    /// 切换进行中调用返回 `Busy`，状态不变、不触发任何钩子。
    /// 上一轮遗留的阻塞操作视为过期，清除并告警。
    pub fn begin_transition(
        &mut self,
        next: impl Into<SceneId>,
    ) -> TransitionResult<TransitionStarted> {
        let next = next.into();
        self.ensure_idle(&next)?;

        let Some(current) = self.state.borrow().active.clone() else {
            warn!(requested = %next, "[STM] 尚未激活任何场景，无法切换");
            return Err(TransitionError::NotStarted { requested: next });
        };

        if let Some(pending) = self.requests.take() {
            warn!(pending = %pending, requested = %next, "[STM] 丢弃待处理的切换请求");
        }

        let stale_cleared = self.clear_stale_operations();
        {
            let mut state = self.state.borrow_mut();
            state.current = Some(current.clone());
            state.next = Some(next.clone());
            state.is_loading = true;
            state.is_scene_ready = false;
        }
        self.requests.set_accepting(false);
        self.step = Step::Fire(Phase::BeforeTransition);
        info!(from = %current, to = %next, "[STM] 开始切换场景");

        Ok(TransitionStarted {
            from: current,
            to: next,
            stale_cleared,
        })
    }

    fn ensure_idle(&self, requested: &SceneId) -> TransitionResult<()> {
        if self.step.accepts_begin() {
            return Ok(());
        }
        let current = {
            let state = self.state.borrow();
            state
                .current
                .clone()
                .or_else(|| state.active.clone())
                .unwrap_or_else(|| requested.clone())
        };
        error!(
            current = %current,
            requested = %requested,
            "[STM] Can't change scenes right now because we're already changing scenes!"
        );
        Err(TransitionError::Busy {
            current,
            requested: requested.clone(),
        })
    }

    fn clear_stale_operations(&mut self) -> usize {
        if self.barrier.is_empty() {
            return 0;
        }
        let count = self.barrier.clear();
        warn!(count, "[STM] Cleared {count} invalid blocking operations");
        count
    }

    // ========== 驱动 ==========

    /// 推进状态机直到下一个挂起点
    ///
    /// 回到空闲时若有待处理的切换请求，立即开始该切换并继续推进。
    pub fn tick(&mut self) -> WaitingOn {
        loop {
            match self.advance() {
                Flow::Next(step) => self.step = step,
                Flow::Suspend(waiting) => return waiting,
                Flow::Idle => {
                    if !self.apply_request() {
                        return WaitingOn::Idle;
                    }
                }
            }
        }
    }

    fn apply_request(&mut self) -> bool {
        let Some(next) = self.requests.take() else {
            return false;
        };
        match self.begin_transition(next) {
            Ok(_) => true,
            Err(e) => {
                error!(error = %e, "[STM] 切换请求无法执行");
                false
            }
        }
    }

    fn advance(&mut self) -> Flow {
        match self.step {
            Step::Idle => Flow::Idle,
            Step::Fire(phase) => Flow::Next(self.fire(phase)),
            Step::Drain(phase) => self.drain(phase),
            Step::Load => self.poll_load(),
            Step::Activate => self.poll_activation(),
            Step::Unload => self.poll_unload(),
        }
    }

    fn fire(&mut self, phase: Phase) -> Step {
        let (from, to) = {
            let state = self.state.borrow();
            // start/begin_transition 总会同时设置两者
            match (state.current.clone(), state.next.clone()) {
                (Some(from), Some(to)) => (from, to),
                _ => {
                    error!(phase = %phase, "[STM] 切换状态缺失，回到空闲");
                    self.requests.set_accepting(true);
                    return Step::Idle;
                }
            }
        };

        match phase {
            Phase::SceneReady => self.state.borrow_mut().is_scene_ready = true,
            // Complete 钩子中可以请求下一次切换
            Phase::Complete => self.requests.set_accepting(true),
            _ => {}
        }

        self.last_phase = Some(phase);
        info!(phase = %phase, active = %self.active_label(), "[STM] {phase}");
        let event = HookEvent::for_phase(phase, &from, &to);
        self.hooks.emit(&event, &self.barrier);

        match phase {
            Phase::BeforeLoad => self.set_time_frozen(true),
            Phase::Complete => {
                // Complete 钩子中注册的操作不等待
                self.state.borrow_mut().is_loading = false;
                return Step::Idle;
            }
            _ => {}
        }

        debug_assert!(phase.waits_for_operations());
        self.barrier.begin_wait_cycle();
        Step::Drain(phase)
    }

    fn drain(&mut self, phase: Phase) -> Flow {
        let poll = self.barrier.poll();
        if phase.reports_progress()
            && let Some(progress) = poll.progress()
        {
            self.hooks
                .emit(&HookEvent::LoadProgress { progress }, &self.barrier);
        }

        match poll {
            DrainPoll::Pending { progress } => {
                trace!(phase = %phase, progress, remaining = self.barrier.len(), "[STM] 等待阻塞操作");
                Flow::Suspend(WaitingOn::Operations { phase, progress })
            }
            DrainPoll::Drained { .. } => Flow::Next(self.after_drain(phase)),
        }
    }

    fn after_drain(&mut self, phase: Phase) -> Step {
        match phase {
            Phase::BeforeLoad => {
                let next = self.state.borrow().next.clone();
                if let Some(next) = next {
                    info!(scene = %next, active = %self.active_label(), "[STM] Loading next scene...");
                    self.provider.begin_load(&next);
                }
                Step::Load
            }
            Phase::BeforeActivate => {
                info!(active = %self.active_label(), "[STM] Activating new scene...");
                self.provider.activate();
                Step::Activate
            }
            Phase::BeforeUnload => {
                let current = self.state.borrow().current.clone();
                if let Some(current) = current {
                    info!(scene = %current, active = %self.active_label(), "[STM] Unloading previous...");
                    self.provider.begin_unload(&current);
                }
                Step::Unload
            }
            Phase::SceneReady => {
                self.set_time_frozen(false);
                Step::Fire(Phase::Complete)
            }
            other => other.next().map_or(Step::Idle, Step::Fire),
        }
    }

    fn poll_load(&mut self) -> Flow {
        let progress = self.provider.load_progress();
        if progress < self.config.activation_threshold {
            debug!(progress, "[STM] 加载进度");
            self.hooks
                .emit(&HookEvent::LoadProgress { progress }, &self.barrier);
            return Flow::Suspend(WaitingOn::SceneLoad { progress });
        }
        Flow::Next(Step::Fire(Phase::BeforeActivate))
    }

    fn poll_activation(&mut self) -> Flow {
        if !self.provider.poll_activation() {
            return Flow::Suspend(WaitingOn::Activation);
        }
        {
            let mut state = self.state.borrow_mut();
            state.active = state.next.clone();
        }
        info!(active = %self.active_label(), "[STM] 新场景已激活");
        Flow::Next(Step::Fire(Phase::BeforeUnload))
    }

    fn poll_unload(&mut self) -> Flow {
        if !self.provider.poll_unload() {
            return Flow::Suspend(WaitingOn::Unload);
        }
        Flow::Next(Step::Fire(Phase::AfterUnload))
    }

    fn set_time_frozen(&mut self, frozen: bool) {
        if self.config.control_time_scale {
            self.state.borrow_mut().time_frozen = frozen;
        }
    }

    fn active_label(&self) -> String {
        self.state
            .borrow()
            .active
            .as_ref()
            .map_or_else(|| "-".to_string(), SceneId::to_string)
    }

    // ========== 查询 ==========

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn is_scene_ready(&self) -> bool {
        self.state.borrow().is_scene_ready
    }

    pub fn is_time_frozen(&self) -> bool {
        self.state.borrow().time_frozen
    }

    pub fn active_scene(&self) -> Option<SceneId> {
        self.state.borrow().active.clone()
    }

    /// 是否可以开始新的切换
    pub fn is_idle(&self) -> bool {
        self.step.accepts_begin()
    }

    /// 最近一次触发的阶段
    pub fn last_phase(&self) -> Option<Phase> {
        self.last_phase
    }

    /// 状态快照
    pub fn state(&self) -> TransitionState {
        self.state.borrow().clone()
    }

    /// 只读状态视图，可交给协作者保存
    pub fn status(&self) -> TransitionStatus {
        TransitionStatus::new(self.state.clone())
    }

    /// 切换请求句柄，可交给钩子订阅者保存
    pub fn requests(&self) -> TransitionRequests {
        self.requests.clone()
    }

    pub fn barrier(&self) -> &OperationBarrier {
        &self.barrier
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }
}
