//! # Host 模块
//!
//! 组装调度器、模拟加载器与协作者，并以固定帧节奏驱动它们。
//!
//! ## 每帧顺序
//!
//! 1. `FrameClock::advance`：根据冻结状态计算本帧时间
//! 2. `LoadingScreen::update`：推进遮罩与收尾操作
//! 3. `TransitionScheduler::tick`：推进切换状态机

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use scene_runtime::{
    HookRegistry, HookSlot, OperationBarrier, Phase, SceneId, SimulatedLoader, TransitionError,
    TransitionScheduler, TransitionStatus, WaitingOn,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::clock::FrameClock;
use crate::completion::CompletionTrigger;
use crate::config::AppConfig;
use crate::loading_screen::LoadingScreen;

/// Host 运行错误
#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("超过帧数上限 {frames}，切换未能完成")]
    FrameBudgetExceeded { frames: u64 },
}

/// 一次运行的统计
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// 驱动的总帧数
    pub frames: u64,
    /// 依次激活的场景（含首个场景）
    pub visited: Vec<SceneId>,
    /// 触发过的阶段
    pub phases_fired: Vec<Phase>,
    /// 完成的切换次数（不含首个场景激活）
    pub transitions: usize,
}

pub struct Host {
    config: AppConfig,
    scheduler: TransitionScheduler<SimulatedLoader>,
    status: TransitionStatus,
    loading_screen: Rc<RefCell<LoadingScreen>>,
    clock: FrameClock,
    phases: Rc<RefCell<Vec<Phase>>>,
    visited: Rc<RefCell<Vec<SceneId>>>,
    _completion: CompletionTrigger,
    frames: u64,
}

impl Host {
    pub fn new(config: AppConfig) -> Self {
        let loader =
            SimulatedLoader::with_threshold(config.loader, config.scheduler.activation_threshold)
                .with_loaded(config.initial_scene_id());
        let barrier = OperationBarrier::new();
        let hooks = HookRegistry::new();

        let loading_screen = Rc::new(RefCell::new(LoadingScreen::new(&config.loading_screen)));
        hooks.subscribe_listener(&loading_screen);

        let phases = Rc::new(RefCell::new(Vec::new()));
        for slot in HookSlot::ALL {
            if slot == HookSlot::LoadProgress {
                continue;
            }
            let phases = phases.clone();
            hooks.subscribe(slot, move |event, _| {
                if let Some(phase) = event.phase() {
                    phases.borrow_mut().push(phase);
                }
            });
        }

        let visited = Rc::new(RefCell::new(Vec::new()));
        let completion = {
            let visited = visited.clone();
            CompletionTrigger::new(&hooks, move |scene| {
                info!(scene = %scene, "场景已就绪");
                visited.borrow_mut().push(scene.clone());
            })
        };

        let scheduler = TransitionScheduler::new(loader, barrier, hooks, config.scheduler);
        let status = scheduler.status();
        let clock = FrameClock::new(config.frame_seconds());

        Self {
            config,
            scheduler,
            status,
            loading_screen,
            clock,
            phases,
            visited,
            _completion: completion,
            frames: 0,
        }
    }

    /// 激活首个场景，然后依次切换到 `route` 中的每个场景
    pub fn run(&mut self, route: &[SceneId]) -> Result<RunReport, HostError> {
        if self.scheduler.active_scene().is_none() {
            let initial = self.config.initial_scene_id();
            info!(scene = %initial, "激活首个场景");
            self.scheduler.start(initial)?;
            self.run_until_settled()?;
        }

        let mut transitions = 0;
        for scene in route {
            let started = self.scheduler.begin_transition(scene.clone())?;
            info!(from = %started.from, to = %started.to, "开始切换");
            self.run_until_settled()?;
            transitions += 1;
        }

        Ok(RunReport {
            frames: self.frames,
            visited: self.visited.borrow().clone(),
            phases_fired: self.phases.borrow().clone(),
            transitions,
        })
    }

    /// 驱动帧直到调度器空闲且加载画面收尾完毕
    fn run_until_settled(&mut self) -> Result<(), HostError> {
        loop {
            let waiting = self.step();
            if waiting.is_idle() && self.loading_screen.borrow().is_settled() {
                debug!(frames = self.frames, "切换已稳定");
                return Ok(());
            }
            if self.frames >= self.config.tick.max_frames {
                return Err(HostError::FrameBudgetExceeded {
                    frames: self.config.tick.max_frames,
                });
            }
        }
    }

    /// 推进一帧
    pub fn step(&mut self) -> WaitingOn {
        let time = self.clock.advance(&self.status);
        self.frames += 1;
        self.loading_screen.borrow_mut().update(&time, &self.status);
        let waiting = self.scheduler.tick();

        if self.config.tick.realtime {
            std::thread::sleep(Duration::from_millis(self.config.tick.frame_ms));
        }
        waiting
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn scheduler(&self) -> &TransitionScheduler<SimulatedLoader> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut TransitionScheduler<SimulatedLoader> {
        &mut self.scheduler
    }

    pub fn status(&self) -> &TransitionStatus {
        &self.status
    }

    pub fn loading_screen(&self) -> Rc<RefCell<LoadingScreen>> {
        self.loading_screen.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene_runtime::LoaderTiming;

    fn fast_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.loading_screen.min_loading_time = 0.0;
        config.loading_screen.fade_duration = 0.0;
        config.loader = LoaderTiming::instant();
        config
    }

    #[test]
    fn test_initial_activation_only() {
        let mut host = Host::new(fast_config());
        let report = host.run(&[]).unwrap();
        assert_eq!(report.visited, vec![SceneId::from("title")]);
        assert_eq!(
            report.phases_fired,
            vec![Phase::BeforeSceneReady, Phase::SceneReady, Phase::Complete]
        );
        assert_eq!(report.transitions, 0);
    }

    #[test]
    fn test_frame_budget_exceeded() {
        let mut config = AppConfig::default();
        config.tick.max_frames = 3;
        let mut host = Host::new(config);
        let err = host.run(&[SceneId::from("forest")]).unwrap_err();
        assert!(matches!(err, HostError::FrameBudgetExceeded { frames: 3 }));
    }
}
