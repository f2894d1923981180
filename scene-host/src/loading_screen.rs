//! # LoadingScreen 模块
//!
//! 加载画面：作为钩子订阅者让切换等待遮罩淡入，并在切换完成后自行收尾。
//!
//! ## 流程
//!
//! ```text
//! OnBeforeTransition   注册操作 → 遮罩淡入 → 记录加载开始时间 → 完成操作
//! OnLoadProgress       记录进度
//! OnSceneTransitionComplete
//!                      注册收尾操作（调度器不会等待它）
//!                      → 满足最短停留时间 → 等待时间恢复 → 遮罩淡出 → 释放操作
//! ```
//!
//! 所有计时使用未缩放时间：`BeforeLoad` 到 `SceneReady` 之间全局时间处于冻结状态。

use scene_runtime::{OperationBarrier, OperationHandle, SceneId, TransitionListener, TransitionStatus};
use tracing::{debug, info, warn};

use crate::clock::FrameTime;
use crate::config::LoadingScreenConfig;
use crate::fader::Fader;

/// 收尾阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapUpStage {
    /// 等待最短停留时间
    MinLoadingTime,
    /// 等待全局时间恢复，否则遮罩会在冻结期间消失
    TimeResume,
    /// 遮罩淡出中
    FadingOut,
}

#[derive(Debug)]
struct WrapUp {
    operation: OperationHandle,
    stage: WrapUpStage,
}

#[derive(Debug)]
pub struct LoadingScreen {
    fader: Fader,
    min_loading_time: f32,
    /// 淡入期间阻塞切换的操作
    fade_in: Option<OperationHandle>,
    wrap_up: Option<WrapUp>,
    /// 淡入完成时的未缩放时间
    load_started_at: Option<f32>,
    /// 最近一次收到的加载进度
    last_progress: Option<f32>,
    /// 最近一帧的未缩放时间
    now: f32,
}

impl LoadingScreen {
    pub fn new(config: &LoadingScreenConfig) -> Self {
        Self {
            fader: Fader::new(config.fade_duration),
            min_loading_time: config.min_loading_time,
            fade_in: None,
            wrap_up: None,
            load_started_at: None,
            last_progress: None,
            now: 0.0,
        }
    }

    /// 每帧更新
    pub fn update(&mut self, time: &FrameTime, status: &TransitionStatus) {
        self.now = time.unscaled_time;
        let fade_finished = self.fader.update(time.unscaled_dt);

        if fade_finished && let Some(operation) = self.fade_in.take() {
            self.load_started_at = Some(self.now);
            if let Err(e) = operation.complete() {
                warn!(error = %e, "淡入操作已失效");
            }
            debug!(at = self.now, "加载画面淡入完成");
        }

        self.update_wrap_up(fade_finished, status);
    }

    fn update_wrap_up(&mut self, fade_finished: bool, status: &TransitionStatus) {
        let Some(wrap_up) = &mut self.wrap_up else {
            return;
        };

        if wrap_up.stage == WrapUpStage::MinLoadingTime {
            let elapsed = self.load_started_at.map_or(f32::INFINITY, |t| self.now - t);
            if elapsed >= self.min_loading_time {
                wrap_up.stage = WrapUpStage::TimeResume;
            }
        }

        if wrap_up.stage == WrapUpStage::TimeResume && !status.is_time_frozen() {
            // 遮罩本来就不可见时不需要淡出
            if !self.fader.is_visible() {
                self.finish_wrap_up();
                return;
            }
            wrap_up.stage = WrapUpStage::FadingOut;
            self.fader.fade_out();
            return;
        }

        if wrap_up.stage == WrapUpStage::FadingOut && fade_finished {
            self.finish_wrap_up();
        }
    }

    fn finish_wrap_up(&mut self) {
        if let Some(wrap_up) = self.wrap_up.take() {
            wrap_up.operation.release();
            self.last_progress = None;
            info!("加载画面已关闭");
        }
    }

    /// 没有进行中的淡入或收尾
    pub fn is_settled(&self) -> bool {
        self.fade_in.is_none() && self.wrap_up.is_none() && !self.fader.is_fading()
    }

    pub fn alpha(&self) -> f32 {
        self.fader.alpha()
    }

    pub fn last_progress(&self) -> Option<f32> {
        self.last_progress
    }

    pub fn wrap_up_stage(&self) -> Option<WrapUpStage> {
        self.wrap_up.as_ref().map(|w| w.stage)
    }
}

impl TransitionListener for LoadingScreen {
    fn on_before_transition(&mut self, from: &SceneId, to: &SceneId, barrier: &OperationBarrier) {
        // 上一次收尾尚未结束：其操作已作为过期操作被清除
        if self.wrap_up.take().is_some() {
            warn!("上一次加载画面收尾被新的切换打断");
        }

        debug!(from = %from, to = %to, "加载画面淡入");
        self.fade_in = Some(barrier.start_operation());
        self.load_started_at = None;
        self.fader.fade_in();
    }

    fn on_load_progress(&mut self, progress: f32) {
        debug!(progress, "Load progress");
        self.last_progress = Some(progress);
    }

    fn on_transition_complete(&mut self, to: &SceneId, barrier: &OperationBarrier) {
        debug!(scene = %to, "加载画面开始收尾");
        self.wrap_up = Some(WrapUp {
            operation: barrier.start_operation(),
            stage: WrapUpStage::MinLoadingTime,
        });
    }
}
