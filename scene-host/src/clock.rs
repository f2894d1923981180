//! # Clock 模块
//!
//! 固定节奏的帧时钟。
//!
//! 调度器冻结时间期间，缩放后的 `dt` 为 0，未缩放的 `unscaled_dt` 照常推进。
//! 需要在冻结期间继续运动的协作者（遮罩、加载画面计时）使用未缩放时间。

use scene_runtime::TransitionStatus;

/// 单帧时间信息
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    /// 帧序号（从 1 开始）
    pub frame: u64,
    /// 缩放后的帧时长（时间冻结时为 0）
    pub dt: f32,
    /// 未缩放的帧时长
    pub unscaled_dt: f32,
    /// 累计缩放时间
    pub time: f32,
    /// 累计未缩放时间
    pub unscaled_time: f32,
}

#[derive(Debug, Clone)]
pub struct FrameClock {
    frame_seconds: f32,
    current: FrameTime,
}

impl FrameClock {
    pub fn new(frame_seconds: f32) -> Self {
        Self {
            frame_seconds,
            current: FrameTime {
                frame: 0,
                dt: 0.0,
                unscaled_dt: 0.0,
                time: 0.0,
                unscaled_time: 0.0,
            },
        }
    }

    /// 推进一帧
    pub fn advance(&mut self, status: &TransitionStatus) -> FrameTime {
        let dt = if status.is_time_frozen() {
            0.0
        } else {
            self.frame_seconds
        };

        let now = &mut self.current;
        now.frame += 1;
        now.dt = dt;
        now.unscaled_dt = self.frame_seconds;
        now.time += dt;
        now.unscaled_time += self.frame_seconds;
        *now
    }

    pub fn now(&self) -> FrameTime {
        self.current
    }
}
