//! # Fader 模块
//!
//! 加载画面遮罩的透明度动画（线性，按未缩放时间推进）。

/// 淡入淡出方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
    /// 遮罩 0 → 1
    In,
    /// 遮罩 1 → 0
    Out,
}

#[derive(Debug, Clone)]
pub struct Fader {
    alpha: f32,
    duration: f32,
    fading: Option<FadeDirection>,
}

impl Fader {
    pub fn new(duration: f32) -> Self {
        Self {
            alpha: 0.0,
            duration: duration.max(0.0),
            fading: None,
        }
    }

    pub fn fade_in(&mut self) {
        self.fading = Some(FadeDirection::In);
    }

    pub fn fade_out(&mut self) {
        self.fading = Some(FadeDirection::Out);
    }

    /// 推进动画，返回本帧是否刚好结束
    pub fn update(&mut self, unscaled_dt: f32) -> bool {
        let Some(direction) = self.fading else {
            return false;
        };

        let step = if self.duration <= 0.0 {
            1.0
        } else {
            unscaled_dt / self.duration
        };

        let target = match direction {
            FadeDirection::In => 1.0,
            FadeDirection::Out => 0.0,
        };
        self.alpha = match direction {
            FadeDirection::In => (self.alpha + step).min(1.0),
            FadeDirection::Out => (self.alpha - step).max(0.0),
        };

        if self.alpha == target {
            self.fading = None;
            return true;
        }
        false
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn is_fading(&self) -> bool {
        self.fading.is_some()
    }

    /// 遮罩是否可见
    pub fn is_visible(&self) -> bool {
        self.alpha > 0.0
    }
}
