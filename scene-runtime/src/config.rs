//! # Config 模块
//!
//! 调度器配置。

use serde::{Deserialize, Serialize};

/// 加载器在允许激活前停留的进度值
pub const DEFAULT_ACTIVATION_THRESHOLD: f32 = 0.9;

/// 调度器配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// 是否在切换期间冻结全局时间
    ///
    /// 开启时 `BeforeLoad` 钩子触发后冻结，`SceneReady` 的等待完成后恢复。
    #[serde(default = "default_control_time_scale")]
    pub control_time_scale: bool,

    /// 加载进度达到该值即视为可以激活
    #[serde(default = "default_activation_threshold")]
    pub activation_threshold: f32,
}

fn default_control_time_scale() -> bool {
    true
}

fn default_activation_threshold() -> f32 {
    DEFAULT_ACTIVATION_THRESHOLD
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            control_time_scale: default_control_time_scale(),
            activation_threshold: default_activation_threshold(),
        }
    }
}

impl SchedulerConfig {
    /// 阈值是否落在 (0, 1]
    pub fn has_valid_threshold(&self) -> bool {
        self.activation_threshold > 0.0 && self.activation_threshold <= 1.0
    }
}
