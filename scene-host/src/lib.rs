//! # Scene Host
//!
//! 场景切换调度器的无界面宿主。
//!
//! ## 架构说明
//!
//! Host 层负责：
//! - 配置文件与命令行参数
//! - 日志初始化
//! - 帧时钟
//! - 参与切换的协作者（加载画面、切换完成回调）
//!
//! 切换逻辑本身全部在 `scene-runtime` 中，Host 只负责按帧驱动。

pub mod clock;
pub mod completion;
pub mod config;
pub mod fader;
pub mod host;
pub mod loading_screen;
pub mod logging;

pub use clock::{FrameClock, FrameTime};
pub use completion::CompletionTrigger;
pub use config::{AppConfig, ConfigError, LoadingScreenConfig, LoggingConfig, TickConfig};
pub use fader::{FadeDirection, Fader};
pub use host::{Host, HostError, RunReport};
pub use loading_screen::{LoadingScreen, WrapUpStage};
pub use logging::{init_tracing, parse_level};
