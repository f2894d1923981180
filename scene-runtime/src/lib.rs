//! # Scene Runtime
//!
//! 场景切换调度核心库。
//!
//! ## 架构概述
//!
//! `scene-runtime` 是纯逻辑核心，不依赖任何 IO 或渲染引擎。
//! 调度器按固定阶段序列推进，每个阶段触发钩子，并等待钩子注册的阻塞操作全部完成：
//!
//! ```text
//! Host                                   Runtime
//!   │                                       │
//!   │──── begin_transition(next) ─────────►│
//!   │                                       │
//!   │──── tick() ─────────────────────────►│ 触发钩子 / 轮询屏障 / 轮询加载器
//!   │◄─── WaitingOn ───────────────────────│
//!   │                                       │
//! Collaborators                             │
//!   │◄─── HookEvent ───────────────────────│
//!   │──── start_operation / set_progress ─►│ OperationBarrier
//! ```
//!
//! ## 核心类型
//!
//! - [`TransitionScheduler`]：阶段状态机，唯一的切换入口
//! - [`OperationBarrier`]：阻塞操作集合与进度聚合
//! - [`HookRegistry`]：各阶段的多订阅者钩子
//! - [`SceneLoadProvider`]：外部场景加载器接口
//!
//! ## 使用示例
//!
//! ```ignore
//! use scene_runtime::*;
//!
//! let barrier = OperationBarrier::new();
//! let hooks = HookRegistry::new();
//! hooks.subscribe(HookSlot::BeforeTransition, |_, barrier| {
//!     let fade = barrier.start_operation();
//!     // 淡入完成后 fade.complete()
//! });
//!
//! let loader = SimulatedLoader::new(LoaderTiming::default());
//! let mut scheduler = TransitionScheduler::new(loader, barrier, hooks, SchedulerConfig::default());
//! scheduler.start("title")?;
//! scheduler.begin_transition("forest")?;
//! while !scheduler.tick().is_idle() {
//!     // 等待下一帧
//! }
//! ```
//!
//! ## 模块结构
//!
//! - [`scene`]：场景标识符
//! - [`phase`]：阶段序列与钩子槽位
//! - [`state`]：切换状态、只读视图与挂起原因
//! - [`barrier`]：阻塞操作屏障
//! - [`hooks`]：钩子注册表与监听器
//! - [`provider`]：加载器接口与模拟实现
//! - [`request`]：钩子内发起切换的请求句柄
//! - [`config`]：调度器配置
//! - [`scheduler`]：调度器
//! - [`error`]：错误类型定义

pub mod barrier;
pub mod config;
pub mod error;
pub mod hooks;
pub mod phase;
pub mod provider;
pub mod request;
pub mod scene;
pub mod scheduler;
pub mod state;

// 重导出核心类型
pub use barrier::{DrainPoll, OperationBarrier, OperationHandle, OperationId};
pub use config::{DEFAULT_ACTIVATION_THRESHOLD, SchedulerConfig};
pub use error::{OperationError, TransitionError, TransitionResult};
pub use hooks::{HookEvent, HookRegistry, SubscriptionId, TransitionListener};
pub use phase::{HookSlot, Phase};
pub use provider::{LoaderEvent, LoaderTiming, SceneLoadProvider, SimulatedLoader};
pub use request::TransitionRequests;
pub use scene::SceneId;
pub use scheduler::{TransitionScheduler, TransitionStarted};
pub use state::{TransitionState, TransitionStatus, WaitingOn};
