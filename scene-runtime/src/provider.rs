//! # Provider 模块
//!
//! 外部场景加载器接口，以及一个按帧计数的模拟实现。
//!
//! ## 约定
//!
//! - `load_progress` 单调不减，并在调用 `activate` 之前停在激活阈值
//!   （见 `SchedulerConfig::activation_threshold`）；调度器依赖这一点确定
//!   `BeforeActivate` 的时机
//! - 所有异步步骤最终都会完成；加载失败的传播不属于调度器的职责

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::DEFAULT_ACTIVATION_THRESHOLD;
use crate::scene::SceneId;

/// 场景加载器
///
/// 所有方法都在调度器的 tick 上调用，`poll_*` 每个 tick 最多调用一次。
pub trait SceneLoadProvider {
    /// 开始以附加、延迟激活的方式加载场景
    fn begin_load(&mut self, scene: &SceneId);

    /// 当前加载进度
    fn load_progress(&mut self) -> f32;

    /// 允许激活已加载的场景
    fn activate(&mut self);

    /// 激活是否完成
    fn poll_activation(&mut self) -> bool;

    /// 开始卸载场景
    fn begin_unload(&mut self, scene: &SceneId);

    /// 卸载是否完成
    fn poll_unload(&mut self) -> bool;
}

/// 模拟加载器的耗时（以轮询次数计）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderTiming {
    /// 加载到激活阈值所需的轮询次数
    #[serde(default = "default_load_frames")]
    pub load_frames: u32,
    /// 激活所需的轮询次数
    #[serde(default = "default_activate_frames")]
    pub activate_frames: u32,
    /// 卸载所需的轮询次数
    #[serde(default = "default_unload_frames")]
    pub unload_frames: u32,
}

fn default_load_frames() -> u32 {
    10
}

fn default_activate_frames() -> u32 {
    1
}

fn default_unload_frames() -> u32 {
    1
}

impl Default for LoaderTiming {
    fn default() -> Self {
        Self {
            load_frames: default_load_frames(),
            activate_frames: default_activate_frames(),
            unload_frames: default_unload_frames(),
        }
    }
}

impl LoaderTiming {
    /// 所有步骤都在第一次轮询时完成
    pub fn instant() -> Self {
        Self {
            load_frames: 0,
            activate_frames: 0,
            unload_frames: 0,
        }
    }
}

/// 加载器事件（用于测试和诊断）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoaderEvent {
    LoadStarted(SceneId),
    ActivationRequested(SceneId),
    Activated(SceneId),
    UnloadStarted(SceneId),
    Unloaded(SceneId),
}

#[derive(Debug)]
struct LoadJob {
    scene: SceneId,
    elapsed: u32,
    /// 剩余激活轮询次数，`None` 表示尚未允许激活
    activation_remaining: Option<u32>,
}

/// 按帧计数的模拟加载器
#[derive(Debug)]
pub struct SimulatedLoader {
    timing: LoaderTiming,
    threshold: f32,
    loading: Option<LoadJob>,
    unloading: Option<(SceneId, u32)>,
    loaded: Vec<SceneId>,
    events: Vec<LoaderEvent>,
}

impl SimulatedLoader {
    pub fn new(timing: LoaderTiming) -> Self {
        Self::with_threshold(timing, DEFAULT_ACTIVATION_THRESHOLD)
    }

    pub fn with_threshold(timing: LoaderTiming, threshold: f32) -> Self {
        Self {
            timing,
            threshold,
            loading: None,
            unloading: None,
            loaded: Vec::new(),
            events: Vec::new(),
        }
    }

    /// 预置已加载的场景（通常是首个场景）
    pub fn with_loaded(mut self, scene: impl Into<SceneId>) -> Self {
        self.loaded.push(scene.into());
        self
    }

    pub fn timing(&self) -> LoaderTiming {
        self.timing
    }

    /// 当前已加载并激活的场景
    pub fn loaded_scenes(&self) -> &[SceneId] {
        &self.loaded
    }

    pub fn events(&self) -> &[LoaderEvent] {
        &self.events
    }

    pub fn is_busy(&self) -> bool {
        self.loading.is_some() || self.unloading.is_some()
    }
}

impl SceneLoadProvider for SimulatedLoader {
    fn begin_load(&mut self, scene: &SceneId) {
        if let Some(job) = &self.loading {
            warn!(pending = %job.scene, scene = %scene, "上一个加载尚未完成，被新的加载覆盖");
        }
        self.events.push(LoaderEvent::LoadStarted(scene.clone()));
        self.loading = Some(LoadJob {
            scene: scene.clone(),
            elapsed: 0,
            activation_remaining: None,
        });
    }

    fn load_progress(&mut self) -> f32 {
        let Some(job) = &mut self.loading else {
            return 0.0;
        };
        if job.activation_remaining.is_some() {
            return 1.0;
        }

        let progress = if self.timing.load_frames == 0 {
            self.threshold
        } else {
            let ratio = (job.elapsed as f32 / self.timing.load_frames as f32).min(1.0);
            ratio * self.threshold
        };
        job.elapsed = job.elapsed.saturating_add(1);
        progress
    }

    fn activate(&mut self) {
        match &mut self.loading {
            Some(job) => {
                self.events
                    .push(LoaderEvent::ActivationRequested(job.scene.clone()));
                job.activation_remaining = Some(self.timing.activate_frames);
            }
            None => warn!("没有正在加载的场景，忽略激活请求"),
        }
    }

    fn poll_activation(&mut self) -> bool {
        let Some(job) = &mut self.loading else {
            return true;
        };
        match job.activation_remaining {
            None => false,
            Some(0) => {
                let scene = job.scene.clone();
                self.loading = None;
                self.events.push(LoaderEvent::Activated(scene.clone()));
                self.loaded.push(scene);
                true
            }
            Some(remaining) => {
                job.activation_remaining = Some(remaining - 1);
                false
            }
        }
    }

    fn begin_unload(&mut self, scene: &SceneId) {
        self.events.push(LoaderEvent::UnloadStarted(scene.clone()));
        self.unloading = Some((scene.clone(), self.timing.unload_frames));
    }

    fn poll_unload(&mut self) -> bool {
        let Some((scene, remaining)) = &mut self.unloading else {
            return true;
        };
        if *remaining > 0 {
            *remaining -= 1;
            return false;
        }

        let scene = scene.clone();
        self.unloading = None;
        // 同名场景重新加载时只卸载较早的一份
        if let Some(index) = self.loaded.iter().position(|s| *s == scene) {
            self.loaded.remove(index);
        }
        self.events.push(LoaderEvent::Unloaded(scene));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_progress_stalls_at_threshold() {
        let timing = LoaderTiming {
            load_frames: 4,
            ..LoaderTiming::default()
        };
        let mut loader = SimulatedLoader::new(timing);
        loader.begin_load(&SceneId::from("b"));

        let samples: Vec<f32> = (0..8).map(|_| loader.load_progress()).collect();
        for pair in samples.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        assert_eq!(samples[0], 0.0);
        assert!(samples.iter().all(|p| *p <= DEFAULT_ACTIVATION_THRESHOLD));
        assert_eq!(*samples.last().unwrap(), DEFAULT_ACTIVATION_THRESHOLD);
    }

    #[test]
    fn test_activation_waits_for_request() {
        let mut loader = SimulatedLoader::new(LoaderTiming {
            load_frames: 0,
            activate_frames: 2,
            unload_frames: 0,
        });
        loader.begin_load(&SceneId::from("b"));
        assert!(!loader.poll_activation());

        loader.activate();
        assert!(!loader.poll_activation());
        assert!(!loader.poll_activation());
        assert!(loader.poll_activation());
        assert_eq!(loader.loaded_scenes(), &[SceneId::from("b")]);
    }

    #[test]
    fn test_unload_removes_scene() {
        let mut loader = SimulatedLoader::new(LoaderTiming {
            unload_frames: 1,
            ..LoaderTiming::instant()
        })
        .with_loaded("a");

        loader.begin_unload(&SceneId::from("a"));
        assert!(!loader.poll_unload());
        assert!(loader.poll_unload());
        assert!(loader.loaded_scenes().is_empty());
        assert_eq!(
            loader.events(),
            &[
                LoaderEvent::UnloadStarted(SceneId::from("a")),
                LoaderEvent::Unloaded(SceneId::from("a")),
            ]
        );
    }

    #[test]
    fn test_timing_defaults_from_partial_json() {
        let timing: LoaderTiming = serde_json::from_str(r#"{ "load_frames": 3 }"#).unwrap();
        assert_eq!(timing.load_frames, 3);
        assert_eq!(timing.activate_frames, 1);
        assert_eq!(timing.unload_frames, 1);
    }
}
