//! # Config 模块
//!
//! Host 配置管理，集中管理所有配置项。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 配置文件 (config.json)
//! 3. 默认值（最低）

use scene_runtime::{LoaderTiming, SceneId, SchedulerConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// 应用配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 启动时激活的首个场景
    #[serde(default = "default_initial_scene")]
    pub initial_scene: String,

    /// 依次切换的场景列表
    #[serde(default = "default_route")]
    pub route: Vec<String>,

    /// 调度器配置
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,

    /// 加载画面配置
    #[serde(default)]
    pub loading_screen: LoadingScreenConfig,

    /// 模拟加载器耗时
    #[serde(default)]
    pub loader: LoaderTiming,

    /// 帧驱动配置
    #[serde(default)]
    pub tick: TickConfig,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 最大日志级别（trace/debug/info/warn/error）
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// 加载画面配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadingScreenConfig {
    /// 加载画面最短停留时间（秒，不受时间冻结影响）
    #[serde(default = "default_min_loading_time")]
    pub min_loading_time: f32,

    /// 遮罩淡入/淡出时长（秒）
    #[serde(default = "default_fade_duration")]
    pub fade_duration: f32,
}

/// 帧驱动配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickConfig {
    /// 每帧时长（毫秒）
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u64,

    /// 单次运行的帧数上限
    #[serde(default = "default_max_frames")]
    pub max_frames: u64,

    /// 是否按真实时间节奏运行（每帧 sleep）
    #[serde(default)]
    pub realtime: bool,
}

// 默认值函数
fn default_initial_scene() -> String {
    "title".to_string()
}

fn default_route() -> Vec<String> {
    vec!["forest".to_string(), "title".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_min_loading_time() -> f32 {
    3.0
}

fn default_fade_duration() -> f32 {
    0.5
}

fn default_frame_ms() -> u64 {
    16
}

fn default_max_frames() -> u64 {
    100_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            initial_scene: default_initial_scene(),
            route: default_route(),
            scheduler: SchedulerConfig::default(),
            logging: LoggingConfig::default(),
            loading_screen: LoadingScreenConfig::default(),
            loader: LoaderTiming::default(),
            tick: TickConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for LoadingScreenConfig {
    fn default() -> Self {
        Self {
            min_loading_time: default_min_loading_time(),
            fade_duration: default_fade_duration(),
        }
    }
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            frame_ms: default_frame_ms(),
            max_frames: default_max_frames(),
            realtime: false,
        }
    }
}

impl AppConfig {
    /// 加载配置文件
    ///
    /// 文件不存在时返回默认配置并打印警告；读取或解析失败返回错误。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            eprintln!("⚠️ 配置文件不存在: {:?}，使用默认配置", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// 从 JSON 文本解析
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_scene.trim().is_empty() {
            return Err(ConfigError::Validation(
                "必须配置 initial_scene（首个场景）".to_string(),
            ));
        }

        if let Some(index) = self.route.iter().position(|s| s.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "route 第 {} 项为空",
                index + 1
            )));
        }

        if !self.scheduler.has_valid_threshold() {
            return Err(ConfigError::Validation(format!(
                "activation_threshold 必须在 (0, 1] 之间，实际为 {}",
                self.scheduler.activation_threshold
            )));
        }

        if self.loading_screen.min_loading_time < 0.0 {
            return Err(ConfigError::Validation(
                "min_loading_time 不能为负数".to_string(),
            ));
        }

        if self.loading_screen.fade_duration < 0.0 {
            return Err(ConfigError::Validation(
                "fade_duration 不能为负数".to_string(),
            ));
        }

        if self.tick.frame_ms == 0 || self.tick.max_frames == 0 {
            return Err(ConfigError::Validation(
                "frame_ms 与 max_frames 必须大于 0".to_string(),
            ));
        }

        Ok(())
    }

    /// 首个场景
    pub fn initial_scene_id(&self) -> SceneId {
        SceneId::from(self.initial_scene.as_str())
    }

    /// 切换路线
    pub fn route_ids(&self) -> Vec<SceneId> {
        self.route.iter().map(|s| SceneId::from(s.as_str())).collect()
    }

    /// 每帧时长（秒）
    pub fn frame_seconds(&self) -> f32 {
        self.tick.frame_ms as f32 / 1000.0
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO 错误
    #[error("配置 IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 解析/序列化失败
    #[error("配置解析失败: {0}")]
    Parse(#[from] serde_json::Error),

    /// 验证失败
    #[error("配置验证失败: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.initial_scene, "title");
        assert_eq!(config.route, vec!["forest", "title"]);
        assert_eq!(config.logging.level, "info");
        assert!(config.scheduler.control_time_scale);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = AppConfig::from_json(
            r#"{
                "initial_scene": "menu",
                "scheduler": { "control_time_scale": false },
                "loader": { "load_frames": 2 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.initial_scene_id(), SceneId::from("menu"));
        assert!(!config.scheduler.control_time_scale);
        assert_eq!(config.scheduler.activation_threshold, 0.9);
        assert_eq!(config.loader.load_frames, 2);
        assert_eq!(config.loader.unload_frames, 1);
        assert_eq!(config.tick.frame_ms, 16);
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();

        config.scheduler.activation_threshold = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
        config.scheduler.activation_threshold = 0.9;

        config.route.push(" ".to_string());
        assert!(config.validate().is_err());
        config.route.pop();

        config.loading_screen.fade_duration = -1.0;
        assert!(config.validate().is_err());
        config.loading_screen.fade_duration = 0.5;

        config.tick.max_frames = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        assert!(matches!(
            AppConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_frame_seconds() {
        let mut config = AppConfig::default();
        config.tick.frame_ms = 250;
        assert_eq!(config.frame_seconds(), 0.25);
    }
}
