//! # Error 模块
//!
//! 定义 scene-runtime 中使用的错误类型。

use thiserror::Error;

use crate::barrier::OperationId;
use crate::scene::SceneId;

/// 切换错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransitionError {
    /// 已有切换正在进行
    #[error("正在切换场景（{current} → 进行中），无法切换到 '{requested}'")]
    Busy { current: SceneId, requested: SceneId },

    /// 尚未激活任何场景
    #[error("尚未激活任何场景，无法切换到 '{requested}'")]
    NotStarted { requested: SceneId },

    /// 首个场景已经激活
    #[error("首个场景已激活：'{active}'")]
    AlreadyStarted { active: SceneId },
}

/// 阻塞操作错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperationError {
    /// 操作不在追踪集合中（已释放、已完成移除或作为过期操作清除）
    #[error("阻塞操作 {0} 不存在")]
    Unknown(OperationId),
}

/// Result 类型别名
pub type TransitionResult<T> = Result<T, TransitionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_message_names_both_scenes() {
        let err = TransitionError::Busy {
            current: SceneId::from("title"),
            requested: SceneId::from("forest"),
        };
        let msg = err.to_string();
        assert!(msg.contains("title"));
        assert!(msg.contains("forest"));
    }
}
