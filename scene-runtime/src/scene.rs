//! # Scene 模块
//!
//! 场景标识符。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 场景标识符
///
/// 调度器只把它当作不透明的名字传递给钩子和加载器，
/// 不关心其内部格式（路径、名称均可）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(String);

impl SceneId {
    /// 创建场景标识符
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 获取字符串形式
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SceneId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SceneId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for SceneId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_id_conversions() {
        let a = SceneId::from("scenes/title");
        let b = SceneId::new(String::from("scenes/title"));
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "scenes/title");
        assert_eq!(a.to_string(), "scenes/title");
    }

    #[test]
    fn test_scene_id_serializes_as_plain_string() {
        let id = SceneId::from("forest");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"forest\"");

        let back: SceneId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
