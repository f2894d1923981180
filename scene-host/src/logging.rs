//! 日志初始化

use std::str::FromStr;

use tracing::Level;

/// 解析日志级别，无效时回退到 info
pub fn parse_level(level: &str) -> Level {
    match Level::from_str(level.trim()) {
        Ok(level) => level,
        Err(_) => {
            eprintln!("⚠️ 无效的日志级别 '{}'，使用 info", level);
            Level::INFO
        }
    }
}

/// 安装全局 tracing subscriber
///
/// 重复调用时保留第一次安装的 subscriber。
pub fn init_tracing(level: &str) {
    let level = parse_level(level);
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level(" WARN "), Level::WARN);
        assert_eq!(parse_level("loud"), Level::INFO);
    }
}
