//! # xtask
//!
//! 本仓库的门禁命令，核心是配置检查：`configs/` 下的每份配置都必须能解析、
//! 通过校验，并且在帧数上限内无界面跑完整条路线。
//!
//! ```bash
//! cargo run -p xtask -- check-all
//! cargo run -p xtask -- config-check
//! cargo run -p xtask -- config-check configs/quick.json
//! cargo run -p xtask -- cov-runtime
//! ```

use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use scene_host::{AppConfig, Host};
use walkdir::WalkDir;

/// 示例配置目录（相对于 workspace 根目录）
const CONFIG_DIR: &str = "configs";

/// 门禁顺序：格式 → lint → 测试，最后校验示例配置
const GATE: &[&[&str]] = &[
    &["fmt", "--all", "--", "--check"],
    &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
    &["test", "--workspace"],
];

enum Task {
    CheckAll,
    Coverage(CovScope),
    ConfigCheck(Option<PathBuf>),
    Help,
}

#[derive(Clone, Copy)]
enum CovScope {
    /// 只统计 scene-runtime
    Runtime,
    /// scene-runtime + scene-host
    Workspace,
}

impl CovScope {
    fn args(self) -> &'static [&'static str] {
        match self {
            CovScope::Runtime => &["-p", "scene-runtime"],
            CovScope::Workspace => &["--workspace", "--exclude", "xtask"],
        }
    }
}

impl Task {
    fn parse(mut args: impl Iterator<Item = String>) -> anyhow::Result<Self> {
        let Some(sub) = args.next() else {
            return Ok(Task::Help);
        };
        Ok(match sub.as_str() {
            "check-all" => Task::CheckAll,
            "cov-runtime" => Task::Coverage(CovScope::Runtime),
            "cov-workspace" => Task::Coverage(CovScope::Workspace),
            "config-check" => Task::ConfigCheck(args.next().map(PathBuf::from)),
            "help" | "-h" | "--help" => Task::Help,
            other => anyhow::bail!("未知命令: {other}（运行 `cargo xtask help` 查看用法）"),
        })
    }
}

fn main() -> ExitCode {
    match real_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("xtask: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn real_main() -> anyhow::Result<()> {
    let root = workspace_root();
    match Task::parse(std::env::args().skip(1))? {
        Task::CheckAll => {
            for args in GATE {
                cargo(&root, args)?;
            }
            config_check(&root.join(CONFIG_DIR))
        }
        Task::Coverage(scope) => coverage(&root, scope),
        Task::ConfigCheck(path) => {
            let target = path.unwrap_or_else(|| root.join(CONFIG_DIR));
            config_check(&target)
        }
        Task::Help => {
            print_help();
            Ok(())
        }
    }
}

fn print_help() {
    eprintln!(
        r#"xtask - 场景切换调度器的门禁命令

USAGE:
  cargo run -p xtask -- <command>

COMMANDS:
  check-all              fmt + clippy(-D warnings) + test，然后 config-check
  config-check [path]    检查配置文件；默认检查 configs/ 下所有 .json
  cov-runtime            scene-runtime 覆盖率（需要 cargo-llvm-cov）
  cov-workspace          scene-runtime + scene-host 覆盖率

CONFIG-CHECK 对每份配置：
  1. 解析 JSON（字段缺省时取默认值）
  2. AppConfig::validate
  3. 以无界面模式跑完 route，确认在 tick.max_frames 内稳定
"#
    );
}

/// tools/xtask 的上两级目录
fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .ancestors()
        .nth(2)
        .unwrap_or(manifest_dir)
        .to_path_buf()
}

fn cargo(root: &Path, args: &[&str]) -> anyhow::Result<()> {
    let line = format!("cargo {}", args.join(" "));
    eprintln!("\n==> {line}");
    let status = Command::new("cargo").args(args).current_dir(root).status()?;
    if !status.success() {
        anyhow::bail!("`{line}` 失败（{status}）");
    }
    Ok(())
}

fn coverage(root: &Path, scope: CovScope) -> anyhow::Result<()> {
    let installed = Command::new("cargo").args(["llvm-cov", "--version"]).output();
    if !installed.is_ok_and(|out| out.status.success()) {
        anyhow::bail!(
            "找不到 cargo-llvm-cov，请先执行：\n  \
             cargo install cargo-llvm-cov\n  \
             rustup component add llvm-tools-preview"
        );
    }

    let mut args = vec!["llvm-cov"];
    args.extend_from_slice(scope.args());
    args.push("--html");
    cargo(root, &args)?;

    eprintln!("\n报告: target/llvm-cov/html/index.html");
    Ok(())
}

//=============================================================================
// config-check
//=============================================================================

/// 单份配置的检查结果
struct ConfigReport {
    path: PathBuf,
    outcome: anyhow::Result<DryRun>,
}

/// 无界面试运行的摘要
struct DryRun {
    scenes: Vec<String>,
    frames: u64,
    max_frames: u64,
}

fn config_check(target: &Path) -> anyhow::Result<()> {
    let files = if target.is_file() {
        vec![target.to_path_buf()]
    } else if target.is_dir() {
        json_files(target)
    } else {
        anyhow::bail!("路径不存在: {}", target.display());
    };

    if files.is_empty() {
        eprintln!("{} 下没有 .json 配置", target.display());
        return Ok(());
    }

    eprintln!("\n==> config-check（{} 个文件）", files.len());
    let reports: Vec<ConfigReport> = files
        .into_iter()
        .map(|path| {
            let outcome = dry_run(&path);
            ConfigReport { path, outcome }
        })
        .collect();

    let mut failed = 0;
    for report in &reports {
        match &report.outcome {
            Ok(run) => eprintln!(
                "  ok    {}  {}  ({} / {} 帧)",
                report.path.display(),
                run.scenes.join(" → "),
                run.frames,
                run.max_frames
            ),
            Err(e) => {
                failed += 1;
                eprintln!("  FAIL  {}  {e:#}", report.path.display());
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} / {} 份配置未通过检查", reports.len());
    }
    Ok(())
}

/// 收集目录下的 JSON 文件，跳过 target 目录
fn json_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_entry(|e| e.file_name() != "target")
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}

fn dry_run(path: &Path) -> anyhow::Result<DryRun> {
    let content = std::fs::read_to_string(path)?;
    let mut config = AppConfig::from_json(&content)?;
    config.validate()?;

    // 试运行不需要真实时间节奏
    config.tick.realtime = false;
    let max_frames = config.tick.max_frames;
    let route = config.route_ids();

    let report = Host::new(config).run(&route)?;
    Ok(DryRun {
        scenes: report.visited.iter().map(|s| s.to_string()).collect(),
        frames: report.frames,
        max_frames,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<Task> {
        Task::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_tasks() {
        assert!(matches!(parse(&[]).unwrap(), Task::Help));
        assert!(matches!(parse(&["check-all"]).unwrap(), Task::CheckAll));
        assert!(matches!(
            parse(&["cov-runtime"]).unwrap(),
            Task::Coverage(CovScope::Runtime)
        ));
        assert!(matches!(
            parse(&["config-check", "configs/quick.json"]).unwrap(),
            Task::ConfigCheck(Some(p)) if p == Path::new("configs/quick.json")
        ));
        assert!(parse(&["script-check"]).is_err());
    }

    #[test]
    fn test_shipped_configs_dry_run() {
        let files = json_files(&workspace_root().join(CONFIG_DIR));
        assert!(!files.is_empty());

        for file in &files {
            let run = dry_run(file).unwrap_or_else(|e| panic!("{}: {e:#}", file.display()));
            assert!(run.frames <= run.max_frames);
            assert!(run.scenes.len() >= 2, "{}", file.display());
        }
        config_check(&workspace_root().join(CONFIG_DIR)).unwrap();
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("ok.json"),
            r#"{ "loading_screen": { "min_loading_time": 0.0, "fade_duration": 0.0 } }"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("bad.json"),
            r#"{ "scheduler": { "activation_threshold": 1.5 } }"#,
        )
        .unwrap();

        assert!(dry_run(&dir.path().join("bad.json")).is_err());
        assert!(dry_run(&dir.path().join("ok.json")).is_ok());
        assert!(config_check(dir.path()).is_err());
    }

    #[test]
    fn test_frame_budget_too_small_fails_dry_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tight.json");
        std::fs::write(&path, r#"{ "tick": { "max_frames": 5 } }"#).unwrap();

        let err = dry_run(&path).err().unwrap();
        assert!(format!("{err:#}").contains('5'));
    }
}
