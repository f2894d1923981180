//! Scene Host - 无界面切换驱动
//!
//! ```bash
//! cargo run -p scene-host
//! cargo run -p scene-host -- --route forest,cave,title --log-level debug
//! cargo run -p scene-host -- --config config.json --max-frames 5000
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use scene_host::{AppConfig, Host, init_tracing};
use tracing::info;

#[derive(Parser)]
#[command(name = "scene-host")]
#[command(about = "场景切换调度器 - 无界面宿主")]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认：config.json）
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// 依次切换的场景，逗号分隔（覆盖配置文件中的 route）
    #[arg(short, long, value_delimiter = ',')]
    route: Option<Vec<String>>,

    /// 日志级别（覆盖配置文件中的 logging.level）
    #[arg(long)]
    log_level: Option<String>,

    /// 帧数上限（覆盖配置文件中的 tick.max_frames）
    #[arg(long)]
    max_frames: Option<u64>,
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        eprintln!("scene-host error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(&cli.config)?;
    if let Some(route) = cli.route {
        config.route = route;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(max_frames) = cli.max_frames {
        config.tick.max_frames = max_frames;
    }
    config.validate()?;

    init_tracing(&config.logging.level);
    info!(config = ?cli.config, "配置加载完成");

    let route = config.route_ids();
    let mut host = Host::new(config);
    let report = host.run(&route)?;

    info!(
        frames = report.frames,
        transitions = report.transitions,
        phases = report.phases_fired.len(),
        "运行结束"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
