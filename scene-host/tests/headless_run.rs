//! # 无界面运行集成测试
//!
//! 测试 Config → Host → Scheduler → 协作者 的完整链路。

use std::cell::RefCell;
use std::rc::Rc;

use scene_host::{AppConfig, CompletionTrigger, ConfigError, Host, HostError};
use scene_runtime::{
    HookRegistry, LoaderTiming, OperationBarrier, Phase, SceneId, SchedulerConfig, SimulatedLoader,
    TransitionError, TransitionScheduler, WaitingOn,
};

/// 不等待遮罩、不等待加载的配置
fn fast_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.loading_screen.min_loading_time = 0.0;
    config.loading_screen.fade_duration = 0.0;
    config.loader = LoaderTiming::instant();
    config
}

fn ids(names: &[&str]) -> Vec<SceneId> {
    names.iter().map(|s| SceneId::from(*s)).collect()
}

#[test]
fn test_default_route_visits_every_scene() {
    let config = fast_config();
    let route = config.route_ids();
    let mut host = Host::new(config);

    let report = host.run(&route).unwrap();

    assert_eq!(report.visited, ids(&["title", "forest", "title"]));
    assert_eq!(report.transitions, 2);
    assert_eq!(report.phases_fired.len(), 3 + 8 + 8);
    assert_eq!(report.phases_fired[..3], Phase::INITIAL_SEQUENCE);
    assert_eq!(report.phases_fired[3..11], Phase::SEQUENCE);
    assert_eq!(report.phases_fired[11..], Phase::SEQUENCE);
    assert_eq!(host.scheduler().active_scene(), Some(SceneId::from("title")));
    assert!(host.scheduler().barrier().is_empty());
}

#[test]
fn test_run_with_loader_timing() {
    let mut config = fast_config();
    config.loader = LoaderTiming {
        load_frames: 5,
        activate_frames: 2,
        unload_frames: 3,
    };
    let mut host = Host::new(config);

    let report = host.run(&ids(&["forest"])).unwrap();

    assert_eq!(report.visited, ids(&["title", "forest"]));
    let loader = host.scheduler().provider();
    assert_eq!(loader.loaded_scenes(), &ids(&["forest"])[..]);
    assert!(!loader.is_busy());
    // 首个场景 1 帧；切换需要等待加载、激活、卸载
    assert!(report.frames > 1 + 5 + 2 + 3, "frames = {}", report.frames);
}

#[test]
fn test_config_file_drives_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
            "initial_scene": "menu",
            "route": ["stage1", "stage2"],
            "loading_screen": { "min_loading_time": 0.0, "fade_duration": 0.0 },
            "loader": { "load_frames": 0, "activate_frames": 0, "unload_frames": 0 }
        }"#,
    )
    .unwrap();

    let config = AppConfig::load(&path).unwrap();
    config.validate().unwrap();
    assert_eq!(config.logging.level, "info");
    assert!(config.scheduler.control_time_scale);

    let route = config.route_ids();
    let report = Host::new(config).run(&route).unwrap();
    assert_eq!(report.visited, ids(&["menu", "stage1", "stage2"]));
}

#[test]
fn test_config_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::load(dir.path().join("missing.json")).unwrap();
    assert_eq!(config, AppConfig::default());
}

#[test]
fn test_config_invalid_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = AppConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_config_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    let mut config = AppConfig::default();
    config.route = vec!["cave".to_string()];
    config.scheduler.activation_threshold = 0.5;
    config.save(&path).unwrap();

    assert_eq!(AppConfig::load(&path).unwrap(), config);
}

#[test]
fn test_loading_screen_blocks_before_transition() {
    let mut config = fast_config();
    config.tick.frame_ms = 250;
    config.loading_screen.fade_duration = 1.0;
    let mut host = Host::new(config);
    host.run(&[]).unwrap();

    host.scheduler_mut().begin_transition("forest").unwrap();

    // 遮罩淡入 4 帧，期间停留在 OnBeforeTransition
    for _ in 0..4 {
        let waiting = host.step();
        assert!(
            matches!(
                waiting,
                WaitingOn::Operations {
                    phase: Phase::BeforeTransition,
                    ..
                }
            ),
            "unexpected {waiting:?}"
        );
    }
    assert_eq!(host.scheduler().last_phase(), Some(Phase::BeforeTransition));

    let waiting = host.step();
    assert!(!matches!(
        waiting,
        WaitingOn::Operations {
            phase: Phase::BeforeTransition,
            ..
        }
    ));
    assert_eq!(host.loading_screen().borrow().alpha(), 1.0);
}

#[test]
fn test_time_frozen_while_loading() {
    let mut config = fast_config();
    config.loader = LoaderTiming {
        load_frames: 10,
        activate_frames: 1,
        unload_frames: 1,
    };
    let mut host = Host::new(config);
    host.run(&[]).unwrap();
    assert!(!host.status().is_time_frozen());

    host.scheduler_mut().begin_transition("forest").unwrap();
    let mut frozen_frames = 0;
    while !host.scheduler().is_idle() {
        host.step();
        if host.status().is_time_frozen() {
            frozen_frames += 1;
        }
    }

    assert!(frozen_frames >= 10, "frozen for {frozen_frames} frames");
    assert!(!host.status().is_time_frozen());
}

#[test]
fn test_busy_rejected_while_running() {
    let mut config = fast_config();
    config.loader = LoaderTiming::default();
    let mut host = Host::new(config);
    host.run(&[]).unwrap();

    host.scheduler_mut().begin_transition("forest").unwrap();
    host.step();

    let err = host.scheduler_mut().begin_transition("cave").unwrap_err();
    assert!(matches!(err, TransitionError::Busy { .. }));
}

#[test]
fn test_frame_budget() {
    let mut config = AppConfig::default();
    config.tick.max_frames = 10;
    let err = Host::new(config).run(&ids(&["forest"])).unwrap_err();
    assert!(matches!(err, HostError::FrameBudgetExceeded { frames: 10 }));
}

#[test]
fn test_completion_trigger_with_scheduler() {
    let hooks = HookRegistry::new();
    let loader = SimulatedLoader::new(LoaderTiming::instant()).with_loaded("a");
    let mut scheduler = TransitionScheduler::new(
        loader,
        OperationBarrier::new(),
        hooks.clone(),
        SchedulerConfig::default(),
    );

    let completed = Rc::new(RefCell::new(Vec::new()));
    let trigger = {
        let completed = completed.clone();
        CompletionTrigger::new(&hooks, move |scene| completed.borrow_mut().push(scene.clone()))
    };

    scheduler.start("a").unwrap();
    scheduler.tick();
    scheduler.begin_transition("b").unwrap();
    scheduler.tick();
    assert_eq!(*completed.borrow(), ids(&["a", "b"]));

    drop(trigger);
    scheduler.begin_transition("c").unwrap();
    scheduler.tick();
    assert_eq!(completed.borrow().len(), 2);
    assert_eq!(scheduler.active_scene(), Some(SceneId::from("c")));
}

#[test]
fn test_completion_trigger_chains_next_scene() {
    let mut host = Host::new(fast_config());
    let requests = host.scheduler().requests();
    let results = Rc::new(RefCell::new(Vec::new()));
    let _chain = {
        let results = results.clone();
        CompletionTrigger::new(host.scheduler().hooks(), move |scene| {
            if scene.as_str() == "forest" {
                results.borrow_mut().push(requests.request("cave"));
            }
        })
    };

    let report = host.run(&ids(&["forest"])).unwrap();

    assert_eq!(*results.borrow(), vec![Ok(())]);
    assert_eq!(report.visited, ids(&["title", "forest", "cave"]));
    assert_eq!(host.scheduler().active_scene(), Some(SceneId::from("cave")));
    assert!(host.scheduler().barrier().is_empty());
    assert!(host.loading_screen().borrow().is_settled());
}
