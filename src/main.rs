use aura::cli::{emit_json_line, resolve_runtime_config, Cli, ExitCode, JsonSnapshot, Mode};
use aura::clock::{monotonic_seconds, wall_seconds, CancelToken, FixedIntervalLoop};
use aura::cockpit::bridges::{
    ChannelTelemetryBridge, DvrBridge, EngineTelemetryBridge, FallbackRenderBridge, StoreDvrBridge, TelemetryBridge,
};
use aura::cockpit::{CockpitConfig, CockpitController};
use aura::config::RuntimeConfig;
use aura::error::{AppError, Result};
use aura::store::DvrStore;
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

/// Bound on how many missed ticks a fixed-interval loop collapses into one
/// catch-up call after a stall, rather than replaying every missed beat.
const MAX_CATCHUP_FRAMES: u32 = 4;

fn main() {
    aura::log_init::init_logging();
    let cli = Cli::parse();
    let code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::UsageOrRuntimeError
        }
    };
    std::process::exit(code as i32);
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let mode = cli.resolve_mode()?;
    let config = resolve_runtime_config(cli)?;
    aura::log_init::log_startup_banner(&config.db_path, config.persistence_enabled, config.retention_seconds);

    match mode {
        Mode::Snapshot => run_snapshot(&config),
        Mode::Watch { interval, count } => run_watch(&config, interval, count),
        Mode::Readback { latest, since, until } => run_readback(&config, latest, since, until),
        Mode::Gui => run_gui(&config),
    }
}

fn open_store_best_effort(config: &RuntimeConfig) -> Option<Arc<DvrStore>> {
    if !config.persistence_enabled {
        return None;
    }
    match DvrStore::open(&config.db_path, config.retention_seconds) {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            tracing::warn!("persistence disabled for this run: {e}");
            None
        }
    }
}

fn run_snapshot(config: &RuntimeConfig) -> Result<ExitCode> {
    let mut bridge = EngineTelemetryBridge::new();
    let now = wall_seconds();
    let snapshot = bridge.collect(now, 0)?;
    let store = open_store_best_effort(config);
    if let Some(store) = &store {
        if let Err(e) = store.append(&snapshot.sample) {
            tracing::warn!("failed to persist snapshot: {e}");
        }
    }

    let json = JsonSnapshot::from(&snapshot.sample);
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    Ok(emit_json_line(&mut handle, &json))
}

fn run_watch(config: &RuntimeConfig, interval: f64, count: Option<u64>) -> Result<ExitCode> {
    let cancel = install_cancel_handler();
    let tick_cancel = cancel.clone();
    let store = open_store_best_effort(config);
    let mut bridge = EngineTelemetryBridge::new();
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    let mut emitted: u64 = 0;
    let mut collect_error: Option<AppError> = None;
    let mut output_code: Option<ExitCode> = None;
    let mut count_reached = false;
    let mut stream_closed = false;

    let scheduler = FixedIntervalLoop::new(Duration::from_secs_f64(interval), MAX_CATCHUP_FRAMES);
    scheduler.run(&cancel, |frames| {
        if frames > 1 {
            tracing::warn!("watch loop fell behind; collapsed {frames} missed ticks");
        }
        if let Some(limit) = count {
            if emitted >= limit {
                count_reached = true;
                tick_cancel.cancel();
                return;
            }
        }

        let now = wall_seconds();
        let snapshot = match bridge.collect(now, 0) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                collect_error = Some(e);
                tick_cancel.cancel();
                return;
            }
        };
        if let Some(store) = &store {
            if let Err(e) = store.append(&snapshot.sample) {
                tracing::warn!("failed to persist sample: {e}");
            }
        }

        let json = JsonSnapshot::from(&snapshot.sample);
        let code = emit_json_line(&mut handle, &json);
        emitted += 1;
        if code != ExitCode::Ok {
            output_code = Some(code);
            tick_cancel.cancel();
            return;
        }
        // emit_json_line already flushed; a closed stream surfaces here too.
        if handle.flush().is_err() {
            stream_closed = true;
            tick_cancel.cancel();
            return;
        }
        if let Some(limit) = count {
            if emitted >= limit {
                count_reached = true;
                tick_cancel.cancel();
            }
        }
    });

    if let Some(e) = collect_error {
        return Err(e);
    }
    if let Some(code) = output_code {
        return Ok(code);
    }
    if count_reached || stream_closed {
        return Ok(ExitCode::Ok);
    }
    Ok(ExitCode::Cancelled)
}

fn run_readback(config: &RuntimeConfig, latest: Option<u64>, since: Option<f64>, until: Option<f64>) -> Result<ExitCode> {
    if !config.persistence_enabled {
        return Err(AppError::InvalidArgument(
            "persistence is disabled; cannot read back persisted samples".to_string(),
        ));
    }
    let store = DvrStore::open(&config.db_path, config.retention_seconds)?;

    let samples = if let Some(n) = latest {
        store.latest(n)?
    } else {
        store.between(since, until)?
    };

    let json_values: Vec<JsonSnapshot> = samples.iter().map(JsonSnapshot::from).collect();
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    match serde_json::to_writer(&mut handle, &json_values) {
        Ok(()) => {
            let _ = writeln!(handle);
            Ok(ExitCode::Ok)
        }
        Err(_) => Ok(ExitCode::Ok),
    }
}

/// Headless cockpit mode: a poller thread collects telemetry and appends it
/// to the DVR store at a fixed cadence; the render loop on the calling
/// thread ticks the cockpit controller at a fixed frame rate and prints a
/// line-oriented rendering of the published `CockpitUiState`. A full
/// graphical frontend is out of scope here; this fuses both loops onto one
/// process for headless use.
fn run_gui(config: &RuntimeConfig) -> Result<ExitCode> {
    let cancel = install_cancel_handler();
    let store = open_store_best_effort(config);
    let (sender, receiver) = crossbeam_channel::bounded(1);

    let poller_cancel = cancel.clone();
    let poller_store = store.clone();
    let poller = std::thread::spawn(move || {
        let mut bridge = EngineTelemetryBridge::new();
        let scheduler = FixedIntervalLoop::new(Duration::from_millis(500), MAX_CATCHUP_FRAMES);
        scheduler.run(&poller_cancel, |frames| {
            if frames > 1 {
                tracing::warn!("telemetry poller fell behind; collapsed {frames} missed ticks");
            }
            let now = wall_seconds();
            if let Ok(snapshot) = bridge.collect(now, 8) {
                if let Some(store) = &poller_store {
                    if let Err(e) = store.append(&snapshot.sample) {
                        tracing::warn!("failed to persist sample: {e}");
                    }
                }
                // Latest-value handoff: drop a stale unread snapshot rather
                // than block the poller on a slow render thread.
                let _ = sender.try_send(snapshot);
            }
        });
    });

    let telemetry_bridge = ChannelTelemetryBridge::new(receiver);
    let dvr_bridge: Option<Box<dyn DvrBridge>> =
        store.clone().map(|s| Box::new(StoreDvrBridge::new(s)) as Box<dyn DvrBridge>);
    let mut controller = CockpitController::new(
        Box::new(telemetry_bridge),
        Box::new(FallbackRenderBridge),
        dvr_bridge,
        config.persistence_enabled,
        CockpitConfig::default(),
    );

    let discipline = CockpitConfig::default().discipline;
    let mut previous = monotonic_seconds();
    let render_scheduler = FixedIntervalLoop::new(Duration::from_secs_f64(discipline.frame_interval()), MAX_CATCHUP_FRAMES);
    render_scheduler.run(&cancel, |frames| {
        if frames > 1 {
            tracing::warn!("render loop fell behind; collapsed {frames} missed frames");
        }
        let now = monotonic_seconds();
        let delta = now - previous;
        previous = now;

        let state = controller.tick(wall_seconds(), delta);
        println!("{}  {}  {}", state.timestamp_line, state.cpu_line, state.memory_line);
        for row in &state.process_rows {
            println!("  {row}");
        }
        println!("{}", state.status_line);
    });

    let _ = poller.join();
    Ok(ExitCode::Cancelled)
}

fn install_cancel_handler() -> CancelToken {
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    let _ = ctrlc::set_handler(move || {
        handler_token.cancel();
    });
    cancel
}
