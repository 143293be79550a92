use std::io::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracker_core::{update, AppState, DayPlan, Msg, SaveStatus};
use tracker_logging::{tracker_error, tracker_info, tracker_warn};

use super::commands::{self, Command};
use super::config::{self, AppConfig, BackendConfig};
use super::effects::EffectRunner;
use super::{logging, persistence, ui};

/// How often save events are folded back into the state.
const TICK_INTERVAL: Duration = Duration::from_millis(75);
/// Upper bound for saves still running when the user quits.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

pub fn run_app() -> anyhow::Result<()> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(config::CONFIG_FILENAME));

    let (app_config, config_error) = match config::load_config(&config_path) {
        Ok(Some(loaded)) => (loaded, None),
        Ok(None) => (AppConfig::default(), None),
        Err(err) => (AppConfig::default(), Some(err)),
    };
    logging::initialize(app_config.log, app_config.verbose);
    if let Some(err) = config_error {
        tracker_warn!("{:#}; using defaults", err);
        eprintln!("Warning: {err:#}; using defaults");
    }
    tracker_info!("tracker_app starting with config {:?}", config_path);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(run_loop(app_config))
}

async fn run_loop(app_config: AppConfig) -> anyhow::Result<()> {
    let today = chrono::Local::now().date_naive().format("%Y-%m-%d").to_string();
    println!("Loading {today}...");
    let mut shell = Shell::start(&app_config, today).await?;
    shell.print_view();
    println!("Type `help` for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tick = tokio::time::interval(TICK_INTERVAL);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    prompt();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(err) => {
                        tracker_error!("Failed to read input: {}", err);
                        break;
                    }
                };
                if !shell.handle_line(&line).await {
                    break;
                }
                prompt();
            }
            _ = tick.tick() => shell.on_tick(),
        }
    }

    shell.finish().await;
    Ok(())
}

/// Owns the state and feeds it messages from input and the save coordinator.
struct Shell {
    state: AppState,
    runner: EffectRunner,
    shown_status: SaveStatus,
    backend: BackendConfig,
    date: String,
}

impl Shell {
    /// Loads the day and wires up saving. A failed load holds saves so the
    /// stored copy is not replaced by a blank plan.
    async fn start(app_config: &AppConfig, date: String) -> anyhow::Result<Self> {
        let runner = EffectRunner::new(app_config)?;
        let state = AppState::new(DayPlan::new(date.clone()));
        let mut shell = Self {
            shown_status: state.save_status(),
            state,
            runner,
            backend: app_config.backend.clone(),
            date,
        };
        match persistence::load_day_plan(&shell.backend, &shell.date).await {
            Ok(Some(plan)) => shell.dispatch(Msg::RestoreDay(plan)),
            Ok(None) => {}
            Err(err) => shell.dispatch(Msg::LoadFailed {
                message: err.to_string(),
            }),
        }
        Ok(shell)
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        self.runner.enqueue(effects);
    }

    /// Returns `false` when the user asked to quit.
    async fn handle_line(&mut self, line: &str) -> bool {
        match commands::parse(line) {
            Ok(Command::Update(msg)) => {
                self.dispatch(msg);
                if self.state.consume_dirty() {
                    self.print_view();
                } else {
                    println!("Nothing changed.");
                }
            }
            Ok(Command::Show) => self.print_view(),
            Ok(Command::Retry) => self.retry_load().await,
            Ok(Command::Help) => println!("{}", commands::HELP),
            Ok(Command::Quit) => return false,
            Ok(Command::Empty) => {}
            Err(err) => println!("{err}"),
        }
        true
    }

    async fn retry_load(&mut self) {
        if !self.state.saves_held() {
            println!("Today's plan is already loaded.");
            return;
        }
        match persistence::load_day_plan(&self.backend, &self.date).await {
            Ok(Some(plan)) => {
                println!("Loaded the stored plan; edits made since startup were discarded.");
                self.dispatch(Msg::RestoreDay(plan));
            }
            Ok(None) => self.dispatch(Msg::SavesResumed),
            Err(err) => {
                println!("Still cannot load today's plan: {err}");
                return;
            }
        }
        self.state.consume_dirty();
        self.print_view();
    }

    fn on_tick(&mut self) {
        for msg in self.runner.drain_messages() {
            self.dispatch(msg);
        }
        if self.state.consume_dirty() && self.state.save_status() != self.shown_status {
            self.print_status();
            prompt();
        }
    }

    async fn finish(&mut self) {
        if let Some(Err(err)) = self.runner.flush().await {
            tracker_warn!("Final save failed: {}", err);
        }
        if !self.runner.wait_idle(SHUTDOWN_GRACE).await {
            tracker_warn!("Saves still running after {:?}; exiting anyway", SHUTDOWN_GRACE);
        }
        for msg in self.runner.drain_messages() {
            self.dispatch(msg);
        }
        self.print_status();
        tracker_info!("tracker_app exiting with status {:?}", self.state.save_status());
    }

    fn print_view(&mut self) {
        let view = self.state.view();
        print!("{}", ui::render::render(&view));
        self.shown_status = view.save_status;
    }

    fn print_status(&mut self) {
        let view = self.state.view();
        println!();
        println!("{}", ui::render::status_line(&view));
        self.shown_status = view.save_status;
    }
}

fn prompt() {
    print!("{}", ui::constants::PROMPT);
    let _ = std::io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tracker_core::DAY_PLAN_TABLE;

    const DAY: &str = "2026-10-15";

    fn local_config(temp: &TempDir) -> AppConfig {
        AppConfig {
            save_delay_ms: 20,
            backend: BackendConfig::Local {
                dir: temp.path().to_path_buf(),
            },
            ..AppConfig::default()
        }
    }

    fn stored_file(temp: &TempDir) -> PathBuf {
        temp.path().join(DAY_PLAN_TABLE).join(format!("{DAY}.json"))
    }

    async fn settle(shell: &mut Shell) {
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(shell.runner.wait_idle(Duration::from_secs(5)).await);
        shell.on_tick();
    }

    #[tokio::test]
    async fn failed_load_keeps_the_stored_record_until_confirmed() {
        let temp = TempDir::new().unwrap();
        let path = stored_file(&temp);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ truncated").unwrap();

        let mut shell = Shell::start(&local_config(&temp), DAY.to_string())
            .await
            .unwrap();
        assert!(shell.state.saves_held());

        assert!(shell.handle_line("toggle lunch").await);
        settle(&mut shell).await;
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ truncated");
        assert_eq!(shell.state.save_status(), SaveStatus::Held);

        assert!(shell.handle_line("save").await);
        settle(&mut shell).await;
        let saved: DayPlan = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(&saved, shell.state.plan());
        assert_eq!(shell.state.save_status(), SaveStatus::Saved);
    }

    #[tokio::test]
    async fn stored_day_is_restored_without_saving() {
        let temp = TempDir::new().unwrap();
        let path = stored_file(&temp);
        let mut stored = DayPlan::new(DAY);
        stored.notes = "high protein".to_string();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, serde_json::to_string(&stored).unwrap()).unwrap();

        let mut shell = Shell::start(&local_config(&temp), DAY.to_string())
            .await
            .unwrap();
        assert_eq!(shell.state.plan(), &stored);
        assert_eq!(shell.state.save_status(), SaveStatus::Idle);

        settle(&mut shell).await;
        assert_eq!(shell.state.save_status(), SaveStatus::Idle);
    }
}
