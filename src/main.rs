use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use anyhow::Context;
use crossterm::terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pitchperfect::audio::{self, CpalInput};
use pitchperfect::config::{config_path, log_path, Config};
use pitchperfect::controller::Controller;
use pitchperfect::middle::UiState;
use pitchperfect::session::{EffectPlayer, Recorder};
use pitchperfect::shared::DisplayState;
use pitchperfect::tui;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let project_dir: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
    let config = Config::load(&project_dir).context("could not load config")?;
    init_logging(&log_path(&project_dir), &config.log.level)?;
    info!(project = %project_dir.display(), "pitchperfect starting");

    // leave a config with every default spelled out for the user to edit
    if !config_path(&project_dir).exists() {
        if let Err(e) = config.save(&project_dir) {
            warn!("could not write default config: {e}");
        }
    }

    match audio::describe_devices() {
        Ok((input_rate, output_rate)) => info!(input_rate, output_rate, "audio devices found"),
        Err(e) => warn!("{e:#}"),
    }
    let output = audio::open_output_or_offline().context("could not open audio output")?;
    let recorder = Recorder::new(CpalInput::new(), config.recorder_settings(&project_dir));
    let player = EffectPlayer::new(output, config.playback_settings());
    let mut controller = Controller::new(recorder, player);
    let mut ui = UiState::new(config.allow_pause);
    let mut display = DisplayState::default();

    terminal::enable_raw_mode()?;
    // Enable keyboard enhancement so key releases can be told apart from presses.
    // Falls back gracefully if the terminal doesn't support it.
    let _ = crossterm::execute!(
        std::io::stdout(),
        crossterm::event::PushKeyboardEnhancementFlags(
            crossterm::event::KeyboardEnhancementFlags::REPORT_EVENT_TYPES
        )
    );
    let _guard = RawModeGuard; // auto drops when out of scope

    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let tick_rate = std::time::Duration::from_millis(16); // ~60fps
    let blink_start = Instant::now();
    let mut tui_state = tui::mode::TuiState::default();

    loop {
        let blink_on = (blink_start.elapsed().as_millis() / 250) % 2 == 0;
        tui_state.sync(&display);

        term.draw(|frame| {
            tui::view::render(frame, frame.area(), &display, blink_on);
        })?;

        // keys first, then whatever the recorder and player have to say
        let mut events = tui::input::poll_input(tick_rate, &tui_state)?;
        events.extend(controller.poll());

        let mut quit = false;
        for event in events {
            quit |= controller.dispatch(&mut ui, &mut display, event);
        }
        if quit {
            break;
        }
    }

    term.clear()?;
    drop(term);
    controller.shutdown();
    info!("pitchperfect exiting");
    Ok(())
}

fn init_logging(path: &Path, level: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("could not create {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("could not open log file {}", path.display()))?;

    // RUST_LOG wins over the config file
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::execute!(
            std::io::stdout(),
            crossterm::event::PopKeyboardEnhancementFlags
        );
        let _ = terminal::disable_raw_mode();
    }
}
