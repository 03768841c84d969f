use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    DisableBracketedPaste, EnableBracketedPaste, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use tracing::{Level, info, warn};

use keycoach::app::App;
use keycoach::config::Config;
use keycoach::event::{AppEvent, EventHandler};
use keycoach::oracle::http::HttpOracle;
use keycoach::oracle::local::LocalOracle;
use keycoach::oracle::{OracleJob, SentenceOracle};
use keycoach::session::field::EditAction;
use keycoach::store::json_store::JsonStore;
use keycoach::ui::components::keystroke_log::KeystrokeLog;
use keycoach::ui::components::summary_panel::SummaryPanel;
use keycoach::ui::components::typing_area::TypingArea;
use keycoach::ui::layout::{AppLayout, pack_hint_lines};
use keycoach::ui::line_input::{KeyCommand, map_key};
use keycoach::ui::theme::Theme;

#[derive(Parser)]
#[command(
    name = "keycoach",
    version,
    about = "Terminal typing coach that turns your slow and mistyped keys into the next sentence"
)]
struct Cli {
    #[arg(short, long, help = "Practice topic for generated sentences (max 30 chars)")]
    topic: Option<String>,

    #[arg(long, help = "Sentence oracle endpoint (overrides config)")]
    oracle_url: Option<String>,

    #[arg(long, help = "Use the bundled offline coach even if an endpoint is configured")]
    offline: bool,

    #[arg(long, help = "Log at debug level, including full keystroke logs")]
    debug: bool,

    #[arg(long, help = "Write the effective configuration to the config file and exit")]
    write_config: bool,
}

type Tui = Terminal<CrosstermBackend<io::Stdout>>;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_default();
    if let Some(url) = cli.oracle_url {
        config.oracle_url = Some(url);
    }
    config.validate();
    if cli.write_config {
        config.save().context("writing config file")?;
        println!("Wrote {}", Config::config_path().display());
        return Ok(());
    }

    let store = JsonStore::new().context("opening data directory")?;
    init_logging(store.base_dir(), cli.debug)?;

    let oracle = build_oracle(&config, cli.offline);
    let mut app = App::new(config, store);
    if let Some(topic) = cli.topic.as_deref() {
        app.set_topic(Some(topic));
    }
    if Theme::load(&app.config.theme).is_none() {
        warn!(
            theme = %app.config.theme,
            available = ?Theme::available_themes(),
            "unknown theme; using default"
        );
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let events = EventHandler::new(Duration::from_millis(100));

    let result = run_app(&mut terminal, &mut app, &events, &oracle);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

fn init_logging(data_dir: &Path, debug: bool) -> Result<()> {
    fs::create_dir_all(data_dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(data_dir.join("keycoach.log"))
        .context("opening log file")?;
    let level = if debug { Level::DEBUG } else { Level::INFO };
    // A second init (e.g. in a test harness) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(level)
        .try_init();
    Ok(())
}

fn build_oracle(config: &Config, offline: bool) -> Arc<dyn SentenceOracle> {
    match config.oracle_url.as_deref() {
        Some(url) if !offline => {
            info!(url, "using remote sentence oracle");
            Arc::new(HttpOracle::new(url, config.oracle_timeout()))
        }
        _ => {
            info!("using bundled offline coach");
            Arc::new(LocalOracle::new())
        }
    }
}

fn dispatch(job: OracleJob, oracle: &Arc<dyn SentenceOracle>, tx: &Sender<AppEvent>) {
    let oracle = Arc::clone(oracle);
    let tx = tx.clone();
    thread::spawn(move || {
        let outcome = job.run(oracle.as_ref());
        let _ = tx.send(AppEvent::OracleReply(outcome));
    });
}

fn run_app(
    terminal: &mut Tui,
    app: &mut App<JsonStore>,
    events: &EventHandler,
    oracle: &Arc<dyn SentenceOracle>,
) -> Result<()> {
    let tx = events.sender();
    loop {
        terminal.draw(|frame| render(frame, app))?;

        let job = match events.next()? {
            AppEvent::Key(key) => handle_key(app, key),
            AppEvent::Paste(text) => app.handle(&EditAction::Paste(text), Instant::now()),
            AppEvent::OracleReply(outcome) => {
                app.apply_oracle_outcome(outcome);
                app.take_queued_job()
            }
            AppEvent::Tick | AppEvent::Resize(_, _) => None,
        };
        if let Some(job) = job {
            dispatch(job, oracle, &tx);
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App<JsonStore>, key: KeyEvent) -> Option<OracleJob> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match map_key(key) {
        KeyCommand::Edit(action) => app.handle(&action, Instant::now()),
        KeyCommand::Reset => {
            app.reset_round();
            None
        }
        KeyCommand::Quit => {
            app.should_quit = true;
            None
        }
        KeyCommand::ToggleSymbols => {
            app.toggle_symbols();
            None
        }
        KeyCommand::ToggleNumbers => {
            app.toggle_numbers();
            None
        }
        KeyCommand::Unhandled => None,
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

fn render(frame: &mut ratatui::Frame, app: &App<JsonStore>) {
    let area = frame.area();
    let colors = &app.theme.colors;

    frame.render_widget(Block::default().style(Style::default().bg(colors.bg())), area);

    let layout = AppLayout::new(area);
    let state = app.controller.state();

    let topic = app
        .preferences
        .practice_topic
        .as_deref()
        .unwrap_or("any topic");
    let mut header_text = format!(
        " keycoach | {topic} | symbols {} | numbers {}",
        on_off(app.preferences.include_symbols),
        on_off(app.preferences.include_numbers)
    );
    if !layout.tier.show_sidebar()
        && let Some(last) = &app.last_summary
    {
        header_text.push_str(&format!(
            " | last: {} wpm {}% acc",
            last.words_per_minute, last.accuracy_percent
        ));
    }
    let header = Paragraph::new(Line::from(Span::styled(
        header_text,
        Style::default()
            .fg(colors.header_fg())
            .bg(colors.header_bg())
            .add_modifier(Modifier::BOLD),
    )))
    .style(Style::default().bg(colors.header_bg()));
    frame.render_widget(header, layout.header);

    let typing = TypingArea::new(app.controller.frame(), state.reference().direction(), &app.theme)
        .loading(app.is_loading());
    frame.render_widget(typing, layout.typing);

    if let Some(log_area) = layout.log {
        frame.render_widget(KeystrokeLog::new(state.keystroke_log(), &app.theme), log_area);
    }

    if let Some(sidebar_area) = layout.sidebar {
        let panel = SummaryPanel::new(
            app.controller.frame(),
            app.last_summary.as_ref(),
            &app.last_problems,
            app.last_note.as_deref(),
            &app.theme,
        );
        frame.render_widget(panel, sidebar_area);
    }

    let hints = [
        "[Esc] Quit",
        "[Enter] Restart",
        "[Ctrl+A] Select all",
        "[F2] Symbols",
        "[F3] Numbers",
    ];
    let hint_line = pack_hint_lines(&hints, layout.footer.width as usize)
        .into_iter()
        .next()
        .unwrap_or_default();
    let footer = Paragraph::new(Line::from(Span::styled(
        hint_line,
        Style::default().fg(colors.text_pending()),
    )));
    frame.render_widget(footer, layout.footer);
}
