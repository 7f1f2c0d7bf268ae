use std::{fs::File, io::stdout, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{error, info};
use ratatui::{Terminal, backend::CrosstermBackend};
use simplelog::{Config, LevelFilter, WriteLogger};

use bookchat::chat::check_health;
use bookchat::event_source::TerminalEventSource;
use bookchat::page::Page;
use bookchat::panic_handler;
use bookchat::settings::{self, ChatConfig, Overrides};
use bookchat::{App, run_app_with_event_source};

const DEMO_PAGE: &str = include_str!("../demos/robot_dynamics.md");

/// Terminal course-book reader with a floating assistant chat
#[derive(Parser, Debug)]
#[command(name = "bookchat")]
#[command(version)]
struct Args {
    /// Markdown or plain-text document to open (a demo page when omitted)
    document: Option<PathBuf>,

    /// Chat endpoint URL
    #[arg(long)]
    endpoint: Option<String>,

    /// API key sent with every chat request
    #[arg(long)]
    api_key: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds to wait for a chat reply
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Quiet period after a selection before it is sent
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Log level written to bookchat.log
    #[arg(long, default_value = "debug")]
    log_level: LevelFilter,

    /// Probe the backend health route and exit
    #[arg(long)]
    check: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            endpoint_url: self.endpoint.clone(),
            api_key: self.api_key.clone(),
            request_timeout_secs: self.timeout_secs,
            debounce_ms: self.debounce_ms,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(err) => {
            error!("Application error: {err:?}");
            eprintln!("{err:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    WriteLogger::init(
        args.log_level,
        Config::default(),
        File::create("bookchat.log").context("Failed to create bookchat.log")?,
    )?;
    info!("Starting bookchat");

    let config = settings::resolve(args.config.as_deref(), &args.overrides())?;

    if args.check {
        return Ok(health_check(&config));
    }

    let page = match &args.document {
        Some(path) => Page::load(path)?,
        None => Page::from_markdown("Demo", DEMO_PAGE),
    };
    let mut app = App::new(page, config)?;

    panic_handler::initialize_panic_handler();

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app_with_event_source(&mut terminal, &mut app, &mut TerminalEventSource);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    // cancels any request still in flight
    drop(app);

    res?;
    info!("Shutting down bookchat");
    Ok(ExitCode::SUCCESS)
}

fn health_check(config: &ChatConfig) -> ExitCode {
    match check_health(&config.endpoint_url, config.request_timeout) {
        Ok(status) => {
            info!("Health check passed: {status}");
            println!("{status}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("Health check failed: {err:?}");
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
