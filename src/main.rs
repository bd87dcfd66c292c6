mod actions;
mod app;
mod card;
mod clip;
mod config;
mod constants;
mod content;
mod display;
mod fetcher;
mod graphics;
mod graphql;
mod grid;
mod input;
mod player;
mod search;
mod theme;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::time::Instant;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use app::App;
use config::{Overrides, Prefs, SearchField, Settings};
use display::CliDisplayMode;
use input::handle_key_event;

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// GraphQL endpoint serving clip metadata (overrides prefs.toml)
  #[arg(long)]
  endpoint: Option<String>,

  /// Base URL that relative clip and thumbnail paths are resolved against
  #[arg(long)]
  media_origin: Option<String>,

  /// Clips requested per page
  #[arg(long)]
  page_size: Option<usize>,

  /// Clip field the search term is matched against
  #[arg(long, value_enum)]
  search_field: Option<SearchField>,

  /// Display mode: 'auto', 'direct', or 'ascii' (default: auto-detect)
  #[arg(short, long, default_value = "auto")]
  display_mode: CliDisplayMode,

  /// Print shell completions and exit
  #[arg(long, value_name = "SHELL")]
  completions: Option<Shell>,
}

impl Args {
  fn overrides(&self) -> Overrides {
    Overrides {
      endpoint: self.endpoint.clone(),
      media_origin: self.media_origin.clone(),
      page_size: self.page_size,
      search_field: self.search_field,
    }
  }
}

// --- Logging ---

/// Log to a daily-rotated file; the terminal belongs to the UI.
fn init_tracing() -> Option<WorkerGuard> {
  let dir = config::log_dir()?;
  if std::fs::create_dir_all(&dir).is_err() {
    return None;
  }
  let appender = tracing_appender::rolling::daily(dir, "clipterm.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("clipterm=info"));
  let _ = tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .try_init();
  Some(guard)
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(shell) = args.completions {
    let mut cmd = Args::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
    return Ok(());
  }

  let _guard = init_tracing();
  let prefs = Prefs::load();
  let display_mode = display::resolve_display_mode(args.display_mode);
  let settings = Settings::resolve(args.overrides(), &prefs, display_mode)?;
  info!(endpoint = %settings.endpoint, mode = display_mode.label(), "clipterm: starting");
  let app = App::new(settings, prefs)?;

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  let result = run(&mut terminal, app).await;
  ratatui::restore();
  result
}

async fn run(terminal: &mut DefaultTerminal, mut app: App) -> Result<()> {
  loop {
    app.tick(Instant::now()).await;
    app.check_pending().await?;

    terminal.draw(|frame| ui::ui(frame, &mut app))?;

    if event::poll(app.poll_timeout(Instant::now()))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
          handle_key_event(&mut app, key).await?;
        }
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  if let Err(e) = app.player.stop().await {
    warn!(err = %e, "clipterm: failed to stop player on exit");
  }
  info!("clipterm: exiting");
  Ok(())
}
