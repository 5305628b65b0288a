mod app;
mod theme;
mod ui;

use app::App;
use clap::Parser;
use crossterm::{
    event::EventStream,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use lineboard::{plain::PlainObserver, transport::NetTransport, WatchObserver};
use lineboard_core::config::{
    parse_bool_flag, parse_server_url, SyncConfig, DEFAULT_POLL_SECS, DEFAULT_RECONNECT_SECS,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SERVER,
};
use lineboard_core::sync::{BoardView, SyncClient};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    env,
    error::Error,
    fs::{File, OpenOptions},
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{
    fmt::writer::{BoxMakeWriter, MakeWriterExt},
    EnvFilter,
};

const LOG_FILE_NAME: &str = "lineboard.log";
const REDRAW_TICK: Duration = Duration::from_secs(1);

type BoardTerminal = Terminal<CrosstermBackend<io::Stdout>>;

#[derive(Parser, Debug)]
#[command(name = "lineboard", about = "Live transit line status board")]
struct Args {
    /// Base URL of the status server.
    #[arg(long)]
    server: Option<String>,
    #[arg(long)]
    poll_secs: Option<u64>,
    #[arg(long)]
    reconnect_secs: Option<u64>,
    #[arg(long)]
    request_timeout_secs: Option<u64>,
    /// Skip the push channel and poll `/update` only.
    #[arg(long)]
    no_push: bool,
    #[arg(long)]
    log_dir: Option<String>,
    /// Print one line per change instead of drawing the board.
    #[arg(long)]
    plain: bool,
}

#[derive(Debug)]
struct RuntimeConfig {
    sync: SyncConfig,
    log_dir: Option<PathBuf>,
    log_stdout: bool,
    plain: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config = load_config(args)?;
    init_logging(&config);
    config.sync.validate()?;

    let transport = NetTransport::new(&config.sync)?;
    info!(
        event = "board_start",
        server = %config.sync.server,
        push_url = transport.push_url().map(|url| url.as_str()).unwrap_or("-"),
        update_url = %transport.update_url(),
        plain = config.plain
    );

    if config.plain {
        let mut client = SyncClient::new(
            config.sync.clone(),
            transport,
            PlainObserver::new(io::stdout()),
        );
        tokio::select! {
            _ = client.run() => {}
            res = tokio::signal::ctrl_c() => res?,
        }
        info!(event = "board_stop");
        return Ok(());
    }

    let (view_tx, view_rx) = watch::channel(BoardView::default());
    let mut client = SyncClient::new(config.sync.clone(), transport, WatchObserver::new(view_tx));
    let sync_task = tokio::spawn(async move { client.run().await });

    let mut app = App::new(config.sync.server.to_string());
    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut app, view_rx).await;
    restore_terminal(&mut terminal)?;
    sync_task.abort();
    info!(event = "board_stop");
    result?;
    Ok(())
}

async fn run_app(
    terminal: &mut BoardTerminal,
    app: &mut App,
    mut view_rx: watch::Receiver<BoardView>,
) -> io::Result<()> {
    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(REDRAW_TICK);
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;
        tokio::select! {
            changed = view_rx.changed() => {
                if changed.is_err() {
                    warn!(event = "sync_task_gone");
                    return Ok(());
                }
                let view = view_rx.borrow_and_update().clone();
                app.apply_view(view);
            }
            event = events.next() => match event {
                Some(Ok(event)) => {
                    if app.handle_input(event) {
                        return Ok(());
                    }
                }
                Some(Err(err)) => return Err(err),
                None => return Ok(()),
            },
            _ = ticker.tick() => {}
        }
    }
}

fn setup_terminal() -> io::Result<BoardTerminal> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut BoardTerminal) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn load_config(args: Args) -> Result<RuntimeConfig, Box<dyn Error>> {
    let server = resolve_text(args.server, env_value("LINEBOARD_SERVER"))
        .unwrap_or_else(|| DEFAULT_SERVER.to_string());
    let mut sync = SyncConfig::new(parse_server_url(&server)?);
    sync.poll_interval = Duration::from_secs(resolve_secs(
        args.poll_secs,
        env_value("LINEBOARD_POLL_SECS"),
        DEFAULT_POLL_SECS,
    ));
    sync.reconnect_delay = Duration::from_secs(resolve_secs(
        args.reconnect_secs,
        env_value("LINEBOARD_RECONNECT_SECS"),
        DEFAULT_RECONNECT_SECS,
    ));
    sync.request_timeout = Duration::from_secs(resolve_secs(
        args.request_timeout_secs,
        env_value("LINEBOARD_REQUEST_TIMEOUT_SECS"),
        DEFAULT_REQUEST_TIMEOUT_SECS,
    ));
    sync.push_enabled = resolve_push_enabled(args.no_push, env_value("LINEBOARD_PUSH_ENABLED"));

    Ok(RuntimeConfig {
        sync,
        log_dir: resolve_text(args.log_dir, env_value("LINEBOARD_LOG_DIR")).map(PathBuf::from),
        log_stdout: resolve_log_stdout(env_value("LINEBOARD_LOG_STDOUT"), args.plain),
        plain: args.plain,
    })
}

fn env_value(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn resolve_text(flag: Option<String>, env_value: Option<String>) -> Option<String> {
    flag.into_iter()
        .chain(env_value)
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

fn resolve_secs(flag: Option<u64>, env_value: Option<String>, default: u64) -> u64 {
    if let Some(value) = flag {
        return value;
    }
    env_value
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn resolve_push_enabled(no_push: bool, env_value: Option<String>) -> bool {
    if no_push {
        return false;
    }
    env_value
        .and_then(|value| parse_bool_flag(&value))
        .unwrap_or(true)
}

/// Plain mode prints the board on stdout, so logs never go there.
fn resolve_log_stdout(env_value: Option<String>, plain: bool) -> bool {
    !plain
        && env_value
            .and_then(|value| parse_bool_flag(&value))
            .unwrap_or(false)
}

fn init_logging(config: &RuntimeConfig) {
    let level = env_value("LINEBOARD_LOG_LEVEL")
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let file = match config.log_dir.as_deref().map(open_log_file).transpose() {
        Ok(file) => file,
        Err(err) => {
            eprintln!("log_file_error: {err}");
            None
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(file.is_none() && config.log_stdout)
        .with_writer(log_writer(file, config.log_stdout))
        .try_init();
}

fn open_log_file(dir: &Path) -> io::Result<File> {
    std::fs::create_dir_all(dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE_NAME))
}

/// The TUI owns the terminal, so logs default to a sink.
fn log_writer(file: Option<File>, stdout: bool) -> BoxMakeWriter {
    match (file.map(Arc::new), stdout) {
        (Some(file), true) => BoxMakeWriter::new(file.and(io::stdout)),
        (Some(file), false) => BoxMakeWriter::new(file),
        (None, true) => BoxMakeWriter::new(io::stdout),
        (None, false) => BoxMakeWriter::new(io::sink),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tracing_subscriber::fmt::MakeWriter;

    #[test]
    fn flag_beats_env_and_blank_values_fall_through() {
        assert_eq!(
            resolve_text(Some("http://a".to_string()), Some("http://b".to_string())),
            Some("http://a".to_string())
        );
        assert_eq!(
            resolve_text(Some("  ".to_string()), Some("http://b".to_string())),
            Some("http://b".to_string())
        );
        assert_eq!(resolve_text(None, Some(String::new())), None);
    }

    #[test]
    fn seconds_fall_back_to_default_on_garbage() {
        assert_eq!(resolve_secs(Some(3), Some("7".to_string()), 10), 3);
        assert_eq!(resolve_secs(None, Some(" 7 ".to_string()), 10), 7);
        assert_eq!(resolve_secs(None, Some("soon".to_string()), 10), 10);
        assert_eq!(resolve_secs(None, None, 10), 10);
    }

    #[test]
    fn no_push_flag_overrides_env() {
        assert!(!resolve_push_enabled(true, Some("1".to_string())));
        assert!(!resolve_push_enabled(false, Some("off".to_string())));
        assert!(resolve_push_enabled(false, Some("maybe".to_string())));
        assert!(resolve_push_enabled(false, None));
    }

    #[test]
    fn plain_mode_never_logs_to_stdout() {
        assert!(resolve_log_stdout(Some("yes".to_string()), false));
        assert!(!resolve_log_stdout(Some("yes".to_string()), true));
        assert!(!resolve_log_stdout(Some("nope".to_string()), false));
        assert!(!resolve_log_stdout(None, false));
    }

    #[test]
    fn log_file_is_created_and_appended() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        for line in ["first\n", "second\n"] {
            let file = open_log_file(&log_dir).unwrap();
            let make = log_writer(Some(file), false);
            make.make_writer().write_all(line.as_bytes()).unwrap();
        }
        let written = std::fs::read_to_string(log_dir.join(LOG_FILE_NAME)).unwrap();
        assert_eq!(written, "first\nsecond\n");
    }

    #[test]
    fn cli_flags_parse() {
        let args = Args::parse_from([
            "lineboard",
            "--server",
            "https://status.example.net",
            "--poll-secs",
            "5",
            "--no-push",
            "--plain",
        ]);
        assert_eq!(args.server.as_deref(), Some("https://status.example.net"));
        assert_eq!(args.poll_secs, Some(5));
        assert!(args.no_push);
        assert!(args.plain);
        assert!(args.log_dir.is_none());
    }
}
