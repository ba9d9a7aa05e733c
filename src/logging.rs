// Terminal diagnostics. Everything here writes to stderr; stdout is reserved
// for the response so it can be piped.
//
// - `init` installs the tracing subscriber (filter from `WEBAPI_LOG`).
// - `status` / `report_error` print the user-facing progress and error lines.
// - `Spinner` shows activity while a remote call is in flight.

use std::io::{self, Write};
use std::time::Duration;

use crossterm::style::Stylize;
use crossterm::tty::IsTty;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

pub const ENV_LOG: &str = "WEBAPI_LOG";
const DEFAULT_FILTER: &str = "error";

/// Install the global tracing subscriber. Safe to call more than once.
pub fn init() {
    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(use_color())
        .with_target(false)
        .try_init();
}

fn use_color() -> bool {
    std::env::var_os("NO_COLOR").is_none() && io::stderr().is_tty()
}

/// Print a progress line such as `Initializing Gemini client...`.
pub fn status(message: &str) {
    if use_color() {
        eprintln!("{}", message.dim());
    } else {
        eprintln!("{}", message);
    }
}

/// Print `prefix: message`, and the hint on its own line if there is one.
pub fn report_error(prefix: &str, message: &str, hint: Option<&str>) {
    let mut err = io::stderr().lock();
    let _ = if use_color() {
        writeln!(err, "{}: {}", prefix.red().bold(), message)
    } else {
        writeln!(err, "{}: {}", prefix, message)
    };
    if let Some(hint) = hint {
        let _ = writeln!(err, "{}", hint);
    }
}

/// Spinner on stderr. Invisible when stderr is not a terminal.
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn start(message: impl Into<String>) -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} ({elapsed})") {
            bar.set_style(style);
        }
        bar.set_message(message.into());
        bar.enable_steady_tick(Duration::from_millis(100));
        Spinner { bar }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}
