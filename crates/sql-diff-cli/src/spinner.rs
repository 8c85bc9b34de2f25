//! Progress spinner shown while an AI request is in flight.

use std::future::Future;
use std::io::{self, IsTerminal};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

const TICK: Duration = Duration::from_millis(100);

const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", ""];

/// A ticking spinner on stderr, hidden when stderr is not a terminal.
#[must_use]
pub fn spinner(message: &str) -> ProgressBar {
    let bar = if io::stderr().is_terminal() {
        ProgressBar::new_spinner()
    } else {
        ProgressBar::hidden()
    };
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        bar.set_style(style.tick_strings(FRAMES));
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(TICK);
    bar
}

/// Awaits `future` behind a spinner labelled `message`, clearing it once
/// the future completes.
pub async fn with_spinner<F>(message: &str, future: F) -> F::Output
where
    F: Future + Send,
    F::Output: Send,
{
    let bar = spinner(message);
    let output = future.await;
    bar.finish_and_clear();
    output
}
