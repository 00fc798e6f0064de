use std::sync::OnceLock;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::ui;

/// A stage progress bar; a no-op when progress display is off.
pub struct Progress {
    bar: Option<ProgressBar>,
}

static MULTI_PROGRESS: OnceLock<MultiProgress> = OnceLock::new();

fn multi_progress() -> &'static MultiProgress {
    MULTI_PROGRESS.get_or_init(|| MultiProgress::with_draw_target(ProgressDrawTarget::stderr()))
}

fn bar_template() -> &'static str {
    match ui::prefs().term_width {
        Some(cols) if cols >= 110 => "{prefix:>9.bold} {bar:40.cyan/blue} {pos}/{len} {msg}",
        Some(cols) if cols >= 80 => "{prefix:>9.bold} {wide_bar:.cyan/blue} {pos}/{len} {msg}",
        _ => "{prefix:>9.bold} {wide_bar:.cyan/blue} {percent}% {msg}",
    }
}

impl Progress {
    /// A disabled bar, for callers that do not report progress.
    #[must_use]
    pub const fn hidden() -> Self {
        Self { bar: None }
    }

    /// A bar over `total` units of one pipeline stage (`map`, `check`, ...).
    #[must_use]
    pub fn stage(stage: &'static str, total: u64) -> Self {
        if !ui::prefs().progress || total == 0 {
            return Self::hidden();
        }

        let bar = multi_progress().add(ProgressBar::new(total));
        bar.set_style(
            ProgressStyle::with_template(bar_template())
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_prefix(stage);
        Self { bar: Some(bar) }
    }

    pub fn set_message(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(message.to_string());
        }
    }

    pub fn inc(&self, delta: u64) {
        if let Some(bar) = &self.bar {
            bar.inc(delta);
        }
    }

    pub fn finish_ok(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message(message.to_string());
        }
    }

    pub fn finish_err(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.abandon_with_message(message.to_string());
        }
    }
}
