#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the `traffic_link` binary.
//!
//! [`init_logger`] installs `pretty_env_logger` behind
//! `indicatif-log-bridge`, and [`IndicatifProgress`] adapts `indicatif`
//! bars to the linkage crate's [`ProgressCallback`]. Every bar must be
//! added to the [`MultiProgress`] returned by [`init_logger`] so log lines
//! are printed above the bars instead of through them.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use traffic_link_linkage_models::progress::ProgressCallback;

pub use indicatif::{MultiProgress, ProgressDrawTarget};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "RUST_LOG";

/// Filter used when [`LOG_ENV`] is unset.
const DEFAULT_FILTER: &str = "info";

/// What a bar counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarKind {
    /// Pipeline stages; the length is known when the bar is created.
    Steps,
    /// Records of one stage; spins until a total is reported.
    Records,
}

impl BarKind {
    fn style(self) -> ProgressStyle {
        let template = match self {
            Self::Steps => "{msg:40} [{bar:30.green/black}] {pos}/{len} {elapsed_precise}",
            Self::Records => "  {msg:38} [{bar:30.blue/black}] {human_pos}/{human_len} ({eta})",
        };
        ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ")
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("  {spinner:.blue} {msg} {elapsed}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// A [`ProgressCallback`] drawn as an `indicatif` bar.
pub struct IndicatifProgress {
    bar: ProgressBar,
    kind: BarKind,
}

impl IndicatifProgress {
    /// Adds a bar of `kind` to `multi`.
    ///
    /// A [`BarKind::Records`] bar spins until
    /// [`ProgressCallback::set_total`] gives it a length; `total` is
    /// ignored for it.
    #[must_use]
    pub fn new(multi: &MultiProgress, kind: BarKind, message: &str, total: u64) -> Self {
        let bar = match kind {
            BarKind::Steps => {
                let bar = multi.add(ProgressBar::new(total));
                bar.set_style(kind.style());
                bar
            }
            BarKind::Records => {
                let bar = multi.add(ProgressBar::new_spinner());
                bar.set_style(spinner_style());
                bar.enable_steady_tick(Duration::from_millis(120));
                bar
            }
        };
        bar.set_message(message.to_string());

        Self { bar, kind }
    }

    /// A shared bar over pipeline stages.
    #[must_use]
    pub fn steps_bar(multi: &MultiProgress, message: &str, total: u64) -> Arc<dyn ProgressCallback> {
        Arc::new(Self::new(multi, BarKind::Steps, message, total))
    }

    /// A shared bar over the records of one stage.
    #[must_use]
    pub fn records_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        Arc::new(Self::new(multi, BarKind::Records, message, 0))
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Current length, if known.
    #[must_use]
    pub fn length(&self) -> Option<u64> {
        self.bar.length()
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        if self.kind == BarKind::Records {
            self.bar.disable_steady_tick();
        }
        self.bar.set_style(self.kind.style());
        self.bar.set_length(total);
        self.bar.reset();
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Installs the global logger and returns the [`MultiProgress`] it writes
/// through.
///
/// The filter is read from [`LOG_ENV`] and defaults to `info`. Calling this
/// again keeps the first logger.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let filter = std::env::var(LOG_ENV).unwrap_or_else(|_| DEFAULT_FILTER.to_string());

    let logger = pretty_env_logger::formatted_builder()
        .parse_filters(&filter)
        .build();
    let max_level = logger.filter();

    let multi = MultiProgress::new();
    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_ok()
    {
        log::set_max_level(max_level);
    }

    multi
}
