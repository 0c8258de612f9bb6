use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

pub(crate) struct ProgressTracker {
    progress_bar: ProgressBar,
}

impl ProgressTracker {
    pub(crate) fn new(len: usize, visible: bool) -> Self {
        if !visible {
            return Self {
                progress_bar: ProgressBar::hidden(),
            };
        }

        let progress_bar = ProgressBar::new(len as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec} {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
        progress_bar.set_style(style);

        Self { progress_bar }
    }

    /// Log the file about to be processed without tearing the bar.
    pub(crate) fn start(&self, input: &Path, output: &Path) {
        self.progress_bar.suspend(|| {
            info!("Processing {} -> {}", input.display(), output.display());
        });
    }

    pub(crate) fn finish_one(&self) {
        self.progress_bar.inc(1);
    }

    pub(crate) fn finish(&self) {
        self.progress_bar.finish_and_clear();
    }
}
