use canon_dupes::{CompareOutcome, ScanResult};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Terminal progress for the three session phases.
///
/// - Scan phases: spinner (total files unknown upfront)
/// - Compare phase: progress bar (query file count known from the scan)
pub struct CliReporter {
    bar: Option<ProgressBar>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self { bar: None }
    }

    fn set_bar(&mut self, pb: ProgressBar) {
        if let Some(old) = self.bar.replace(pb) {
            old.finish_and_clear();
        }
    }

    fn finish_bar(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }

    pub fn on_scan_start(&mut self, label: &str) {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars(TICK_CHARS));
        }
        pb.set_message(format!("Scanning {}...", label));
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    pub fn on_scan_progress(&self, label: &str, checked: u64) {
        if let Some(pb) = self.bar.as_ref() {
            pb.set_message(format!("Scanning {}... {} files checked", label, checked));
        }
    }

    pub fn on_scan_complete(&mut self, label: &str, result: &ScanResult, duration: Duration) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m {} scan complete: {} of {} files kept, {} errors in {:.2}s",
            label,
            result.len(),
            result.counters.checked_count,
            result.error_count(),
            duration.as_secs_f64()
        );
    }

    pub fn on_compare_start(&mut self, total: usize) {
        let pb = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "  {spinner:.cyan} Comparing [{bar:30.cyan/dim}] {pos}/{len} files ({eta} remaining)",
        ) {
            pb.set_style(style.progress_chars("━╸─").tick_chars(TICK_CHARS));
        }
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    pub fn on_compare_progress(&self, compared: u64) {
        if let Some(pb) = self.bar.as_ref() {
            pb.set_position(compared);
        }
    }

    pub fn on_compare_complete(&mut self, outcome: &CompareOutcome, duration: Duration) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Compare complete: {} duplicates, {} unique in {:.2}s",
            outcome.duplicate_count(),
            outcome.unique.len(),
            duration.as_secs_f64()
        );
    }
}
