use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

use super::styling::{bright_green, heading, pending};

const PHASES: [&str; 3] = ["groups", "projects", "merge requests"];

/// Spinner for the groups → projects → merge requests walk.
///
/// Each transition consumes the current phase, so phases can only advance
/// in order.
pub struct PhaseProgress {
    pb: ProgressBar,
    phase: usize,
}

impl PhaseProgress {
    pub fn start_phase_1() -> Self {
        eprintln!("{}", heading("Fetching"));
        Self::start(0)
    }

    pub fn finish_phase_1_start_phase_2(self, group_count: usize) -> Self {
        self.finish(group_count);
        Self::start(1)
    }

    pub fn finish_phase_2_start_phase_3(self, project_count: usize) -> Self {
        self.finish(project_count);
        Self::start(2)
    }

    pub fn finish_phase_3(self, merge_request_count: usize) {
        self.finish(merge_request_count);
        eprintln!();
    }

    fn start(phase: usize) -> Self {
        let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        pb.set_style(
            ProgressStyle::with_template("  {spinner:.cyan} {msg}")
                .unwrap()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏✓"),
        );
        pb.set_message(
            pending(format!(
                "[{}/{}] Fetching {}",
                phase + 1,
                PHASES.len(),
                PHASES[phase]
            ))
            .to_string(),
        );
        pb.enable_steady_tick(Duration::from_millis(80));

        Self { pb, phase }
    }

    fn finish(self, count: usize) {
        self.pb.finish_with_message(
            bright_green(format!(
                "[{}/{}] {count} {}",
                self.phase + 1,
                PHASES.len(),
                PHASES[self.phase]
            ))
            .to_string(),
        );
    }
}
