use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

use crate::coordinator::SessionState;
use crate::progress::TaskOutcome;
use crate::ui::icons::{CHECK, CROSS, SPARKLE, WARN};
use crate::ui::truncate_str;

const MESSAGE_WIDTH: usize = 60;

/// Terminal progress bar for one verification, driven by [`SessionState`].
///
/// The bar shows the percentage from the current progress view and the
/// service's current step. While the task is celebrating, the message is
/// replaced by a completion banner until the completion signal fires.
#[derive(Clone)]
pub struct VerifyUI {
    bar: ProgressBar,
}

impl VerifyUI {
    pub fn new(label: &str) -> Self {
        let bar_style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} {spinner} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");

        let bar = ProgressBar::new(100);
        bar.set_style(bar_style);
        bar.set_prefix(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// A bar that draws nothing, for machine-readable output.
    pub fn hidden() -> Self {
        let bar = ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::hidden());
        Self { bar }
    }

    pub fn render(&self, state: &SessionState) {
        if let Some(ref progress) = state.progress {
            self.bar.set_position(progress.percentage().round() as u64);
            if !state.celebrating {
                self.bar
                    .set_message(truncate_str(progress.message(), MESSAGE_WIDTH));
            }
        }
        if state.celebrating {
            self.bar.set_message(format!(
                "{}{}",
                SPARKLE,
                style("Verification complete!").green().bold()
            ));
        }
    }

    /// Finish the bar according to how the task ended.
    pub fn finish(&self, outcome: Option<TaskOutcome>) {
        match outcome {
            Some(TaskOutcome::Completed) => {
                self.bar.set_position(100);
                self.bar
                    .finish_with_message(format!("{}{}", CHECK, style("done").green()));
            }
            Some(TaskOutcome::Error) => self
                .bar
                .abandon_with_message(format!("{}{}", CROSS, style("service reported an error").red())),
            Some(TaskOutcome::Disconnected) => self.bar.abandon_with_message(format!(
                "{}{}",
                WARN,
                style("progress stream disconnected").yellow()
            )),
            None => self.bar.finish_and_clear(),
        }
    }

    pub fn fail(&self, message: &str) {
        self.bar
            .abandon_with_message(format!("{}{}", CROSS, style(message).red()));
    }

    pub fn cancelled(&self) {
        self.bar
            .abandon_with_message(format!("{}{}", WARN, style("cancelled").yellow()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::ProgressView;

    #[test]
    fn test_hidden_bar_tracks_position() {
        let ui = VerifyUI::hidden();
        let state = SessionState {
            loading: true,
            progress: Some(ProgressView::Placeholder {
                percentage: 5.0,
                message: "Uploading file...".into(),
            }),
            ..Default::default()
        };
        ui.render(&state);
        assert_eq!(ui.bar.position(), 5);
        assert_eq!(ui.bar.message(), "Uploading file...");
    }

    #[test]
    fn test_celebration_replaces_message() {
        let ui = VerifyUI::hidden();
        let state = SessionState {
            celebrating: true,
            ..Default::default()
        };
        ui.render(&state);
        assert!(ui.bar.message().contains("Verification complete!"));
    }
}
