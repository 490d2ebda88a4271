// file: src/utils/logging.rs
// description: tracing subscriber setup and coloured console lines for backup results

use crate::sync::{FilePlan, PassStats, PullAction, PushAction};
use colored::*;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// `RUST_LOG` wins over the verbosity flag when set.
pub fn init_logger(colored_output: bool, verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(verbose)
        .with_line_number(verbose)
        .compact()
        .with_ansi(colored_output);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Nothing to do, or done cleanly.
    Clean,
    /// A write is due on the next pass.
    Pending,
    Warning,
    Failed,
}

impl Status {
    fn marker(self) -> ColoredString {
        match self {
            Self::Clean => "✓".green().bold(),
            Self::Pending => "→".blue().bold(),
            Self::Warning => "⚠".yellow().bold(),
            Self::Failed => "✗".red().bold(),
        }
    }

    fn paint(self, msg: &str) -> ColoredString {
        match self {
            Self::Clean => msg.green(),
            Self::Pending => msg.normal(),
            Self::Warning => msg.yellow(),
            Self::Failed => msg.red(),
        }
    }
}

pub fn status_line(status: Status, msg: &str) -> String {
    format!("{} {}", status.marker(), status.paint(msg))
}

pub fn plan_status(plan: &FilePlan) -> Status {
    match plan {
        FilePlan::LocalMissing { .. } => Status::Warning,
        FilePlan::Planned { pull, push, .. }
            if *pull == PullAction::Overwrite || *push != PushAction::Unchanged =>
        {
            Status::Pending
        }
        FilePlan::Planned { .. } => Status::Clean,
    }
}

pub fn plan_line(plan: &FilePlan) -> String {
    let msg = match plan {
        FilePlan::LocalMissing { local_path } => format!("{}: missing locally, skipped", local_path),
        FilePlan::Planned {
            remote_key,
            pull,
            push,
        } => format!("{}: pull = {}, push = {}", remote_key, pull, push),
    };
    status_line(plan_status(plan), &msg)
}

pub fn pass_summary(stats: &PassStats) -> String {
    let status = if stats.has_failures() {
        Status::Warning
    } else {
        Status::Clean
    };
    status_line(status, &format!("{} pass(es), {}", stats.passes, stats))
}

pub fn failure_line(context: &str, err: &dyn std::fmt::Display) -> String {
    status_line(Status::Failed, &format!("{}: {}", context, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::FileOutcome;

    fn planned(pull: PullAction, push: PushAction) -> FilePlan {
        FilePlan::Planned {
            remote_key: "notes.txt".to_string(),
            pull,
            push,
        }
    }

    #[test]
    fn test_plan_status() {
        assert_eq!(
            plan_status(&planned(PullAction::UpToDate, PushAction::Unchanged)),
            Status::Clean
        );
        assert_eq!(
            plan_status(&planned(PullAction::Overwrite, PushAction::Unchanged)),
            Status::Pending
        );
        assert_eq!(
            plan_status(&planned(PullAction::RemoteAbsent, PushAction::Create)),
            Status::Pending
        );
        assert_eq!(
            plan_status(&FilePlan::LocalMissing {
                local_path: "/data/gone.txt".to_string()
            }),
            Status::Warning
        );
    }

    #[test]
    fn test_plan_line_names_the_file() {
        let line = plan_line(&FilePlan::LocalMissing {
            local_path: "/data/gone.txt".to_string(),
        });
        assert!(line.contains("/data/gone.txt: missing locally, skipped"));
    }

    #[test]
    fn test_pass_summary_counts_passes() {
        let mut stats = PassStats {
            passes: 2,
            files_checked: 1,
            ..PassStats::default()
        };
        stats.record(&FileOutcome::Failed("boom".to_string()));

        let line = pass_summary(&stats);
        assert!(line.contains("2 pass(es)"));
        assert!(line.contains("1 failed"));
    }

    #[test]
    fn test_failure_line() {
        let line = failure_line("Backup process terminated", &"Bad credentials");
        assert!(line.contains("Backup process terminated: Bad credentials"));
    }
}
