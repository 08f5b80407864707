use crate::ScriptLog;

use super::launcher::ProcessOutput;

#[cfg(doc)]
use crate::ScriptRunner;

/// The privilege a script was launched with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Privilege {
    /// The script was launched as the current user.
    Normal,

    /// The script was launched through the elevation strategy.
    Elevated,
}

/// The terminal classification of one run attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The script ran to completion and reported an exit status.
    Success,

    /// The script was unreadable and the elevation probe was denied;
    /// the script itself was never run.
    ElevationDenied,

    /// There is no file at the script path; nothing was spawned.
    ScriptNotFound,

    /// The script was unreadable and no elevation strategy was
    /// configured, so escalation could not even be attempted.
    ScriptUnreadable,

    /// The process could not be spawned, or its streams could not be
    /// captured. The report's diagnostic holds the fault text.
    LaunchFailed,

    /// The script outlived its deadline and was terminated.
    TimedOut,
}

/// The immutable record of one run, produced once per invocation of
/// [`ScriptRunner::run`].
///
/// Reports are plain values: the core hands them to whatever
/// presentation layer the host supplies and never displays anything
/// itself. Two runs of an unchanged, side-effect-free script produce
/// equal reports.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExecutionReport {
    /// The terminal classification of this run.
    pub outcome: Outcome,

    /// The exit code reported by the process; absent if the process
    /// never launched, died to a signal, or was terminated.
    pub exit_code: Option<i32>,

    /// The lines the script printed to `stdout`, in emission order.
    pub stdout_lines: Vec<String>,

    /// The lines the script printed to `stderr`, in emission order,
    /// kept separate from stdout.
    pub stderr_lines: Vec<String>,

    /// Whether the run went through the elevation strategy. Only ever
    /// true after a capability probe succeeded.
    pub elevated: bool,

    /// A human-readable description of the fault, for failed outcomes.
    pub diagnostic: Option<String>,
}

impl ExecutionReport {
    /// A report for a run that ended before any script process spawned.
    pub(crate) fn aborted(outcome: Outcome) -> Self {
        Self {
            outcome,
            exit_code: None,
            stdout_lines: Vec::new(),
            stderr_lines: Vec::new(),
            elevated: false,
            diagnostic: None,
        }
    }

    /// A report for a run that faulted, preserving the fault text.
    pub(crate) fn fault(outcome: Outcome, privilege: Privilege, diagnostic: String) -> Self {
        Self {
            outcome,
            exit_code: None,
            stdout_lines: Vec::new(),
            stderr_lines: Vec::new(),
            elevated: privilege == Privilege::Elevated,
            diagnostic: Some(diagnostic),
        }
    }

    /// A report for a run whose process launched and was captured.
    pub(crate) fn captured(privilege: Privilege, output: ProcessOutput) -> Self {
        let outcome = if output.timed_out {
            Outcome::TimedOut
        } else {
            Outcome::Success
        };
        Self {
            outcome,
            exit_code: output.exit_code,
            stdout_lines: output.stdout_lines,
            stderr_lines: output.stderr_lines,
            elevated: privilege == Privilege::Elevated,
            diagnostic: None,
        }
    }

    /// All captured lines, tagged with their stream of origin.
    ///
    /// The stdout block always comes first, regardless of how the
    /// script interleaved its writes.
    pub fn tagged_lines(&self) -> Vec<ScriptLog> {
        self.stdout_lines
            .iter()
            .cloned()
            .map(ScriptLog::Stdout)
            .chain(self.stderr_lines.iter().cloned().map(ScriptLog::Stderr))
            .collect()
    }

    /// Renders the captured output as a single displayable text.
    ///
    /// stdout lines appear verbatim, then stderr lines prefixed with
    /// `[ERROR]` (or `[ROOT ERROR]` for an elevated run) so a merged
    /// view still labels each line's origin.
    pub fn render(&self) -> String {
        let mut rendered = String::new();
        for line in &self.stdout_lines {
            rendered.push_str(line);
            rendered.push('\n');
        }
        let label = if self.elevated {
            "[ROOT ERROR]"
        } else {
            "[ERROR]"
        };
        for line in &self.stderr_lines {
            rendered.push_str(label);
            rendered.push(' ');
            rendered.push_str(line);
            rendered.push('\n');
        }
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(stdout: &[&str], stderr: &[&str], elevated: bool) -> ExecutionReport {
        ExecutionReport {
            outcome: Outcome::Success,
            exit_code: Some(0),
            stdout_lines: stdout.iter().map(|line| line.to_string()).collect(),
            stderr_lines: stderr.iter().map(|line| line.to_string()).collect(),
            elevated,
            diagnostic: None,
        }
    }

    #[test]
    fn render_keeps_stdout_ahead_of_stderr() {
        let rendered = report(&["one", "two"], &["oops"], false).render();
        assert_eq!(rendered, "one\ntwo\n[ERROR] oops\n");
    }

    #[test]
    fn render_labels_elevated_errors_as_root() {
        let rendered = report(&[], &["denied"], true).render();
        assert_eq!(rendered, "[ROOT ERROR] denied\n");
    }

    #[test]
    fn tagged_lines_places_the_stdout_block_first() {
        let tagged = report(&["a"], &["b", "c"], false).tagged_lines();
        assert_eq!(
            tagged,
            vec![
                ScriptLog::Stdout("a".to_string()),
                ScriptLog::Stderr("b".to_string()),
                ScriptLog::Stderr("c".to_string()),
            ]
        );
    }

    #[test]
    fn timed_out_capture_is_classified_as_such() {
        let output = ProcessOutput {
            exit_code: None,
            stdout_lines: vec!["partial".to_string()],
            stderr_lines: Vec::new(),
            timed_out: true,
        };
        let report = ExecutionReport::captured(Privilege::Normal, output);

        assert_eq!(report.outcome, Outcome::TimedOut);
        assert_eq!(report.stdout_lines, vec!["partial"]);
        assert!(!report.elevated);
    }
}
