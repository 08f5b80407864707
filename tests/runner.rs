use std::{io::Write, time::Duration};

use runsh::{ExecutionRequest, Outcome, ScriptRunner};
use tempfile::NamedTempFile;

fn script(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{body}").unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn runs_a_readable_script_directly() {
    let file = script("echo A\necho B >&2\nexit 7");
    let runner = ScriptRunner::new().unwrap();
    let request = ExecutionRequest::new(file.path()).unwrap();

    let report = runner.run(&request);

    assert_eq!(report.outcome, Outcome::Success);
    assert_eq!(report.exit_code, Some(7));
    assert_eq!(report.stdout_lines, vec!["A"]);
    assert_eq!(report.stderr_lines, vec!["B"]);
    assert!(!report.elevated);
    assert_eq!(report.diagnostic, None);
}

#[test]
fn missing_script_is_reported_without_output() {
    let runner = ScriptRunner::new().unwrap();
    let request = ExecutionRequest::new("/definitely/not/here/main.sh").unwrap();

    let report = runner.run(&request);

    assert_eq!(report.outcome, Outcome::ScriptNotFound);
    assert_eq!(report.exit_code, None);
    assert!(report.stdout_lines.is_empty());
    assert!(report.stderr_lines.is_empty());
}

#[test]
fn identical_runs_produce_identical_reports() {
    let file = script("echo stable\nexit 3");
    let runner = ScriptRunner::new().unwrap();
    let request = ExecutionRequest::new(file.path()).unwrap();

    let first = runner.run(&request);
    let second = runner.run(&request);

    assert_eq!(first, second);
}

#[test]
fn rendering_keeps_stdout_ahead_of_stderr() {
    // The script interleaves streams; the reconstruction never does.
    let file = script("echo a\necho x >&2\necho b\necho y >&2");
    let runner = ScriptRunner::new().unwrap();
    let request = ExecutionRequest::new(file.path()).unwrap();

    let report = runner.run(&request);

    assert_eq!(report.stdout_lines, vec!["a", "b"]);
    assert_eq!(report.stderr_lines, vec!["x", "y"]);
    assert_eq!(report.render(), "a\nb\n[ERROR] x\n[ERROR] y\n");
}

#[test]
fn deadline_is_enforced_with_partial_output_kept() {
    let file = script("echo started\nsleep 30\necho never");
    let runner = ScriptRunner::new().unwrap();
    let mut request = ExecutionRequest::new(file.path()).unwrap();
    request.timeout(Duration::from_millis(300));

    let report = runner.run(&request);

    assert_eq!(report.outcome, Outcome::TimedOut);
    assert_eq!(report.exit_code, None);
    assert_eq!(report.stdout_lines, vec!["started"]);
    assert!(!report.elevated);
}

#[test]
fn detached_runs_deliver_through_the_callback() {
    let file = script("echo detached");
    let runner = ScriptRunner::new().unwrap();
    let request = ExecutionRequest::new(file.path()).unwrap();

    let (sender, receiver) = crossbeam_channel::bounded(1);
    runner.run_detached(request, move |report| {
        let _ = sender.send(report);
    });

    let report = receiver
        .recv_timeout(Duration::from_secs(30))
        .expect("the detached run never completed");
    assert_eq!(report.outcome, Outcome::Success);
    assert_eq!(report.stdout_lines, vec!["detached"]);
}
