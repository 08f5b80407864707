use anyhow::{anyhow, Context, Result};
use crossbeam_channel::bounded;
use runsh::{
    AccessDecision, AccessGate, DiskSpace, ExecutionRequest, ScriptRunner, SuElevator,
    Unrestricted,
};

/// Gate, disk report, run, display — a full host flow in one binary.
fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .context("usage: terminal <script path>")?;

    if Unrestricted.request_storage_access() == AccessDecision::Denied {
        return Err(anyhow!("storage access is required to reach the script"));
    }

    let space = DiskSpace::probe("/").context("could not read disk space")?;
    eprintln!("{space}");

    if !SuElevator::new().available() {
        eprintln!("note: no `su` binary; unreadable scripts will not be escalated");
    }

    let runner = ScriptRunner::new()?;
    let request = ExecutionRequest::new(&path)?;

    let (sender, receiver) = bounded(1);
    runner.run_detached(request, move |report| {
        let _ = sender.send(report);
    });
    let report = receiver.recv().context("the runner worker vanished")?;

    eprintln!("outcome: {:?} (elevated: {})", report.outcome, report.elevated);
    if let Some(code) = report.exit_code {
        eprintln!("exit code: {code}");
    }
    eprint!("{}", report.render());
    Ok(())
}
