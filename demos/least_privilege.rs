use runsh::{ExecutionRequest, ScriptRunner};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/opt/scripts/main.sh".to_string());

    let runner = ScriptRunner::new()?;
    let request = ExecutionRequest::new(path)?;

    let report = runner.run(&request);
    eprintln!("outcome: {:?}", report.outcome);
    if let Some(code) = report.exit_code {
        eprintln!("exit code: {code}");
    }
    if let Some(diagnostic) = &report.diagnostic {
        eprintln!("{diagnostic}");
    }
    eprint!("{}", report.render());
    Ok(())
}
