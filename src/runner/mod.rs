use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use tracing::debug;

use crate::{Error, Result};

mod elevate;
mod launcher;
mod report;

pub use elevate::{Elevator, SuElevator};
pub use launcher::{CommandSpec, OsLauncher, ProcessLauncher, ProcessOutput};
pub use report::{ExecutionReport, Outcome, Privilege};

/// The interpreter used for direct (non-elevated) runs.
const SHELL_BIN: &str = "sh";

/// The result of statting a script path before choosing a launch
/// strategy.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Access {
    /// The script exists and the current user can read it.
    Readable,

    /// The script exists but reading it requires elevation.
    Unreadable,

    /// There is no file at the path.
    NotFound,
}

impl Access {
    /// Determine how accessible `path` is to the current user.
    ///
    /// `NotFound` short-circuits the whole run before any escalation:
    /// probing elevation for a file that does not exist would waste a
    /// process spawn and may raise an unnecessary privilege prompt on
    /// the host.
    pub fn check(path: &Path) -> Self {
        match std::fs::metadata(path) {
            Err(error) if error.kind() == io::ErrorKind::NotFound => Access::NotFound,
            Err(_) => Access::Unreadable,
            Ok(_) => match File::open(path) {
                Ok(_) => Access::Readable,
                Err(_) => Access::Unreadable,
            },
        }
    }
}

/// One request to run a script: the path, plus an optional deadline.
///
/// A fresh request/report pair exists per invocation; nothing persists
/// across runs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExecutionRequest {
    path: PathBuf,
    timeout: Option<Duration>,
}

impl ExecutionRequest {
    /// Create a request for the script at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.as_os_str().is_empty() {
            return Err(Error::InvalidScript {
                path: path.display().to_string(),
                reason: "an empty path names nothing".to_string(),
            });
        }
        Ok(Self {
            path,
            timeout: None,
        })
    }

    /// Terminate the run if the script is still going after `timeout`.
    ///
    /// Without a deadline the runner waits however long the script
    /// takes.
    pub fn timeout(&mut self, timeout: Duration) -> &mut ExecutionRequest {
        self.timeout = Some(timeout);
        self
    }

    /// The script path this request names.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A `ScriptRunner` runs a shell script with the least privilege that
/// can read it.
///
/// Readable scripts run directly under `sh`. Unreadable scripts go
/// through the configured [`Elevator`], but only after its probe has
/// confirmed that elevation is currently grantable — the real script is
/// never handed to the elevated path blindly.
///
/// # Example
///
/// ```no_run
/// use runsh::{ExecutionRequest, ScriptRunner};
///
/// fn main() -> runsh::Result<()> {
///     let runner = ScriptRunner::new()?;
///     let request = ExecutionRequest::new("/opt/scripts/main.sh")?;
///     let report = runner.run(&request);
///     print!("{}", report.render());
///     Ok(())
/// }
/// ```
#[derive(Clone, Debug)]
pub struct ScriptRunner {
    launcher: Arc<dyn ProcessLauncher>,
    elevator: Option<Arc<dyn Elevator>>,
}

impl ScriptRunner {
    /// Create a runner that spawns real processes and escalates through
    /// `su`.
    pub fn new() -> Result<Self> {
        if which::which(SHELL_BIN).is_err() {
            return Err(Error::MissingInterpreter {
                bin: SHELL_BIN.to_string(),
            });
        }
        Ok(Self {
            launcher: Arc::new(OsLauncher),
            elevator: Some(Arc::new(SuElevator::new())),
        })
    }

    /// Replace the process launcher.
    pub fn with_launcher(mut self, launcher: impl ProcessLauncher + 'static) -> Self {
        self.launcher = Arc::new(launcher);
        self
    }

    /// Replace the elevation strategy.
    pub fn with_elevator(mut self, elevator: impl Elevator + 'static) -> Self {
        self.elevator = Some(Arc::new(elevator));
        self
    }

    /// Never escalate; unreadable scripts are reported as unreadable.
    pub fn without_elevation(mut self) -> Self {
        self.elevator = None;
        self
    }

    /// Run the script named by `request` and report what happened.
    ///
    /// This never returns an error: spawn and stream faults are folded
    /// into the report's outcome, with the fault text preserved as a
    /// diagnostic. It blocks the calling thread until the run is over;
    /// use [`ScriptRunner::run_detached`] to keep the caller free.
    pub fn run(&self, request: &ExecutionRequest) -> ExecutionReport {
        let access = Access::check(request.path());
        debug!(script = %request.path().display(), ?access, "dispatching");
        self.dispatch(request, access)
    }

    /// Run on a detached worker thread, handing the report to
    /// `on_complete` when the run is over.
    ///
    /// The caller's thread is never blocked on process I/O, and no
    /// particular thread affinity is assumed for the callback — hosts
    /// that need the report on a specific thread should forward it from
    /// the callback themselves. Once started, a run proceeds to
    /// completion; there is no cancellation.
    pub fn run_detached<F>(&self, request: ExecutionRequest, on_complete: F)
    where
        F: FnOnce(ExecutionReport) + Send + 'static,
    {
        let runner = self.clone();
        rayon::spawn(move || on_complete(runner.run(&request)));
    }

    fn dispatch(&self, request: &ExecutionRequest, access: Access) -> ExecutionReport {
        match access {
            Access::NotFound => ExecutionReport::aborted(Outcome::ScriptNotFound),
            Access::Readable => self.execute(request, Privilege::Normal),
            Access::Unreadable => self.escalate(request),
        }
    }

    fn escalate(&self, request: &ExecutionRequest) -> ExecutionReport {
        let Some(elevator) = &self.elevator else {
            return ExecutionReport::aborted(Outcome::ScriptUnreadable);
        };
        if elevator.probe(self.launcher.as_ref()) {
            self.execute(request, Privilege::Elevated)
        } else {
            debug!(script = %request.path().display(), "elevation denied");
            ExecutionReport::aborted(Outcome::ElevationDenied)
        }
    }

    fn execute(&self, request: &ExecutionRequest, privilege: Privilege) -> ExecutionReport {
        let spec = match (privilege, &self.elevator) {
            (Privilege::Elevated, Some(elevator)) => elevator.elevated_command(request.path()),
            _ => CommandSpec::new(SHELL_BIN).arg(request.path().display().to_string()),
        }
        .timeout(request.timeout);

        match self.launcher.launch(&spec) {
            Ok(output) => ExecutionReport::captured(privilege, output),
            Err(error) => {
                ExecutionReport::fault(Outcome::LaunchFailed, privilege, error.to_string())
            }
        }
    }
}
