use std::{fmt, path::Path};

use tracing::debug;

use super::launcher::{CommandSpec, ProcessLauncher};

#[cfg(doc)]
use crate::ScriptRunner;

/// The substring of `id` output that identifies the super-user principal.
const ROOT_IDENTITY_MARKER: &str = "uid=0";

/// A pluggable privilege-elevation strategy.
///
/// A [`ScriptRunner`] consults its `Elevator` only after a script turns
/// out to be unreadable, and it only runs the real script through
/// [`Elevator::elevated_command`] once [`Elevator::probe`] has confirmed
/// that elevation is currently grantable. The probe process is
/// throwaway; the real run is always a second, independent process.
pub trait Elevator: fmt::Debug + Send + Sync {
    /// Check whether elevation is currently grantable.
    ///
    /// There is no static query for "is this principal privileged" — the
    /// only way to know is to attempt a privileged invocation and look
    /// at what comes back.
    fn probe(&self, launcher: &dyn ProcessLauncher) -> bool;

    /// Build the elevated command that runs `script`.
    fn elevated_command(&self, script: &Path) -> CommandSpec;
}

/// The [`Elevator`] that shells out to a `su` binary.
///
/// The probe launches `su`, feeds it `id` then `exit`, and grants only
/// when the probe exited zero and printed a line containing `uid=0`.
#[derive(Clone, Debug)]
pub struct SuElevator {
    bin: String,
}

impl SuElevator {
    /// Create an elevator that escalates through `su`.
    pub fn new() -> Self {
        Self {
            bin: "su".to_string(),
        }
    }

    /// Whether the elevation binary is installed at all.
    ///
    /// Advisory only: an installed `su` can still refuse, so the probe
    /// remains the authority on whether elevation is grantable.
    pub fn available(&self) -> bool {
        which::which(&self.bin).is_ok()
    }
}

impl Default for SuElevator {
    fn default() -> Self {
        Self::new()
    }
}

impl Elevator for SuElevator {
    fn probe(&self, launcher: &dyn ProcessLauncher) -> bool {
        let spec = CommandSpec::new(&self.bin)
            .stdin_line("id")
            .stdin_line("exit");

        match launcher.launch(&spec) {
            Ok(output) => {
                // A refused prompt usually surfaces as a nonzero exit
                // with nothing useful on stdout, so the exit status is
                // checked before the identity scan.
                if !output.success() {
                    debug!(code = ?output.exit_code, "elevation probe exited nonzero");
                    return false;
                }
                output
                    .stdout_lines
                    .iter()
                    .any(|line| line.contains(ROOT_IDENTITY_MARKER))
            }
            Err(error) => {
                debug!(%error, "elevation probe could not launch");
                false
            }
        }
    }

    fn elevated_command(&self, script: &Path) -> CommandSpec {
        CommandSpec::new(&self.bin)
            .arg("-c")
            .arg(format!("sh {}", script.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elevated_command_wraps_the_script_in_a_shell() {
        let spec = SuElevator::new().elevated_command(Path::new("/tmp/main.sh"));

        assert_eq!(spec.bin(), "su");
        assert_eq!(spec.args(), ["-c", "sh /tmp/main.sh"]);
        assert!(spec.stdin_lines().is_empty());
    }
}
