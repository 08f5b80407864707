#[cfg(doc)]
use crate::{DiskSpace, ScriptRunner};

use thiserror::Error as ThisError;

use std::io;

/// The result type used by a [`ScriptRunner`].
pub type Result<T> = std::result::Result<T, Error>;

/// The possible errors reported by a [`ScriptRunner`].
///
/// These only ever surface from constructors and from the launcher and
/// storage seams; [`ScriptRunner::run`] folds every fault into the
/// report it returns.
#[derive(ThisError, Debug)]
pub enum Error {
    /// This error occurs when a request names a script that could never be run.
    /// This is a usage error, check the path you passed in.
    #[error("'{path}' is not a runnable script because {reason}.")]
    InvalidScript {
        /// The rejected script path.
        path: String,

        /// The reason the path was rejected.
        reason: String,
    },

    /// This error occurs when an interpreter binary is not installed on this machine.
    #[error("'{bin}' is not installed on this machine.")]
    MissingInterpreter {
        /// The binary that could not be found.
        bin: String,
    },

    /// This error occurs when a process could not spawn. Originates from [`std::process::Command::spawn`].
    #[error("could not spawn '{command}': {source}.")]
    CouldNotSpawn {
        /// The command that could not spawn.
        command: String,

        /// The [`io::Error`] that was reported by [`std::process::Command::spawn`].
        source: io::Error,
    },

    /// This error occurs when a line could not be written to a process's input stream.
    #[error("could not feed input to '{command}': {source}.")]
    CouldNotFeed {
        /// The command whose input stream rejected the write.
        command: String,

        /// The [`io::Error`] that was reported while writing or flushing.
        source: io::Error,
    },

    /// There was an error waiting for the process status. Originates from [`std::process::Child::try_wait`].
    #[error("could not wait for '{command}' to complete: {source}.")]
    CouldNotWait {
        /// The command that could not be waited for.
        command: String,

        /// The [`io::Error`] that was reported by [`std::process::Child::try_wait`].
        source: io::Error,
    },

    /// This error occurs when a process that outlived its deadline could not be terminated.
    #[error("could not terminate '{command}': {source}.")]
    CouldNotTerminate {
        /// The command that could not be terminated.
        command: String,

        /// The [`io::Error`] that was reported by [`std::process::Child::kill`].
        source: io::Error,
    },

    /// This error occurs when filesystem statistics could not be read for a [`DiskSpace`] probe.
    #[error("could not read filesystem statistics for '{path}': {source}.")]
    CouldNotStatFilesystem {
        /// The path whose filesystem could not be statted.
        path: String,

        /// The errno reported by `statvfs`.
        source: nix::errno::Errno,
    },
}
