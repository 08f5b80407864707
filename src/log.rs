#[cfg(doc)]
use crate::{ExecutionReport, ScriptRunner};

/// A captured output line, tagged with the stream it was emitted on.
///
/// [`ScriptRunner`] keeps the two streams separate all the way through;
/// presenters that want a merged view get it from
/// [`ExecutionReport::tagged_lines`] or [`ExecutionReport::render`],
/// which always place the stdout block before the stderr block.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ScriptLog {
    /// A line emitted to `stdout`.
    Stdout(String),

    /// A line emitted to `stderr`.
    Stderr(String),
}
