#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![deny(missing_docs, missing_debug_implementations, nonstandard_style)]

mod error;
mod gate;
mod log;
mod runner;
mod storage;

pub use error::*;
pub use gate::*;
pub use log::*;
pub use runner::*;
pub use storage::*;
