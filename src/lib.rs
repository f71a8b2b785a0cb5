//! Regression harness for the rv32sim instruction-set simulator.
//!
//! Each category directory under the test root holds `<name>.cmd` command
//! scripts and `expected/<name>.log` transcripts. Every script is piped into
//! the simulator and its stdout is compared with the transcript after
//! whitespace and line-ending normalisation.

pub mod cli;
pub mod compare;
pub mod config;
pub mod error;
pub mod exec;
pub mod fixtures;
pub mod report;
pub mod runner;

pub use config::Config;
pub use error::HarnessError;
pub use runner::{run, RunOutcome};
