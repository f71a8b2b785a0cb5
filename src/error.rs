use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Harness-level failures. Any of these ends the run with exit code 1;
/// simulator misbehaviour is never reported through this type.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("can't find the test directory, expected it at {}", .0.display())]
    MissingTestRoot(PathBuf),

    #[error("can't find the simulator executable, expected it at {}", .0.display())]
    MissingSimulator(PathBuf),

    #[error("--silent and --noisy were both set, pick one")]
    ConflictingVerbosity,

    #[error("test '{test}' has no expected transcript at {}", .path.display())]
    MissingTranscript { test: String, path: PathBuf },

    #[error("spawning {}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("{0} thread panicked")]
    WorkerPanicked(&'static str),
}

impl HarnessError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T, E = HarnessError> = std::result::Result<T, E>;
