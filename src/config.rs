use std::path::PathBuf;
use std::time::Duration;

use crate::error::{HarnessError, Result};

/// Category whose tests run with the stage selector flag.
pub const STAGE_2_CATEGORY: &str = "stage_2_tests";

pub fn is_stage2_category(category: &str) -> bool {
    category == STAGE_2_CATEGORY
}

/// Snapshot of everything a run needs. Built once at startup, never mutated.
#[derive(Debug, Clone)]
pub struct Config {
    pub test_root: PathBuf,
    pub simulator: PathBuf,
    /// Only run the test case with this exact name.
    pub only_test: Option<String>,
    pub run_all: bool,
    pub silent: bool,
    pub noisy: bool,
    /// Pass `-v` through to the simulator.
    pub verbose_simulator: bool,
    pub show_commands: bool,
    pub show_bytes: bool,
    pub stage2_only: bool,
    /// `None` waits forever.
    pub timeout: Option<Duration>,
    pub strict_exit: bool,
    pub color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            test_root: PathBuf::from("./tests"),
            simulator: PathBuf::from("./rv32sim.exe"),
            only_test: None,
            run_all: false,
            silent: false,
            noisy: false,
            verbose_simulator: false,
            show_commands: false,
            show_bytes: false,
            stage2_only: false,
            timeout: Some(Duration::from_secs(60)),
            strict_exit: false,
            color: false,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.silent && self.noisy {
            return Err(HarnessError::ConflictingVerbosity);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_and_noisy_conflict() {
        let config = Config {
            silent: true,
            noisy: true,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(HarnessError::ConflictingVerbosity)
        ));
    }

    #[test]
    fn either_verbosity_alone_is_fine() {
        for (silent, noisy) in [(false, false), (true, false), (false, true)] {
            let config = Config {
                silent,
                noisy,
                ..Config::default()
            };
            assert!(config.validate().is_ok(), "silent={silent} noisy={noisy}");
        }
    }

    #[test]
    fn stage2_is_matched_by_exact_name() {
        assert!(is_stage2_category("stage_2_tests"));
        assert!(!is_stage2_category("stage_2_tests_old"));
        assert!(!is_stage2_category("instruction_tests"));
    }
}
