use std::io::Write;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{HarnessError, Result};
use crate::exec;
use crate::fixtures;
use crate::report::{Flow, Reporter, RunTally, Verdict};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Stopped at the first failure.
    Halted(RunTally),
    /// Every selected test case ran.
    Completed(RunTally),
    NoTests,
}

impl RunOutcome {
    /// Process exit status. `strict` separates "ran with failures" from
    /// "all passed"; without it both report 0.
    pub fn exit_code(&self, strict: bool) -> u8 {
        match self {
            Self::NoTests => 1,
            Self::Halted(_) if strict => 2,
            Self::Completed(tally) if strict && tally.failures > 0 => 2,
            Self::Halted(_) | Self::Completed(_) => 0,
        }
    }
}

/// Discover, execute, compare and report every selected test case in
/// order, writing the report to `out`.
pub fn run<W: Write>(config: &Config, out: W) -> Result<RunOutcome> {
    config.validate()?;
    let cases = fixtures::discover(config)?;
    let simulator = exec::resolve_simulator(&config.simulator)?;
    info!(tests = cases.len(), ?simulator, "starting run");

    let mut reporter = Reporter::new(out, config);
    for case in &cases {
        let expected = case.read_expected()?;
        let input = case.read_commands()?;
        let result = exec::run_simulator(&simulator, case, &input, config)?;
        let verdict = Verdict::of(&result, &expected);
        debug!(test = %case.name, ?verdict, "compared");

        let flow = reporter
            .record(case, &result, verdict, &expected, &input)
            .map_err(|e| HarnessError::io("writing report", e))?;
        if flow == Flow::Halt {
            return Ok(RunOutcome::Halted(reporter.tally().clone()));
        }
    }

    if reporter.tally().total() == 0 {
        reporter
            .no_tests(config.only_test.as_deref())
            .map_err(|e| HarnessError::io("writing report", e))?;
        return Ok(RunOutcome::NoTests);
    }
    reporter
        .summary()
        .map_err(|e| HarnessError::io("writing report", e))?;
    Ok(RunOutcome::Completed(reporter.tally().clone()))
}
