use std::fmt;
use std::io::{self, Write};
use std::time::Duration;

use nix::sys::signal::Signal;
use tracing::info;

use crate::compare;
use crate::config::Config;
use crate::exec::{ExecutionResult, Termination};
use crate::fixtures::TestCase;

/// Exit codes the simulator's host reports for an `abort()` and for a
/// segmentation fault when the signal is folded into the code.
pub const ABORT_EXIT_CODE: i32 = -6;
pub const SEGV_EXIT_CODE: i32 = -127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Clean exit, wrong output.
    Functional,
    AssertionAbort,
    SegmentationFault,
    Timeout,
    Crash,
}

impl FailureClass {
    pub fn classify(termination: &Termination) -> Self {
        match *termination {
            Termination::Exited(0) => Self::Functional,
            Termination::Exited(ABORT_EXIT_CODE) => Self::AssertionAbort,
            Termination::Exited(SEGV_EXIT_CODE) => Self::SegmentationFault,
            Termination::Signaled(signo) if signo == Signal::SIGABRT as i32 => {
                Self::AssertionAbort
            }
            Termination::Signaled(signo) if signo == Signal::SIGSEGV as i32 => {
                Self::SegmentationFault
            }
            Termination::TimedOut(_) => Self::Timeout,
            _ => Self::Crash,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(FailureClass),
}

impl Verdict {
    pub fn of(result: &ExecutionResult, expected: &[u8]) -> Self {
        if compare::passed(result, expected) {
            Self::Pass
        } else {
            Self::Fail(FailureClass::classify(&result.termination))
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// Whether the run should go on after a test case was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Halt,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunTally {
    pub passes: usize,
    pub failures: usize,
    /// Set once the first failure has been recorded.
    pub failure_shown: bool,
}

impl RunTally {
    pub fn total(&self) -> usize {
        self.passes + self.failures
    }

    pub fn percentage(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => 100.0 * self.passes as f64 / total as f64,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Colour {
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
}

impl Colour {
    fn code(self) -> &'static str {
        match self {
            Self::Red => "\x1b[1;31m",
            Self::Green => "\x1b[1;32m",
            Self::Yellow => "\x1b[1;33m",
            Self::Blue => "\x1b[1;34m",
            Self::Magenta => "\x1b[1;35m",
        }
    }
}

const RESET: &str = "\x1b[39;49m";

struct Paint<'a> {
    text: &'a str,
    colour: Option<Colour>,
}

fn paint(enabled: bool, text: &str, colour: Colour) -> Paint<'_> {
    Paint {
        text,
        colour: enabled.then_some(colour),
    }
}

impl fmt::Display for Paint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.colour {
            Some(c) => write!(f, "{}{}{RESET}", c.code(), self.text),
            None => f.write_str(self.text),
        }
    }
}

/// Prints per-test status and diagnostics, and owns the run tally.
pub struct Reporter<W: Write> {
    out: W,
    tally: RunTally,
    color: bool,
    silent: bool,
    noisy: bool,
    run_all: bool,
    show_bytes: bool,
    show_commands: bool,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, config: &Config) -> Self {
        Self {
            out,
            tally: RunTally::default(),
            color: config.color,
            silent: config.silent,
            noisy: config.noisy,
            run_all: config.run_all,
            show_bytes: config.show_bytes,
            show_commands: config.show_commands,
        }
    }

    pub fn tally(&self) -> &RunTally {
        &self.tally
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Record one finished test case. Returns [`Flow::Halt`] when this was a
    /// failure and the run is not configured to keep going.
    pub fn record(
        &mut self,
        case: &TestCase,
        result: &ExecutionResult,
        verdict: Verdict,
        expected: &[u8],
        input: &[u8],
    ) -> io::Result<Flow> {
        let (label, colour) = match verdict {
            Verdict::Pass => (" Pass ", Colour::Green),
            Verdict::Fail(FailureClass::Functional) => (" Fail ", Colour::Red),
            Verdict::Fail(FailureClass::AssertionAbort) => ("Assert", Colour::Red),
            Verdict::Fail(FailureClass::SegmentationFault) => ("SigSegv", Colour::Magenta),
            Verdict::Fail(FailureClass::Timeout) => ("Timeout", Colour::Yellow),
            Verdict::Fail(FailureClass::Crash) => ("Crash ", Colour::Yellow),
        };
        if verdict.is_pass() {
            self.tally.passes += 1;
        } else {
            self.tally.failures += 1;
        }
        writeln!(self.out, "[{}]:  {}", paint(self.color, label, colour), case.name)?;
        info!(test = %case.name, ?verdict, "recorded");

        let first_failure = !verdict.is_pass() && !self.tally.failure_shown;
        let show_dump = self.noisy || (first_failure && !self.silent);
        if first_failure {
            self.tally.failure_shown = true;
        }
        if show_dump {
            self.dump(result, expected, input)?;
        }

        if !verdict.is_pass() && !self.run_all {
            writeln!(
                self.out,
                "{}",
                paint(self.color, "Quitting on first test failure.", Colour::Red)
            )?;
            self.out.flush()?;
            return Ok(Flow::Halt);
        }
        self.out.flush()?;
        Ok(Flow::Continue)
    }

    fn dump(&mut self, result: &ExecutionResult, expected: &[u8], input: &[u8]) -> io::Result<()> {
        self.section("Received Stdout", Colour::Yellow, &String::from_utf8_lossy(&result.stdout))?;
        self.section("Expected Stdout", Colour::Green, &String::from_utf8_lossy(expected))?;

        if self.show_bytes {
            self.section("Stdout Bytes", Colour::Blue, &byte_literal(&result.stdout))?;
            self.section("Expected Stdout Bytes", Colour::Blue, &byte_literal(expected))?;
        }
        if self.show_commands {
            self.section("Commands", Colour::Yellow, &String::from_utf8_lossy(input))?;
        }
        if result.stderr.is_empty() {
            writeln!(
                self.out,
                "{}",
                paint(self.color, "Nothing was output to stderr.", Colour::Red)
            )?;
        } else {
            self.section("Stderr", Colour::Yellow, &String::from_utf8_lossy(&result.stderr))?;
        }

        match result.termination {
            Termination::Exited(0) => {}
            Termination::Exited(code) => writeln!(self.out, "Note: simulator returned {code}")?,
            Termination::Signaled(signo) => {
                writeln!(self.out, "Note: simulator terminated by {}", signal_name(signo))?
            }
            Termination::TimedOut(after) => writeln!(
                self.out,
                "Note: simulator timed out after {}",
                format_duration(after)
            )?,
        }
        Ok(())
    }

    fn section(&mut self, title: &str, colour: Colour, body: &str) -> io::Result<()> {
        writeln!(self.out, "{}:", paint(self.color, title, colour))?;
        writeln!(self.out, "{body}")?;
        writeln!(self.out, "{}", paint(self.color, "End", colour))
    }

    pub fn summary(&mut self) -> io::Result<()> {
        writeln!(
            self.out,
            "{}/{} tests passed ({:.2}%).",
            self.tally.passes,
            self.tally.total(),
            self.tally.percentage()
        )?;
        self.out.flush()
    }

    pub fn no_tests(&mut self, only_test: Option<&str>) -> io::Result<()> {
        writeln!(self.out, "{}", paint(self.color, "No tests run.", Colour::Red))?;
        if let Some(name) = only_test {
            writeln!(self.out, "Couldn't find test '{name}'")?;
        }
        self.out.flush()
    }
}

fn byte_literal(bytes: &[u8]) -> String {
    format!("b\"{}\"", bytes.escape_ascii())
}

fn signal_name(signo: i32) -> String {
    match Signal::try_from(signo) {
        Ok(sig) => sig.as_str().to_string(),
        Err(_) => format!("signal {signo}"),
    }
}

fn format_duration(d: Duration) -> String {
    if d.subsec_millis() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}ms", d.as_millis())
    }
}
