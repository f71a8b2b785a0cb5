use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::Config;
use crate::error::Result;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run all available rv32sim tests.", long_about = None)]
pub struct Cli {
    /// Run this specific test, e.g. instruction_test_addi
    #[arg(long = "test", value_name = "NAME")]
    pub test: Option<String>,
    /// Run all tests, even if one fails
    #[arg(long, default_value_t = false)]
    pub all: bool,
    /// Don't print any test output
    #[arg(long, default_value_t = false)]
    pub silent: bool,
    /// Display simulator logs even if tests pass
    #[arg(long, default_value_t = false)]
    pub noisy: bool,
    /// Enable verbose logging in the simulator
    #[arg(long, default_value_t = false)]
    pub verbose: bool,
    /// Display the commands provided to the simulator
    #[arg(long, default_value_t = false)]
    pub commands: bool,
    /// Run only stage 2 tests
    #[arg(long, default_value_t = false)]
    pub stage2: bool,
    /// Display bytes of expected and received output
    #[arg(long, default_value_t = false)]
    pub bytes: bool,
    /// Directory holding the test categories
    #[arg(long, default_value = "./tests")]
    pub root: PathBuf,
    /// Simulator executable (a bare name is looked up on PATH)
    #[arg(long, default_value = "./rv32sim.exe")]
    pub sim: PathBuf,
    /// Seconds before a simulator run is killed; 0 waits forever
    #[arg(long, value_name = "SECS", default_value_t = 60)]
    pub timeout: u64,
    /// Exit with status 2 when any test failed
    #[arg(long, default_value_t = false)]
    pub strict: bool,
    /// Never colour the report
    #[arg(long, default_value_t = false)]
    pub no_color: bool,
    /// Harness log level, used when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// `tty` says whether stdout is a terminal; colour is only used there.
    pub fn into_config(self, tty: bool) -> Result<Config> {
        let config = Config {
            test_root: self.root,
            simulator: self.sim,
            only_test: self.test,
            run_all: self.all,
            silent: self.silent,
            noisy: self.noisy,
            verbose_simulator: self.verbose,
            show_commands: self.commands,
            show_bytes: self.bytes,
            stage2_only: self.stage2,
            timeout: (self.timeout > 0).then(|| Duration::from_secs(self.timeout)),
            strict_exit: self.strict,
            color: tty && !self.no_color,
        };
        config.validate()?;
        Ok(config)
    }
}
