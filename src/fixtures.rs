use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::{is_stage2_category, Config};
use crate::error::{HarnessError, Result};

pub const COMMAND_SUFFIX: &str = ".cmd";
pub const EXPECTED_DIR: &str = "expected";
pub const EXPECTED_SUFFIX: &str = ".log";

/// One fixture: `<category>/<name>.cmd` paired with
/// `<category>/expected/<name>.log`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub category: String,
    pub name: String,
    pub category_dir: PathBuf,
    pub command_file: PathBuf,
    pub expected_file: PathBuf,
}

impl TestCase {
    fn new(category_dir: &Path, category: &str, name: &str) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            category_dir: category_dir.to_path_buf(),
            command_file: category_dir.join(format!("{name}{COMMAND_SUFFIX}")),
            expected_file: category_dir
                .join(EXPECTED_DIR)
                .join(format!("{name}{EXPECTED_SUFFIX}")),
        }
    }

    pub fn is_stage2(&self) -> bool {
        is_stage2_category(&self.category)
    }

    pub fn read_commands(&self) -> Result<Vec<u8>> {
        fs::read(&self.command_file)
            .map_err(|e| HarnessError::io(format!("reading {}", self.command_file.display()), e))
    }

    /// A missing transcript is a broken fixture, not a failing test.
    pub fn read_expected(&self) -> Result<Vec<u8>> {
        if !self.expected_file.is_file() {
            return Err(HarnessError::MissingTranscript {
                test: self.name.clone(),
                path: self.expected_file.clone(),
            });
        }
        fs::read(&self.expected_file)
            .map_err(|e| HarnessError::io(format!("reading {}", self.expected_file.display()), e))
    }
}

/// Every test case under the configured root, categories and names in
/// file-name order, with the `--test` and `--stage2` filters applied.
pub fn discover(config: &Config) -> Result<Vec<TestCase>> {
    let root = &config.test_root;
    if !root.is_dir() {
        return Err(HarnessError::MissingTestRoot(root.clone()));
    }

    let mut cases = Vec::new();
    for category_dir in sorted_entries(root, |e| e.file_type().is_dir())? {
        let Some(category) = file_name(&category_dir) else {
            continue;
        };
        if config.stage2_only && !is_stage2_category(&category) {
            debug!(%category, "skipping category outside stage 2");
            continue;
        }
        let before = cases.len();
        for command_file in sorted_entries(&category_dir, |e| e.file_type().is_file())? {
            let Some(name) = file_name(&command_file)
                .and_then(|f| f.strip_suffix(COMMAND_SUFFIX).map(str::to_string))
            else {
                continue;
            };
            if let Some(only) = &config.only_test {
                if &name != only {
                    continue;
                }
            }
            cases.push(TestCase::new(&category_dir, &category, &name));
        }
        debug!(%category, found = cases.len() - before, "scanned category");
    }
    Ok(cases)
}

fn sorted_entries(
    dir: &Path,
    keep: impl Fn(&walkdir::DirEntry) -> bool,
) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry =
            entry.map_err(|e| HarnessError::io(format!("listing {}", dir.display()), e.into()))?;
        if keep(&entry) {
            out.push(entry.into_path());
        }
    }
    Ok(out)
}

/// Fixture names must be UTF-8; anything else is left out of the run.
fn file_name(path: &Path) -> Option<String> {
    let name = path.file_name()?;
    match name.to_str() {
        Some(name) => Some(name.to_string()),
        None => {
            warn!(path = %path.display(), "skipping fixture entry with a non-UTF-8 name");
            None
        }
    }
}
