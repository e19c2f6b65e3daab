//! Test utilities and mocks for Wharf unit tests.
//!
//! Resolution and fetching sit behind two seams, [`CommandRunner`] for the
//! external VCS clients and [`MetaFetcher`] for discovery requests. The
//! mocks here implement both so tests never touch the network or need git
//! installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use wharf::test_support::{MockFetcher, MockProcessOutput, MockRunner};
//!
//! #[test]
//! fn test_example() {
//!     let runner = MockRunner::new();
//!     runner.expect("git rev-parse HEAD", MockProcessOutput::success("5670e8d..."));
//!
//!     let fetcher = MockFetcher::new();
//!     fetcher.page("https://example.org/pkg?go-get=1", meta_page(&[...]));
//!
//!     // Use mocks in tests...
//! }
//! ```

pub mod fixtures;

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::resolver::discovery::{FetchedPage, MetaFetcher};
use crate::resolver::GetError;
use crate::util::process::{CommandOutput, CommandRunner, ProcessBuilder};

pub use fixtures::*;

/// Mock process output for testing command execution.
#[derive(Debug, Clone)]
pub struct MockProcessOutput {
    /// Exit status code (0 = success).
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl MockProcessOutput {
    /// Create a successful output with the given stdout.
    pub fn success(stdout: impl Into<String>) -> Self {
        MockProcessOutput {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Create a failure output with the given stderr and status code.
    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        MockProcessOutput {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    fn to_command_output(&self) -> CommandOutput {
        CommandOutput {
            code: Some(self.status),
            stdout: self.stdout.clone().into_bytes(),
            stderr: self.stderr.clone().into_bytes(),
        }
    }
}

impl Default for MockProcessOutput {
    fn default() -> Self {
        MockProcessOutput::success("")
    }
}

/// Pattern for matching rendered command lines.
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Exact match on full command string.
    Exact(String),
    /// Match if command starts with prefix.
    StartsWith(String),
    /// Match if command contains substring.
    Contains(String),
    /// Match any command.
    Any,
}

impl CommandPattern {
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::StartsWith(s) => cmd.starts_with(s),
            CommandPattern::Contains(s) => cmd.contains(s),
            CommandPattern::Any => true,
        }
    }
}

/// Expectation for a command execution.
#[derive(Debug, Clone)]
pub struct CommandExpectation {
    pub pattern: CommandPattern,
    pub output: MockProcessOutput,
    /// Number of times this expectation can be used (None = unlimited).
    pub times: Option<usize>,
    pub used: usize,
    /// Directories created when the expectation fires, e.g. a clone's marker
    pub creates: Vec<PathBuf>,
}

impl CommandExpectation {
    pub fn new(pattern: CommandPattern, output: MockProcessOutput) -> Self {
        CommandExpectation {
            pattern,
            output,
            times: None,
            used: 0,
            creates: Vec::new(),
        }
    }

    /// Set the number of times this expectation can be used.
    pub fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    /// Create `dir` (and its parents) whenever this expectation fires.
    pub fn creating(mut self, dir: impl Into<PathBuf>) -> Self {
        self.creates.push(dir.into());
        self
    }

    fn available(&self) -> bool {
        match self.times {
            Some(n) => self.used < n,
            None => true,
        }
    }
}

#[derive(Debug, Default)]
struct RunnerState {
    expectations: Vec<CommandExpectation>,
    calls: Vec<ProcessBuilder>,
    default_output: Option<MockProcessOutput>,
}

/// Mock [`CommandRunner`].
///
/// Records every command and answers from the first available matching
/// expectation, then the default output. A command nothing answers fails
/// like a missing executable.
#[derive(Debug, Default)]
pub struct MockRunner {
    state: Mutex<RunnerState>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, RunnerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add an expectation for an exact command match.
    pub fn expect(&self, cmd: &str, output: MockProcessOutput) -> &Self {
        self.expect_pattern(CommandExpectation::new(
            CommandPattern::Exact(cmd.to_string()),
            output,
        ))
    }

    /// Add an expectation for a command starting with a prefix.
    pub fn expect_prefix(&self, prefix: &str, output: MockProcessOutput) -> &Self {
        self.expect_pattern(CommandExpectation::new(
            CommandPattern::StartsWith(prefix.to_string()),
            output,
        ))
    }

    /// Add a custom expectation.
    pub fn expect_pattern(&self, expectation: CommandExpectation) -> &Self {
        self.state().expectations.push(expectation);
        self
    }

    /// Set a default output for commands that don't match any expectation.
    pub fn set_default(&self, output: MockProcessOutput) -> &Self {
        self.state().default_output = Some(output);
        self
    }

    /// Every command run so far.
    pub fn commands(&self) -> Vec<ProcessBuilder> {
        self.state().calls.clone()
    }

    /// Every command run so far, rendered.
    pub fn calls(&self) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .map(ProcessBuilder::display_command)
            .collect()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<CommandOutput, GetError> {
        let rendered = cmd.display_command();
        let mut state = self.state();
        state.calls.push(cmd.clone());

        let matched = state
            .expectations
            .iter()
            .position(|exp| exp.available() && exp.pattern.matches(&rendered));

        let output = match matched {
            Some(idx) => {
                let exp = &mut state.expectations[idx];
                exp.used += 1;
                for dir in &exp.creates {
                    fs::create_dir_all(dir)
                        .map_err(|e| GetError::io(format!("mock: create {}", dir.display()), e))?;
                }
                exp.output.clone()
            }
            None => match &state.default_output {
                Some(default) => default.clone(),
                None => {
                    return Err(GetError::ExternalCommandFailed {
                        command: rendered,
                        code: None,
                        output: "unexpected command".to_string(),
                    })
                }
            },
        };

        Ok(output.to_command_output())
    }
}

#[derive(Debug, Default)]
struct FetcherState {
    pages: HashMap<String, (u16, String)>,
    requests: Vec<String>,
}

/// Mock [`MetaFetcher`] serving pages from a URL map.
///
/// Unknown URLs fail as unreachable.
#[derive(Debug, Default)]
pub struct MockFetcher {
    state: Mutex<FetcherState>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FetcherState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Serve `body` with status 200 at `url`.
    pub fn page(&self, url: &str, body: String) -> &Self {
        self.page_with_status(url, 200, body)
    }

    /// Serve `body` with `status` at `url`.
    pub fn page_with_status(&self, url: &str, status: u16, body: String) -> &Self {
        self.state().pages.insert(url.to_string(), (status, body));
        self
    }

    /// All requested URLs, in order.
    pub fn requests(&self) -> Vec<String> {
        self.state().requests.clone()
    }
}

impl MetaFetcher for MockFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedPage, GetError> {
        let mut state = self.state();
        state.requests.push(url.to_string());

        match state.pages.get(url) {
            Some((status, body)) => Ok(FetchedPage {
                status: *status,
                body: body.clone(),
            }),
            None => Err(GetError::NetworkFailure {
                url: url.to_string(),
                message: "connection refused".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mock_runner_basic() {
        let runner = MockRunner::new();
        runner.expect("git --version", MockProcessOutput::success("git version 2.43.0"));
        runner.expect_prefix("git clone", MockProcessOutput::failure(128, "fatal"));

        let out = runner
            .run(&ProcessBuilder::new("git").arg("--version"))
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout_str(), "git version 2.43.0");

        let out = runner
            .run(&ProcessBuilder::new("git").args(["clone", "x"]))
            .unwrap();
        assert_eq!(out.code, Some(128));

        assert_eq!(runner.calls(), vec!["git --version", "git clone x"]);
    }

    #[test]
    fn test_mock_runner_unexpected() {
        let runner = MockRunner::new();
        assert!(runner.run(&ProcessBuilder::new("unknown")).is_err());
    }

    #[test]
    fn test_mock_runner_side_effects_and_times() {
        let tmp = TempDir::new().unwrap();
        let marker = tmp.path().join("repo").join(".git");
        let runner = MockRunner::new();
        runner.expect_pattern(
            CommandExpectation::new(
                CommandPattern::StartsWith("git clone".to_string()),
                MockProcessOutput::success(""),
            )
            .creating(&marker)
            .times(1),
        );

        runner.run(&ProcessBuilder::new("git").arg("clone")).unwrap();
        assert!(marker.is_dir());
        assert!(runner.run(&ProcessBuilder::new("git").arg("clone")).is_err());
    }

    #[test]
    fn test_mock_fetcher() {
        let fetcher = MockFetcher::new();
        fetcher.page_with_status("https://example.org/x?go-get=1", 404, "gone".to_string());

        let page = fetcher.fetch("https://example.org/x?go-get=1").unwrap();
        assert_eq!(page.status, 404);
        assert!(!page.is_success());
        assert!(fetcher.fetch("https://example.org?go-get=1").is_err());
        assert_eq!(fetcher.requests().len(), 2);
    }
}
