//! Version control systems.
//!
//! Wharf never talks to a repository itself. Each supported system is a
//! [`VcsKind`] whose [`VcsDescriptor`] lists the external client's command
//! templates, the marker that identifies a working copy, and which URL
//! schemes it accepts.
//!
//! Templates are split on whitespace *before* placeholders (`{repo}`,
//! `{dir}`, `{tag}`, `{scheme}`) are substituted, so a substituted value is
//! always exactly one argument.

pub mod detect;
pub mod security;
pub mod tag;

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::resolver::GetError;
use crate::util::fs::ensure_dir;
use crate::util::process::{CommandRunner, ProcessBuilder};

use self::security::{url_scheme, ProtocolAllowList};

/// A supported version control system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VcsKind {
    Mercurial,
    Git,
    Subversion,
    Bazaar,
    Fossil,
}

/// Where a command step runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDir {
    /// The parent of the checkout directory
    Parent,
    /// The checkout directory itself
    Checkout,
    /// The checkout directory, created first
    NewCheckout,
}

/// One external command invocation.
#[derive(Debug, Clone, Copy)]
pub struct CmdStep {
    pub template: &'static str,
    pub dir: StepDir,
}

const fn step(template: &'static str, dir: StepDir) -> CmdStep {
    CmdStep { template, dir }
}

/// A URL scheme a client accepts, and whether it protects against tampering.
#[derive(Debug, Clone, Copy)]
pub struct SchemeSpec {
    pub name: &'static str,
    pub secure: bool,
}

const fn scheme(name: &'static str, secure: bool) -> SchemeSpec {
    SchemeSpec { name, secure }
}

/// Static description of one version control client.
#[derive(Debug)]
pub struct VcsDescriptor {
    /// Human-readable name
    pub name: &'static str,
    /// Executable name, also the marker suffix (`.git`, `.hg`, ...)
    pub cmd: &'static str,
    /// File or directory identifying a working copy
    pub local_marker: &'static str,
    /// Accepted schemes, in the order they are probed
    pub schemes: &'static [SchemeSpec],
    /// Clone `{repo}` into `{dir}`
    pub create: &'static [CmdStep],
    /// Update an existing working copy from its remote
    pub download: &'static [CmdStep],
    /// Check out `{tag}` (a tag, branch or revision)
    pub tag_sync: &'static [CmdStep],
    /// List tags; each output line matching the pattern yields capture 1
    pub tag_list: Option<(&'static str, &'static LazyLock<Regex>)>,
    /// Print the current revision; capture 1 of the pattern is the revision
    pub head: (&'static str, &'static LazyLock<Regex>),
    /// Check that `{scheme}://{repo}` is reachable
    pub ping: &'static str,
}

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("descriptor patterns are valid")
}

static FIRST_FIELD: LazyLock<Regex> = LazyLock::new(|| pattern(r"^(\S+)"));
static WHOLE_LINE: LazyLock<Regex> = LazyLock::new(|| pattern(r"^(\S+)$"));
static HG_NODE: LazyLock<Regex> = LazyLock::new(|| pattern(r"^([0-9a-fA-F]{40})"));
static GIT_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^([0-9a-fA-F]{40}(?:[0-9a-fA-F]{24})?)$"));
static SVN_REVISION: LazyLock<Regex> = LazyLock::new(|| pattern(r"^(\d+)$"));
static BZR_REVISION_ID: LazyLock<Regex> = LazyLock::new(|| pattern(r"^\S+\s+(\S+)$"));
static FOSSIL_CHECKOUT: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^checkout:\s+([0-9a-fA-F]+)"));

static HG: VcsDescriptor = VcsDescriptor {
    name: "Mercurial",
    cmd: "hg",
    local_marker: ".hg",
    schemes: &[scheme("https", true), scheme("http", false), scheme("ssh", true)],
    create: &[
        step("clone -U -- {repo} {dir}", StepDir::Parent),
        step("update", StepDir::Checkout),
    ],
    download: &[step("pull", StepDir::Checkout)],
    tag_sync: &[step("update -r {tag}", StepDir::Checkout)],
    tag_list: Some(("tags", &FIRST_FIELD)),
    head: ("log -r . --template {node}", &HG_NODE),
    ping: "identify -- {scheme}://{repo}",
};

static GIT: VcsDescriptor = VcsDescriptor {
    name: "Git",
    cmd: "git",
    local_marker: ".git",
    schemes: &[
        scheme("git", false),
        scheme("https", true),
        scheme("http", false),
        scheme("git+ssh", true),
        scheme("ssh", true),
    ],
    create: &[
        step("clone -- {repo} {dir}", StepDir::Parent),
        step("submodule update --init --recursive", StepDir::Checkout),
    ],
    download: &[step("fetch --tags origin", StepDir::Checkout)],
    tag_sync: &[
        step("checkout {tag} --", StepDir::Checkout),
        step("submodule update --init --recursive", StepDir::Checkout),
    ],
    tag_list: Some(("tag --list", &WHOLE_LINE)),
    head: ("rev-parse HEAD", &GIT_OBJECT),
    ping: "ls-remote {scheme}://{repo}",
};

static SVN: VcsDescriptor = VcsDescriptor {
    name: "Subversion",
    cmd: "svn",
    local_marker: ".svn",
    schemes: &[
        scheme("https", true),
        scheme("http", false),
        scheme("svn", false),
        scheme("svn+ssh", true),
    ],
    create: &[step("checkout -- {repo} {dir}", StepDir::Parent)],
    download: &[step("update", StepDir::Checkout)],
    tag_sync: &[step("update -r {tag}", StepDir::Checkout)],
    tag_list: None,
    head: ("info --show-item revision", &SVN_REVISION),
    ping: "info -- {scheme}://{repo}",
};

static BZR: VcsDescriptor = VcsDescriptor {
    name: "Bazaar",
    cmd: "bzr",
    local_marker: ".bzr",
    schemes: &[
        scheme("https", true),
        scheme("http", false),
        scheme("bzr", false),
        scheme("bzr+ssh", true),
    ],
    create: &[step("branch -- {repo} {dir}", StepDir::Parent)],
    download: &[step("pull --overwrite", StepDir::Checkout)],
    tag_sync: &[step("update -r {tag}", StepDir::Checkout)],
    tag_list: Some(("tags", &FIRST_FIELD)),
    head: ("revision-info", &BZR_REVISION_ID),
    ping: "info -- {scheme}://{repo}",
};

static FOSSIL: VcsDescriptor = VcsDescriptor {
    name: "Fossil",
    cmd: "fossil",
    local_marker: ".fossil",
    schemes: &[scheme("https", true), scheme("http", false)],
    create: &[
        step("clone {repo} .fossil", StepDir::NewCheckout),
        step("open .fossil", StepDir::Checkout),
    ],
    download: &[step("up", StepDir::Checkout)],
    tag_sync: &[step("up tag:{tag}", StepDir::Checkout)],
    tag_list: Some(("tag ls", &FIRST_FIELD)),
    head: ("info", &FOSSIL_CHECKOUT),
    ping: "info {scheme}://{repo}",
};

impl VcsKind {
    /// Every kind, in the order local markers are tested.
    pub const ALL: [VcsKind; 5] = [
        VcsKind::Mercurial,
        VcsKind::Git,
        VcsKind::Subversion,
        VcsKind::Bazaar,
        VcsKind::Fossil,
    ];

    /// The static descriptor for this kind.
    pub fn descriptor(self) -> &'static VcsDescriptor {
        match self {
            VcsKind::Mercurial => &HG,
            VcsKind::Git => &GIT,
            VcsKind::Subversion => &SVN,
            VcsKind::Bazaar => &BZR,
            VcsKind::Fossil => &FOSSIL,
        }
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    pub fn cmd(self) -> &'static str {
        self.descriptor().cmd
    }

    pub fn local_marker(self) -> &'static str {
        self.descriptor().local_marker
    }

    /// Look up a kind by executable name (`git`, `hg`, ...), as metadata
    /// records name them.
    pub fn from_cmd(cmd: &str) -> Option<VcsKind> {
        VcsKind::ALL.into_iter().find(|k| k.cmd() == cmd)
    }

    /// Whether `scheme` is secure for this kind.
    ///
    /// An allow-list for this kind replaces the default classification.
    pub fn is_secure_scheme(self, scheme: &str, allow: Option<&ProtocolAllowList>) -> bool {
        if let Some(list) = allow.filter(|l| l.kind() == self) {
            return list.allows(scheme);
        }
        self.descriptor()
            .schemes
            .iter()
            .any(|s| s.secure && s.name == scheme)
    }

    /// Whether fetching `repo` with this kind is safe from passive tampering.
    pub fn is_secure(self, repo: &str, allow: Option<&ProtocolAllowList>) -> bool {
        match url_scheme(repo) {
            Some(scheme) => self.is_secure_scheme(&scheme, allow),
            None => false,
        }
    }

    /// Clone `repo` into `dir`. The parent of `dir` must exist.
    pub fn create(self, runner: &dyn CommandRunner, dir: &Path, repo: &str) -> Result<(), GetError> {
        self.run_steps(runner, self.descriptor().create, dir, &[("repo", repo)])
    }

    /// Update the working copy at `dir` from its remote.
    pub fn download(self, runner: &dyn CommandRunner, dir: &Path) -> Result<(), GetError> {
        self.run_steps(runner, self.descriptor().download, dir, &[])
    }

    /// Check out `tag` (tag, branch or revision) in `dir`.
    pub fn tag_sync(self, runner: &dyn CommandRunner, dir: &Path, tag: &str) -> Result<(), GetError> {
        self.run_steps(runner, self.descriptor().tag_sync, dir, &[("tag", tag)])
    }

    /// List the tags known to the working copy at `dir`.
    pub fn tags(self, runner: &dyn CommandRunner, dir: &Path) -> Result<Vec<String>, GetError> {
        let Some((template, re)) = self.descriptor().tag_list else {
            return Ok(Vec::new());
        };

        let cmd = self.command(template, dir, &[]);
        let output = runner.run(&cmd)?.check(&cmd)?;

        let mut tags: Vec<String> = Vec::new();
        for line in output.stdout_str().lines() {
            if let Some(tag) = re.captures(line.trim_end()).and_then(|c| c.get(1)) {
                if !tags.iter().any(|t| t == tag.as_str()) {
                    tags.push(tag.as_str().to_string());
                }
            }
        }
        Ok(tags)
    }

    /// The revision currently checked out at `dir`, normalized to lowercase.
    pub fn head(self, runner: &dyn CommandRunner, dir: &Path) -> Result<String, GetError> {
        let (template, re) = self.descriptor().head;
        let cmd = self.command(template, dir, &[]);
        let output = runner.run(&cmd)?.check(&cmd)?;

        let stdout = output.stdout_str();
        stdout
            .lines()
            .find_map(|line| re.captures(line.trim()).and_then(|c| c.get(1)))
            .map(|m| m.as_str().to_ascii_lowercase())
            .ok_or_else(|| GetError::ExternalCommandFailed {
                command: cmd.display_command(),
                code: output.code,
                output: format!("unexpected output: {}", stdout.trim()),
            })
    }

    /// Check that `scheme://repo` answers, without cloning it.
    pub fn ping(self, runner: &dyn CommandRunner, scheme: &str, repo: &str) -> Result<(), GetError> {
        let cwd = std::env::temp_dir();
        let cmd = self.command(
            self.descriptor().ping,
            &cwd,
            &[("scheme", scheme), ("repo", repo)],
        );
        runner.run(&cmd)?.check(&cmd)?;
        Ok(())
    }

    fn run_steps(
        self,
        runner: &dyn CommandRunner,
        steps: &[CmdStep],
        dir: &Path,
        vars: &[(&str, &str)],
    ) -> Result<(), GetError> {
        let dir_str = dir.to_string_lossy();
        let mut all_vars = vec![("dir", dir_str.as_ref())];
        all_vars.extend_from_slice(vars);

        for step in steps {
            let cwd = match step.dir {
                StepDir::Parent => dir.parent().unwrap_or(dir),
                StepDir::Checkout => dir,
                StepDir::NewCheckout => {
                    ensure_dir(dir)?;
                    dir
                }
            };
            let cmd = self.command(step.template, cwd, &all_vars);
            runner.run(&cmd)?.check(&cmd)?;
        }
        Ok(())
    }

    /// Build the process for one template, running in `cwd`.
    fn command(self, template: &str, cwd: &Path, vars: &[(&str, &str)]) -> ProcessBuilder {
        let args = template.split_whitespace().map(|arg| expand(arg, vars));
        let cmd = ProcessBuilder::new(self.cmd()).args(args).cwd(cwd);
        match self {
            // A missing credential must fail the command rather than prompt.
            VcsKind::Git => cmd
                .env_default("GIT_TERMINAL_PROMPT", "0")
                .env_default("GCM_INTERACTIVE", "never"),
            _ => cmd,
        }
    }
}

/// Substitute `{key}` placeholders in a single argument.
fn expand(arg: &str, vars: &[(&str, &str)]) -> String {
    let mut out = arg.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{}}}", key), value);
    }
    out
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VcsKind {
    type Err = GetError;

    /// Accepts the executable name (`hg`) or the display name (`mercurial`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        VcsKind::ALL
            .into_iter()
            .find(|k| k.cmd() == lower || k.name().eq_ignore_ascii_case(&lower))
            .ok_or_else(|| GetError::UnknownVcs {
                name: s.to_string(),
            })
    }
}
