//! External tool checks for generated projects.
//!
//! Templates list the tools their output needs (`requires`). After creation
//! each tool is looked up on `PATH` with [`which`] and, when a minimum version
//! is declared, `tool --version` is run and the first `X.Y[.Z]` found is
//! compared. Problems are reported as [`PrereqWarning`]s, never as errors: a
//! tool that prints no recognizable version is skipped.

use std::fmt;
use std::process::Command;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::registry::ToolRequirement;

static VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?").expect("version pattern is valid")
});

/// A `major.minor.patch` version. A missing patch component reads as `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// First `X.Y[.Z]` in `s`, e.g. `v20.11.1`, `npm 10.2`, `node@18.0.0`.
    pub fn parse(s: &str) -> Option<Self> {
        VERSION.captures_iter(s).find_map(|caps| {
            let major = caps[1].parse().ok()?;
            let minor = caps[2].parse().ok()?;
            let patch = match caps.get(3) {
                Some(m) => m.as_str().parse().ok()?,
                None => 0,
            };
            Some(Self::new(major, minor, patch))
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Run `tool --version` and parse stdout, falling back to stderr.
pub fn detect_version(tool: &str) -> Option<Version> {
    let output = Command::new(tool).arg("--version").output().ok()?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    Version::parse(&stdout).or_else(|| Version::parse(&String::from_utf8_lossy(&output.stderr)))
}

/// A tool the generated project needs but that is absent or too old.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrereqWarning {
    Missing {
        tool: String,
        install: String,
    },
    Outdated {
        tool: String,
        found: Version,
        minimum: Version,
        install: String,
    },
}

impl fmt::Display for PrereqWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { tool, install } => {
                write!(f, "missing: {tool} (install: {install})")
            }
            Self::Outdated {
                tool,
                found,
                minimum,
                install,
            } => write!(
                f,
                "{tool} {found} is older than the required {minimum} (upgrade: {install})"
            ),
        }
    }
}

/// Check every requirement against the tools on `PATH`.
pub fn check(requirements: &[ToolRequirement]) -> Vec<PrereqWarning> {
    check_with(requirements, |tool| which::which(tool).is_ok(), detect_version)
}

/// [`check`] with the tool lookup and version probe supplied by the caller.
pub fn check_with(
    requirements: &[ToolRequirement],
    installed: impl Fn(&str) -> bool,
    version_of: impl Fn(&str) -> Option<Version>,
) -> Vec<PrereqWarning> {
    let mut warnings = Vec::new();

    for req in requirements {
        if !installed(&req.tool) {
            warnings.push(PrereqWarning::Missing {
                tool: req.tool.clone(),
                install: req.install.clone(),
            });
            continue;
        }

        let Some(minimum) = req.minimum_version.as_deref().and_then(Version::parse) else {
            continue;
        };
        match version_of(&req.tool) {
            Some(found) if found < minimum => warnings.push(PrereqWarning::Outdated {
                tool: req.tool.clone(),
                found,
                minimum,
                install: req.install.clone(),
            }),
            Some(_) => {}
            None => debug!("could not detect {} version, skipping check", req.tool),
        }
    }

    warnings
}
