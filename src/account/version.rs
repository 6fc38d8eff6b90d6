use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?").expect("valid version regex"));

/// A `major.minor.patch` version of an Enterprise Server host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Loosely coerce the first numeric `x[.y[.z]]` run of `raw` into a
    /// version, filling missing components with zero.
    pub fn coerce(raw: &str) -> Option<Self> {
        let caps = VERSION_PATTERN.captures(raw)?;
        let part = |i: usize| -> Option<u64> {
            match caps.get(i) {
                Some(m) => m.as_str().parse().ok(),
                None => Some(0),
            }
        };
        Some(Self::new(part(1)?, part(2)?, part(3)?))
    }

    /// True when this version is at least `major.minor`.
    pub fn at_least(&self, major: u64, minor: u64) -> bool {
        self.major > major || (self.major == major && self.minor >= minor)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = String;

    /// Strict `major.minor.patch` parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 3 {
            return Err(format!("Invalid version '{}': expected major.minor.patch", s));
        }

        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(parts) {
            *slot = part
                .parse()
                .map_err(|e| format!("Invalid version '{}': {}", s, e))?;
        }
        Ok(Self::new(numbers[0], numbers[1], numbers[2]))
    }
}

/// The version a host reports. Cloud hosts are always `Latest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HostVersion {
    Latest,
    Release(Version),
}

impl fmt::Display for HostVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostVersion::Latest => write!(f, "latest"),
            HostVersion::Release(version) => write!(f, "{}", version),
        }
    }
}

impl FromStr for HostVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("latest") {
            return Ok(HostVersion::Latest);
        }
        s.parse().map(HostVersion::Release)
    }
}

impl TryFrom<String> for HostVersion {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HostVersion> for String {
    fn from(value: HostVersion) -> Self {
        value.to_string()
    }
}

/// Normalize the version string a host reports.
///
/// No header means the host is cloud and always current. Otherwise the
/// first numeric run is coerced, so `"enterprise-server@3.9"` becomes 3.9.0.
/// Unparseable values yield `None`.
pub fn extract_host_version(raw: Option<&str>) -> Option<HostVersion> {
    match raw {
        None => Some(HostVersion::Latest),
        Some(raw) => Version::coerce(raw).map(HostVersion::Release),
    }
}
