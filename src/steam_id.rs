//! Canonical 64-bit Steam account identifiers

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Every individual-account SteamID64 starts with this prefix.
pub const CANONICAL_PREFIX: &str = "765611";

/// Length of a SteamID64 in decimal digits.
pub const CANONICAL_LEN: usize = 17;

// A prefixed 17-digit id that is not part of a longer digit run
static EMBEDDED_CANONICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\D)(765611\d{11})(?:\D|$)").expect("valid regex"));

static ANY_SEVENTEEN_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{17}").expect("valid regex"));

/// A 17-digit numeric account id, the only identifier the aggregation
/// gateway accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CanonicalAccountId(String);

impl CanonicalAccountId {
    /// Accept any string of exactly 17 ASCII digits.
    pub fn new(raw: &str) -> Option<Self> {
        is_seventeen_digits(raw).then(|| Self(raw.to_string()))
    }

    /// Find a prefixed id anywhere inside `input`.
    pub fn find_embedded(input: &str) -> Option<Self> {
        EMBEDDED_CANONICAL
            .captures(input)
            .and_then(|c| c.get(1))
            .map(|m| Self(m.as_str().to_string()))
    }

    /// Find the first run of 17 digits anywhere inside `input`, prefix or not.
    pub fn find_digit_run(input: &str) -> Option<Self> {
        ANY_SEVENTEEN_DIGITS
            .find(input)
            .map(|m| Self(m.as_str().to_string()))
    }

    pub fn has_canonical_prefix(&self) -> bool {
        self.0.starts_with(CANONICAL_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn profile_url(&self) -> String {
        format!("https://steamcommunity.com/profiles/{}/", self.0)
    }
}

pub fn is_seventeen_digits(s: &str) -> bool {
    s.len() == CANONICAL_LEN && s.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for CanonicalAccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CanonicalAccountId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.trim()).ok_or_else(|| format!("{s:?} is not a 17-digit account id"))
    }
}

impl TryFrom<String> for CanonicalAccountId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CanonicalAccountId> for String {
    fn from(id: CanonicalAccountId) -> Self {
        id.0
    }
}
