// Probe output protocol: `cargo:rustc-cfg=` directives -> `--cfg=` flags

use std::fmt;
use std::str::Lines;

/// Directive prefix selected from probe stdout (anchored, case-sensitive)
pub const RUSTC_CFG_PREFIX: &str = "cargo:rustc-cfg=";

/// Prefix of every emitted compiler flag
pub const CFG_FLAG_PREFIX: &str = "--cfg=";

/// Diagnostic directive; surfaced in logs, never written to the artifact
const WARNING_PREFIX: &str = "cargo:warning=";

/// A compiler cfg flag produced from exactly one matching directive line.
///
/// Holds the directive remainder verbatim; `Display` renders `--cfg=<value>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CfgFlag(String);

impl CfgFlag {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The cfg value without the `--cfg=` prefix
    pub fn value(&self) -> &str {
        &self.0
    }

    /// Parse a single probe line; `None` unless it starts with the directive prefix
    pub fn from_directive(line: &str) -> Option<Self> {
        line.strip_prefix(RUSTC_CFG_PREFIX).map(Self::new)
    }
}

impl fmt::Display for CfgFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CFG_FLAG_PREFIX, self.0)
    }
}

/// Lazy iterator over the cfg flags of a captured probe output.
///
/// `Clone` restarts the sequence from the same position, since the input is
/// fully materialized.
#[derive(Clone)]
pub struct CfgFlags<'a> {
    lines: Lines<'a>,
}

impl Iterator for CfgFlags<'_> {
    type Item = CfgFlag;

    fn next(&mut self) -> Option<CfgFlag> {
        self.lines.by_ref().find_map(CfgFlag::from_directive)
    }
}

/// Select `cargo:rustc-cfg=` lines from `raw` and rewrite them as cfg flags.
///
/// Total: lines that do not match are dropped. Accepts `\n` and `\r\n`
/// terminators, with or without a terminator on the final line. Duplicates
/// are kept, in original order.
pub fn transform(raw: &str) -> CfgFlags<'_> {
    CfgFlags { lines: raw.lines() }
}

/// `cargo:warning=` messages emitted by the probe, in order
pub fn warnings(raw: &str) -> impl Iterator<Item = &str> + '_ {
    raw.lines()
        .filter_map(|line| line.strip_prefix(WARNING_PREFIX))
}
