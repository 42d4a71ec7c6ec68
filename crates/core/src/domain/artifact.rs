// Output artifact format: one `--cfg=` flag per line

use serde::{Deserialize, Serialize};

use super::directive::CfgFlag;

/// Result of persisting an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WriteOutcome {
    /// Destination was created or replaced
    Written,
    /// Destination already held identical bytes and was left untouched
    Unchanged,
}

impl std::fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteOutcome::Written => write!(f, "WRITTEN"),
            WriteOutcome::Unchanged => write!(f, "UNCHANGED"),
        }
    }
}

/// Serialize flags as the artifact body.
///
/// Every flag is followed by `\n`; no header, no trailing metadata. An empty
/// flag list renders to an empty string.
pub fn render_artifact<'a, I>(flags: I) -> String
where
    I: IntoIterator<Item = &'a CfgFlag>,
{
    flags.into_iter().fold(String::new(), |mut body, flag| {
        body.push_str(&flag.to_string());
        body.push('\n');
        body
    })
}
