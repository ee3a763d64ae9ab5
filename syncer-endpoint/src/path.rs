//! Public path grammar for the virtual-workspace endpoint (§4.8).

use regex::Regex;
use std::sync::LazyLock;

static PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/services/syncer/([^/]+)/clusters/([^/]+)(/.*)?$").expect("static regex is valid"));

/// `(syncerID, workspace, remainder)` recovered from a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    /// The identity the remote syncer authenticated as.
    pub syncer_id: String,
    /// The logical workspace it's acting against.
    pub workspace: String,
    /// Everything after `/clusters/<workspace>`, including the leading `/`. Empty if absent.
    pub remainder: String,
}

impl ParsedPath {
    /// `/services/syncer/<syncerID>/clusters/<workspace>`, with `remainder` stripped
    /// (§4.8 "returns the prefix ... so that downstream routing operates on remainder").
    pub fn prefix(&self) -> String {
        format!("/services/syncer/{}/clusters/{}", self.syncer_id, self.workspace)
    }
}

/// Parse `path` against the syncer virtual-endpoint grammar. Empty captures
/// (e.g. `/services/syncer//clusters/x`) are rejected (§4.8).
pub fn parse(path: &str) -> Option<ParsedPath> {
    let captures = PATTERN.captures(path)?;
    let syncer_id = captures.get(1)?.as_str();
    let workspace = captures.get(2)?.as_str();
    if syncer_id.is_empty() || workspace.is_empty() {
        return None;
    }
    Some(ParsedPath {
        syncer_id: syncer_id.to_string(),
        workspace: workspace.to_string(),
        remainder: captures.get(3).map(|m| m.as_str().to_string()).unwrap_or_default(),
    })
}
