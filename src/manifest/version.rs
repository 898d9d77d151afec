//! Version-string repair for manifests with non-semver version fields.
//!
//! The packaging tool downstream refuses any `version` field that is not
//! strict semver, while upstream releases sometimes ship `YYMMDD.HHMM` build
//! stamps (invalid whenever the minute group has a leading zero) or worse.
//! [`normalize`] coerces any raw string into a valid semantic version through
//! an ordered fallback policy:
//!
//! 1. empty input → `0.0.0`
//! 2. strict semver → passed through unchanged
//! 3. `NNNNNN.NNNN` build stamp → `NNNNNN.<NNNN as integer>.0`
//! 4. anything else → `0.0.0+<sanitized original>`
//!
//! The function is total: every input maps to a valid output, and running it
//! again on its own output is a no-op.

use std::sync::LazyLock;

use regex::Regex;
use semver::Version;

/// Six-digit date, dot, four-digit time, e.g. `260202.0859`.
static BUILD_STAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{6})\.(\d{4})$").expect("valid regex"));

/// Runs of characters that may not appear in semver build metadata.
static INVALID_METADATA_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9A-Za-z-]+").expect("valid regex"));

/// Outcome of normalizing a raw manifest version string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizationResult {
    /// Strict-semver version, valid for any input.
    pub version: String,
    /// True when the output differs from the input.
    pub was_modified: bool,
    /// Human-readable note about the repair, when one was applied.
    pub warning: Option<String>,
}

impl NormalizationResult {
    fn unchanged(version: &str) -> Self {
        Self {
            version: version.to_string(),
            was_modified: false,
            warning: None,
        }
    }

    fn repaired(version: String, warning: String) -> Self {
        Self {
            version,
            was_modified: true,
            warning: Some(warning),
        }
    }
}

/// Coerce a raw version string into strict semver.
///
/// Ordered policy, first match wins; see the module docs. Never fails.
pub fn normalize(raw: &str) -> NormalizationResult {
    if raw.is_empty() {
        return NormalizationResult::repaired(
            "0.0.0".to_string(),
            "no version field; defaulted to 0.0.0".to_string(),
        );
    }

    if Version::parse(raw).is_ok() {
        return NormalizationResult::unchanged(raw);
    }

    if let Some(caps) = BUILD_STAMP.captures(raw) {
        let date = &caps[1];
        // The time group re-parses as an integer so a leading zero
        // (e.g. `.0859`) cannot leak into a semver numeric field.
        let time: u32 = caps[2].parse().expect("four digits fit in u32");
        let version = format!("{date}.{time}.0");
        return NormalizationResult::repaired(
            version.clone(),
            format!("build-stamp version {raw:?} rewritten as {version:?}"),
        );
    }

    let sanitized = sanitize_metadata(raw);
    let version = format!("0.0.0+{sanitized}");
    NormalizationResult::repaired(
        version.clone(),
        format!("unparseable version {raw:?} replaced with {version:?}"),
    )
}

/// Reduce an arbitrary string to valid semver build metadata: runs of
/// disallowed characters collapse to a single `.`, edge dots are stripped,
/// and an empty result becomes the literal `unknown`.
fn sanitize_metadata(raw: &str) -> String {
    let collapsed = INVALID_METADATA_CHARS.replace_all(raw, ".");
    let trimmed = collapsed.trim_matches('.');
    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed.to_string()
    }
}
