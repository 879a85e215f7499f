/// Suppression rule set and path normalization
use crate::config::types::{Severity, SeverityMask};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::borrow::Cow;

/// Canonicalize path separators to `/`.
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    if path.contains('\\') {
        Cow::Owned(path.replace('\\', "/"))
    } else {
        Cow::Borrowed(path)
    }
}

/// Normalize one configured prefix. Returns `None` for entries that are
/// empty once trimmed. Idempotent.
pub fn normalize_prefix(raw: &str) -> Option<String> {
    let normalized = normalize_path(raw.trim());
    if normalized.is_empty() {
        None
    } else {
        Some(normalized.into_owned())
    }
}

/// Immutable configuration of one interceptor: which severities may be
/// suppressed, and which origin paths they must come from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    prefixes: Vec<String>,
    severity_mask: SeverityMask,
}

impl RuleSet {
    pub fn new<I, S>(prefixes: I, severity_mask: SeverityMask) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            prefixes: prefixes
                .into_iter()
                .filter_map(|prefix| normalize_prefix(prefix.as_ref()))
                .collect(),
            severity_mask,
        }
    }

    /// Build from the newline-separated `dirs` settings value
    pub fn from_dirs(dirs: &str, severity_mask: SeverityMask) -> Self {
        Self::new(dirs.lines(), severity_mask)
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn severity_mask(&self) -> SeverityMask {
        self.severity_mask
    }

    /// Nothing can ever be suppressed
    pub fn is_inert(&self) -> bool {
        self.severity_mask.is_empty() || self.prefixes.is_empty()
    }

    pub fn covers(&self, severity: Severity) -> bool {
        self.severity_mask.contains(severity)
    }

    /// First configured prefix contained in `origin_file`.
    ///
    /// Case-sensitive substring containment on the separator-normalized
    /// path; no wildcard semantics.
    pub fn matching_prefix(&self, origin_file: &str) -> Option<&str> {
        let file = normalize_path(origin_file);
        self.prefixes
            .iter()
            .find(|prefix| file.contains(prefix.as_str()))
            .map(String::as_str)
    }

    /// SHA-256 over mask and prefixes, hex encoded
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.severity_mask.bits().to_be_bytes());
        for prefix in &self.prefixes {
            hasher.update(prefix.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}
