/// Core types shared by the diagsieve configuration and sink layers
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;
use thiserror::Error;

/// Diagnostic kind raised by the host runtime.
///
/// The discriminants are stable single-bit values so that a severity mask
/// can be stored and exchanged as a plain integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum Severity {
    Error = 1,
    Warning = 2,
    Parse = 4,
    Notice = 8,
    CoreError = 16,
    CoreWarning = 32,
    CompileError = 64,
    CompileWarning = 128,
    UserError = 256,
    UserWarning = 512,
    UserNotice = 1024,
    Strict = 2048,
    RecoverableError = 4096,
    Deprecated = 8192,
    UserDeprecated = 16384,
}

impl Severity {
    /// Every kind, in bit order
    pub const ALL: [Severity; 15] = [
        Severity::Error,
        Severity::Warning,
        Severity::Parse,
        Severity::Notice,
        Severity::CoreError,
        Severity::CoreWarning,
        Severity::CompileError,
        Severity::CompileWarning,
        Severity::UserError,
        Severity::UserWarning,
        Severity::UserNotice,
        Severity::Strict,
        Severity::RecoverableError,
        Severity::Deprecated,
        Severity::UserDeprecated,
    ];

    pub fn bit(self) -> u32 {
        self as u32
    }

    /// Kind for an exact single bit, `None` for zero, unknown or combined bits
    pub fn from_bits(bits: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.bit() == bits)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Parse => "parse",
            Severity::Notice => "notice",
            Severity::CoreError => "core_error",
            Severity::CoreWarning => "core_warning",
            Severity::CompileError => "compile_error",
            Severity::CompileWarning => "compile_warning",
            Severity::UserError => "user_error",
            Severity::UserWarning => "user_warning",
            Severity::UserNotice => "user_notice",
            Severity::Strict => "strict",
            Severity::RecoverableError => "recoverable_error",
            Severity::Deprecated => "deprecated",
            Severity::UserDeprecated => "user_deprecated",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = SieveError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| SieveError::InvalidSeverity(s.to_string()))
    }
}

/// Set of severity kinds eligible for suppression
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeverityMask(u32);

impl SeverityMask {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Severity::ALL.iter().copied().collect()
    }

    /// Build a mask from raw bits. Bits that name no severity are dropped.
    pub fn from_bits(bits: u32) -> Self {
        Self(bits & Self::all().0)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, severity: Severity) -> bool {
        self.0 & severity.bit() != 0
    }

    pub fn insert(&mut self, severity: Severity) {
        self.0 |= severity.bit();
    }

    pub fn remove(&mut self, severity: Severity) {
        self.0 &= !severity.bit();
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Severity> {
        Severity::ALL
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }
}

impl Default for SeverityMask {
    /// Warnings, notices and deprecations from both the runtime and user code
    fn default() -> Self {
        Severity::Warning
            | Severity::Notice
            | Severity::UserWarning
            | Severity::UserNotice
            | Severity::Deprecated
            | Severity::UserDeprecated
    }
}

impl fmt::Debug for SeverityMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SeverityMask({})", self)
    }
}

impl fmt::Display for SeverityMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.iter().map(Severity::as_str).collect();
        f.write_str(&names.join("|"))
    }
}

impl FromStr for SeverityMask {
    type Err = SieveError;

    /// Accepts a plain integer (`8194`) or a list of names separated by `|`
    /// or `,` (`deprecated|warning`).
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(SieveError::InvalidMask(s.to_string()));
        }

        if let Ok(bits) = trimmed.parse::<u32>() {
            if bits & !Self::all().0 != 0 {
                return Err(SieveError::InvalidMask(s.to_string()));
            }
            return Ok(Self(bits));
        }

        let mut mask = Self::empty();
        for name in trimmed.split(['|', ',']) {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let severity: Severity = name
                .parse()
                .map_err(|_| SieveError::InvalidMask(s.to_string()))?;
            mask.insert(severity);
        }
        Ok(mask)
    }
}

impl From<Severity> for SeverityMask {
    fn from(severity: Severity) -> Self {
        Self(severity.bit())
    }
}

impl FromIterator<Severity> for SeverityMask {
    fn from_iter<I: IntoIterator<Item = Severity>>(iter: I) -> Self {
        let mut mask = Self::empty();
        for severity in iter {
            mask.insert(severity);
        }
        mask
    }
}

impl BitOr for Severity {
    type Output = SeverityMask;

    fn bitor(self, rhs: Severity) -> SeverityMask {
        SeverityMask(self.bit() | rhs.bit())
    }
}

impl BitOr<Severity> for SeverityMask {
    type Output = SeverityMask;

    fn bitor(self, rhs: Severity) -> SeverityMask {
        SeverityMask(self.0 | rhs.bit())
    }
}

impl BitOr for SeverityMask {
    type Output = SeverityMask;

    fn bitor(self, rhs: SeverityMask) -> SeverityMask {
        SeverityMask(self.0 | rhs.0)
    }
}

impl BitOrAssign<Severity> for SeverityMask {
    fn bitor_assign(&mut self, rhs: Severity) {
        self.insert(rhs);
    }
}

#[derive(Error, Debug)]
pub enum SieveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown severity: {0}")]
    InvalidSeverity(String),

    #[error("Invalid severity mask: {0}")]
    InvalidMask(String),
}

pub type Result<T> = std::result::Result<T, SieveError>;
