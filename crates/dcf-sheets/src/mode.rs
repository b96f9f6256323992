//! Access modes
//!
//! A session is opened in exactly one mode and keeps it. Each mode includes
//! everything the previous one allows:
//!
//! | mode | reads | writes and sheet lifecycle | save, formula evaluation |
//! |---|---|---|---|
//! | [`Mode::ReadOnly`] | yes | no | no |
//! | [`Mode::Mutable`] | yes | yes | evaluation against the opened file only |
//! | [`Mode::Persistent`] | yes | yes | yes |

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Capability level of a [`Session`](crate::Session)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mode {
    /// Load and query; nothing is written back
    ReadOnly,
    /// In-memory edits with no way to persist them
    Mutable,
    /// Edits, saving, and auto-save on a clean close
    Persistent,
}

impl Mode {
    /// The mode's short name: `read`, `modify` or `write`
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::ReadOnly => "read",
            Mode::Mutable => "modify",
            Mode::Persistent => "write",
        }
    }

    pub fn can_modify(self) -> bool {
        self >= Mode::Mutable
    }

    pub fn can_persist(self) -> bool {
        self == Mode::Persistent
    }

    /// Fail with `CapabilityDenied` unless this mode includes `needed`
    pub(crate) fn require(
        self,
        needed: Mode,
        operation: &'static str,
    ) -> dcf_sheets_core::Result<()> {
        if self >= needed {
            Ok(())
        } else {
            Err(dcf_sheets_core::Error::CapabilityDenied {
                operation,
                mode: self.as_str(),
            })
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    /// Accepts `r`/`read`, `m`/`modify` and `w`/`write`, ignoring case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "r" | "read" => Ok(Mode::ReadOnly),
            "m" | "modify" => Ok(Mode::Mutable),
            "w" | "write" => Ok(Mode::Persistent),
            _ => Err(Error::UnknownMode(s.to_string())),
        }
    }
}
