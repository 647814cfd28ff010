//! Closed enumerations carried on the wire: event [`Type`] and [`Severity`].
//!
//! Each enum has exactly one absent member (`Type::Unknown`, `Severity::None`).
//! The absent member has no wire token: it serializes to JSON `null` and to
//! SQL NULL, and only those null representations decode back to it.
//!
//! Every other member maps to exactly one lowercase, hyphenated token through
//! the explicit `ALL` table of its enum. Rust identifiers play no part in the
//! mapping, so renaming or reordering variants never changes the wire format.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// A token could not be mapped onto a member of a closed enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The token is not in the enumeration's table. This includes the
    /// spelled-out name of the absent member (`"none"`, `"unknown"`).
    UnknownToken { kind: &'static str, token: String },
    /// A raw storage value was not valid UTF-8.
    InvalidUtf8 { kind: &'static str },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnknownToken { kind, token } => write!(f, "unknown {kind} {token:?}"),
            ParseError::InvalidUtf8 { kind } => {
                write!(f, "{kind} storage value is not valid UTF-8")
            }
        }
    }
}

impl std::error::Error for ParseError {}

// ---------------------------------------------------------------------------
// Shared codec
// ---------------------------------------------------------------------------

/// Generates the token table, parsing, JSON and storage conversions for one
/// closed enumeration. `$absent` is the member without a wire token.
macro_rules! closed_enum {
    (
        $name:ident, kind = $kind:literal, absent = $absent:ident ($absent_str:literal),
        { $($variant:ident => $token:literal),+ $(,)? }
    ) => {
        impl $name {
            /// Every member that has a wire token, with that token.
            pub const ALL: &'static [($name, &'static str)] = &[$(($name::$variant, $token)),+];

            /// Parse a wire token. Only tokens from [`Self::ALL`] are accepted.
            pub fn parse(token: &str) -> Result<Self, ParseError> {
                Self::ALL
                    .iter()
                    .find(|(_, t)| *t == token)
                    .map(|(v, _)| *v)
                    .ok_or_else(|| ParseError::UnknownToken {
                        kind: $kind,
                        token: token.to_string(),
                    })
            }

            /// Wire token, `None` exactly for the absent member.
            pub fn token(&self) -> Option<&'static str> {
                match self {
                    $name::$absent => None,
                    $($name::$variant => Some($token),)+
                }
            }

            /// Human-readable spelling for logs and error messages.
            ///
            /// The absent member's spelling is never emitted on the wire and
            /// is rejected by [`Self::parse`].
            pub fn as_str(&self) -> &'static str {
                self.token().unwrap_or($absent_str)
            }

            pub fn is_absent(&self) -> bool {
                matches!(self, $name::$absent)
            }

            /// Relational representation: `None` (SQL NULL) exactly when absent.
            pub fn to_storage(&self) -> Option<&'static str> {
                self.token()
            }

            /// Decode a relational value. NULL maps to the absent member; any
            /// other value must be a known token. There is no fallback default.
            pub fn from_storage(raw: Option<&str>) -> Result<Self, ParseError> {
                match raw {
                    None => Ok($name::$absent),
                    Some(s) => Self::parse(s),
                }
            }

            /// Like [`Self::from_storage`] for drivers handing out raw bytes.
            pub fn from_storage_bytes(raw: Option<&[u8]>) -> Result<Self, ParseError> {
                match raw {
                    None => Ok($name::$absent),
                    Some(bytes) => {
                        let s = std::str::from_utf8(bytes)
                            .map_err(|_| ParseError::InvalidUtf8 { kind: $kind })?;
                        Self::parse(s)
                    }
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$absent
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, ParseError> {
                Self::parse(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                match self.token() {
                    Some(t) => serializer.serialize_str(t),
                    None => serializer.serialize_none(),
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                match Option::<String>::deserialize(deserializer)? {
                    None => Ok($name::$absent),
                    Some(s) => Self::parse(&s).map_err(serde::de::Error::custom),
                }
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Type
// ---------------------------------------------------------------------------

/// What happened to the object an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// Absent / unset. Serializes to `null`.
    Unknown,
    AcknowledgementCleared,
    AcknowledgementSet,
    Custom,
    DowntimeEnd,
    DowntimeRemoved,
    DowntimeStart,
    FlappingEnd,
    FlappingStart,
    IncidentAge,
    Mute,
    State,
    Unmute,
}

closed_enum!(Type, kind = "type", absent = Unknown("unknown"), {
    AcknowledgementCleared => "acknowledgement-cleared",
    AcknowledgementSet => "acknowledgement-set",
    Custom => "custom",
    DowntimeEnd => "downtime-end",
    DowntimeRemoved => "downtime-removed",
    DowntimeStart => "downtime-start",
    FlappingEnd => "flapping-end",
    FlappingStart => "flapping-start",
    IncidentAge => "incident-age",
    Mute => "mute",
    State => "state",
    Unmute => "unmute",
});

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// How severe an event is, ordered by escalation (`Ok < ... < Emerg`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Absent / unset. Serializes to `null`, omitted from the envelope.
    None,
    Ok,
    Debug,
    Info,
    Notice,
    Warning,
    Err,
    Crit,
    Alert,
    Emerg,
}

closed_enum!(Severity, kind = "severity", absent = None("none"), {
    Ok => "ok",
    Debug => "debug",
    Info => "info",
    Notice => "notice",
    Warning => "warning",
    Err => "err",
    Crit => "crit",
    Alert => "alert",
    Emerg => "emerg",
});

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
