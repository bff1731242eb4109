//! Numeric identifiers assigned by storage
//!
//! Rooms, messages, and users are keyed by 64-bit integers. Each kind gets
//! its own newtype so a `RoomId` can never be passed where a `UserId` is
//! expected. All of them serialize as plain JSON numbers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when an id string is not a valid integer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} id: {value}")]
pub struct IdParseError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            #[inline]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            #[inline]
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self).map_err(|_| IdParseError {
                    kind: $kind,
                    value: s.to_string(),
                })
            }
        }
    };
}

define_id!(
    /// Identifier of an account, issued by the external account service
    UserId,
    "user"
);
define_id!(
    /// Identifier of a room
    RoomId,
    "room"
);
define_id!(
    /// Identifier of a persisted message
    MessageId,
    "message"
);
