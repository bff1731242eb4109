//! WebSocket close codes sent by the gateway

use serde::{Deserialize, Serialize};

/// Gateway WebSocket close codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum CloseCode {
    /// Unknown error occurred
    UnknownError = 4000,
    /// No inbound frame within the idle timeout
    IdleTimeout = 4008,
    /// The session's event queue overflowed
    SlowConsumer = 4009,
}

impl CloseCode {
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            4000 => Some(Self::UnknownError),
            4008 => Some(Self::IdleTimeout),
            4009 => Some(Self::SlowConsumer),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Check if the client should attempt to reconnect after this close code
    #[must_use]
    pub const fn should_reconnect(self) -> bool {
        matches!(self, Self::UnknownError | Self::SlowConsumer)
    }

    /// Close reason text
    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self {
            Self::UnknownError => "Unknown error",
            Self::IdleTimeout => "Idle timeout",
            Self::SlowConsumer => "Slow consumer",
        }
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.reason(), self.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_code_roundtrip() {
        for code in [CloseCode::UnknownError, CloseCode::IdleTimeout, CloseCode::SlowConsumer] {
            assert_eq!(CloseCode::from_u16(code.as_u16()), Some(code));
        }
        assert_eq!(CloseCode::from_u16(1000), None);
    }

    #[test]
    fn test_values() {
        assert_eq!(u16::from(CloseCode::IdleTimeout), 4008);
        assert_eq!(CloseCode::SlowConsumer.as_u16(), 4009);
        assert!(!CloseCode::IdleTimeout.should_reconnect());
        assert_eq!(CloseCode::SlowConsumer.to_string(), "Slow consumer (4009)");
    }
}
