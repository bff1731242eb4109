//! Wire protocol: close codes and JSON envelopes.

mod close_codes;
mod messages;

pub use close_codes::CloseCode;
pub use messages::{encode_event, rejection_frame, InboundMessage};
