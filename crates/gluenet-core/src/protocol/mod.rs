//! Protocol module containing frame types, the binary codec and the outbound sink seam.

pub mod codec;
pub mod messages;
pub mod sink;

pub use codec::{decode_frame, encode_frame, ProtocolError};
pub use messages::*;
pub use sink::FrameSink;
