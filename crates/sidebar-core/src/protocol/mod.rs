//! Protocol module containing packet types, version eras, wire primitives and
//! the versioned codec.

pub mod codec;
pub mod packets;
pub mod version;
pub mod wire;

pub use codec::{decode_packet, encode_packet, ProtocolError};
pub use packets::*;
pub use version::{Era, PacketIds, ProtocolVersion};
