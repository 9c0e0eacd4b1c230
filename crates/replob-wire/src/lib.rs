//! # replob-wire: the on-the-wire message schema
//!
//! Everything a connection between two nodes ever sends is a [`Message`],
//! framed by [`framing::write_message`]/[`framing::read_message`] as an
//! 8-byte little-endian length prefix followed by a `postcard`-encoded
//! payload, capped at [`framing::MAX_FRAME_BYTES`].
//!
//! This replaces the source's closure-pointer-diffing `AnyMsg` serialization
//! (`node.h`'s `// gotcha!` comment marks exactly the spot) with an explicit,
//! versioned enum — the price of giving up zero-copy dispatch is a format
//! that doesn't depend on every node running byte-identical binaries.

mod error;
mod framing;
mod message;

pub use error::WireError;
pub use framing::{read_message, write_message, MAX_FRAME_BYTES};
pub use message::{CarryEntry, Command, Message};
