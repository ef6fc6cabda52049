//! Frame Codec (`spec.md` §4.1) — hand-rolled RFC 6455 framing.
//!
//! Grounded on `fastwebsockets`' byte-level frame header parsing rather
//! than on the teacher (which delegates framing to axum's `WebSocketUpgrade`
//! and never touches raw frames itself).

pub mod frame;
pub mod handshake;

pub use frame::{decode_frame, encode_text_frame, DecodeOutcome};
pub use handshake::accept_key;
