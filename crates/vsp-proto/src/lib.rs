//! Wire format of the vsp simulation control protocol.
//!
//! A client drives a running simulation over a single stream connection.
//! Commands travel as RSP-style packets (`$payload#cs`), each payload being a
//! single-letter command code followed by comma-separated fields. While the
//! simulation runs, the client may interrupt it with single raw bytes sent
//! outside of any packet.
//!
//! ## Layers
//!
//! ```text
//! vsp-proto
//!   ├─ escape    (delimiter escaping inside free-text fields)
//!   ├─ codec     (packet / signal / ack framing for tokio_util::codec)
//!   ├─ request   (command code + field splitting)
//!   ├─ signal    (out-of-band interrupt bytes)
//!   └─ reply     (fixed reply packets)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod errors;
pub mod escape;
pub mod reply;
pub mod request;
pub mod signal;

pub use codec::{DEFAULT_MAX_PACKET_LEN, Frame, RspCodec};
pub use errors::ProtocolError;
pub use escape::{ESCAPE, escape, unescape};
pub use request::{FIELD_DELIMITER, Request};
pub use signal::Signal;
