//! Audio transport: a single decoder/output session at a time.
//!
//! [`Transport`] is the seam the player coordinator drives; the
//! [`RodioTransport`] implementation wraps a rodio output stream and sink.

mod sink;
mod transport;

pub use transport::{RodioTransport, Transport};
