//! Per-protocol byte accounting over dissected captures.
//!
//! The core of the crate is the [`ByteCounter`] family: one stateless
//! counter per protocol (TCP, UDP, TLS, HTTP/2, QUIC, HTTP/3), each
//! attributing the bytes of a single packet to its protocol, framing
//! overhead included. [`CaptureCounter`] aggregates a set of counters over a
//! whole capture. The correlation utilities map TLS server names to
//! transport streams and build the display filters scoping a capture to
//! those streams.

#[macro_use]
extern crate log;

mod batch;
mod capture_counter;
mod counter;
pub mod counters;
mod correlation;
mod filter;
mod layers;
mod output;

pub use batch::*;
pub use capture_counter::*;
pub use counter::*;
pub use correlation::*;
pub use filter::*;
pub use layers::*;
pub use output::*;
