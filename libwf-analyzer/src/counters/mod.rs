//! Per-protocol byte counter implementations and the counter factory.

use crate::counter::ByteCounter;
use libwf_tools::{Error, Field};

mod http2;
mod http3;
mod quic;
mod tcp;
mod tls;
mod udp;

pub use http2::Http2ByteCounter;
pub use http3::Http3ByteCounter;
pub use quic::QuicByteCounter;
pub use tcp::TcpByteCounter;
pub use tls::TlsByteCounter;
pub use udp::UdpByteCounter;

/// All available counters
pub fn all() -> Vec<Box<dyn ByteCounter>> {
    vec![
        Box::new(TcpByteCounter),
        Box::new(UdpByteCounter),
        Box::new(TlsByteCounter),
        Box::new(Http2ByteCounter),
        Box::new(QuicByteCounter),
        Box::new(Http3ByteCounter::new()),
    ]
}

/// Counter chain for HTTP/2 traffic: TCP, TLS, HTTP/2
pub fn tcp_chain() -> Vec<Box<dyn ByteCounter>> {
    vec![
        Box::new(TcpByteCounter),
        Box::new(TlsByteCounter),
        Box::new(Http2ByteCounter),
    ]
}

/// Counter chain for HTTP/3 traffic: UDP, QUIC, HTTP/3
pub fn udp_chain() -> Vec<Box<dyn ByteCounter>> {
    vec![
        Box::new(UdpByteCounter),
        Box::new(QuicByteCounter),
        Box::new(Http3ByteCounter::new()),
    ]
}

/// Build counters by name, rejecting unknown names before any packet is
/// processed
pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Vec<Box<dyn ByteCounter>>, Error> {
    names
        .iter()
        .map(|name| match name.as_ref().to_ascii_lowercase().as_str() {
            "tcp" => Ok(Box::new(TcpByteCounter) as Box<dyn ByteCounter>),
            "udp" => Ok(Box::new(UdpByteCounter) as Box<dyn ByteCounter>),
            "tls" => Ok(Box::new(TlsByteCounter) as Box<dyn ByteCounter>),
            "http2" => Ok(Box::new(Http2ByteCounter) as Box<dyn ByteCounter>),
            "quic" => Ok(Box::new(QuicByteCounter) as Box<dyn ByteCounter>),
            "http3" => Ok(Box::new(Http3ByteCounter::new()) as Box<dyn ByteCounter>),
            _ => Err(Error::UnsupportedProtocol(name.as_ref().to_owned())),
        })
        .collect()
}

/// Decode a repeated field occurrence as an integer
pub(crate) fn field_u64(field: &Field, name: &str) -> Result<u64, Error> {
    field.as_u64().ok_or_else(|| Error::InvalidFieldValue {
        field: name.to_owned(),
        value: field.as_str().to_owned(),
    })
}

/// Encoded size of a field occurrence, required for variable-length fields
pub(crate) fn field_size(field: &Field, layer: &str, name: &str) -> Result<u64, Error> {
    field.size().ok_or_else(|| Error::MissingField {
        layer: layer.to_owned(),
        field: format!("{name}_raw"),
    })
}
