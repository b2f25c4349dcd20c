use crate::counter::ByteCounter;
use libwf_tools::{Error, Packet};

/// UDP byte counter.
///
/// The UDP length field already includes the fixed 8-byte header, so no
/// separate header accounting is needed.
#[derive(Clone, Copy, Debug, Default)]
pub struct UdpByteCounter;

impl ByteCounter for UdpByteCounter {
    fn name(&self) -> &'static str {
        "udp"
    }

    fn count(&self, packet: &Packet) -> Result<u64, Error> {
        match packet.layer("udp") {
            Some(layer) => layer.u64_field("udp.length"),
            None => Ok(0),
        }
    }
}
