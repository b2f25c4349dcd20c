use crate::counter::ByteCounter;
use libwf_tools::{Error, Packet};

/// QUIC byte counter.
///
/// Each QUIC layer is one QUIC packet (several may be coalesced into a
/// single UDP datagram); its declared packet length already includes header
/// and frames. When a layer carries `quic.coalesced_padding_data`,
/// zero-padding was appended outside QUIC framing to fill the datagram and
/// the declared lengths are no longer reliable: the count becomes the UDP
/// payload size (datagram length minus the 8-byte header) and the remaining
/// layers are ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct QuicByteCounter;

impl ByteCounter for QuicByteCounter {
    fn name(&self) -> &'static str {
        "quic"
    }

    fn count(&self, packet: &Packet) -> Result<u64, Error> {
        if !packet.has_protocol("quic") {
            return Ok(0);
        }
        let mut cnt = 0;
        for layer in packet.layers_named("quic") {
            if layer.has_field("quic.coalesced_padding_data") {
                let udp = packet.layer("udp").ok_or_else(|| Error::MissingField {
                    layer: "udp".to_owned(),
                    field: "udp.length".to_owned(),
                })?;
                return Ok(udp.u64_field("udp.length")?.saturating_sub(8));
            }
            cnt += layer.u64_field("quic.packet_length")?;
        }
        Ok(cnt)
    }
}
