use crate::counter::ByteCounter;
use libwf_tools::{Error, Packet};

/// TCP byte counter: declared payload length plus the actual header length.
///
/// The TCP header is variable-sized (options), so its length is read from
/// the dissection rather than assumed to be 20 bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpByteCounter;

impl ByteCounter for TcpByteCounter {
    fn name(&self) -> &'static str {
        "tcp"
    }

    fn count(&self, packet: &Packet) -> Result<u64, Error> {
        let layer = match packet.layer("tcp") {
            Some(layer) => layer,
            None => return Ok(0),
        };
        Ok(layer.u64_field("tcp.len")? + layer.u64_field("tcp.hdr_len")?)
    }
}

#[cfg(test)]
mod tests {
    use super::TcpByteCounter;
    use crate::counter::ByteCounter;
    use libwf_tools::{Field, Layer, Packet};

    #[test]
    fn payload_plus_header() {
        let mut layer = Layer::new("tcp");
        layer.add_field("tcp.len", Field::new("1460"));
        layer.add_field("tcp.hdr_len", Field::new("32"));
        let mut packet = Packet::new(1);
        packet.push_layer(layer);

        assert_eq!(TcpByteCounter.count(&packet).unwrap(), 1492);
    }

    #[test]
    fn absent_protocol_counts_zero() {
        let mut packet = Packet::new(1);
        packet.push_layer(Layer::new("udp"));
        assert_eq!(TcpByteCounter.count(&packet).unwrap(), 0);
    }

    #[test]
    fn missing_field_is_an_error() {
        let mut layer = Layer::new("tcp");
        layer.add_field("tcp.len", Field::new("100"));
        let mut packet = Packet::new(1);
        packet.push_layer(layer);
        assert!(TcpByteCounter.count(&packet).is_err());
    }
}
