use super::field_u64;
use crate::counter::ByteCounter;
use libwf_tools::{Error, Packet};

/// Size of the one-time HTTP/2 connection preface
const PREFACE_LEN: u64 = 24;
/// Size of the fixed frame header preceding every HTTP/2 frame payload
const FRAME_HEADER_LEN: u64 = 9;

/// HTTP/2 byte counter.
///
/// Each HTTP/2 layer is one frame: its payload length plus the 9-octet
/// frame header. The only layer without a length field is the connection
/// preface, which contributes its fixed 24 bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct Http2ByteCounter;

impl ByteCounter for Http2ByteCounter {
    fn name(&self) -> &'static str {
        "http2"
    }

    fn count(&self, packet: &Packet) -> Result<u64, Error> {
        if !packet.has_protocol("http2") {
            return Ok(0);
        }
        let mut cnt = 0;
        for layer in packet.layers_named("http2") {
            cnt += match layer.field("http2.length") {
                Some(field) => field_u64(field, "http2.length")? + FRAME_HEADER_LEN,
                None => PREFACE_LEN,
            };
        }
        Ok(cnt)
    }
}

#[cfg(test)]
mod tests {
    use super::Http2ByteCounter;
    use crate::counter::ByteCounter;
    use libwf_tools::{Field, Layer, Packet};

    fn frame(length: u64) -> Layer {
        let mut layer = Layer::new("http2");
        layer.add_field("http2.length", Field::new(length.to_string()));
        layer
    }

    #[test]
    fn frame_counts_payload_plus_header() {
        let mut packet = Packet::new(1);
        packet.push_layer(frame(1024));
        assert_eq!(Http2ByteCounter.count(&packet).unwrap(), 1033);
    }

    #[test]
    fn preface_counts_fixed_size() {
        let mut packet = Packet::new(1);
        packet.push_layer(Layer::new("http2"));
        assert_eq!(Http2ByteCounter.count(&packet).unwrap(), 24);
    }

    #[test]
    fn several_frames_in_one_packet() {
        let mut packet = Packet::new(1);
        packet.push_layer(Layer::new("http2"));
        packet.push_layer(frame(13));
        packet.push_layer(frame(57));
        assert_eq!(Http2ByteCounter.count(&packet).unwrap(), 24 + 22 + 66);
    }

    #[test]
    fn absent_protocol_counts_zero() {
        let packet = Packet::new(1);
        assert_eq!(Http2ByteCounter.count(&packet).unwrap(), 0);
    }
}
