use super::{field_size, field_u64};
use crate::counter::ByteCounter;
use libwf_tools::{Error, Packet};

/// HTTP/3 byte counter.
///
/// Frame length and frame type are variable-length integers, so each
/// occurrence contributes its decoded value (length only) plus its encoded
/// size taken from the dissection's raw-bytes entries. A layer exposing a
/// unidirectional stream header (`http3.stream_uni`) is counted by that
/// field's encoded size alone: the dissector sizes it to span the whole
/// entry, frame type and length included.
///
/// Layers with neither field occur mid-stream and count 0 by default; the
/// [`strict`](Http3ByteCounter::strict) policy turns them into errors for
/// quality-control runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct Http3ByteCounter {
    strict: bool,
}

impl Http3ByteCounter {
    pub fn new() -> Http3ByteCounter {
        Http3ByteCounter { strict: false }
    }

    /// Layers carrying neither a stream header nor frame fields become
    /// errors instead of counting 0
    pub fn strict() -> Http3ByteCounter {
        Http3ByteCounter { strict: true }
    }
}

impl ByteCounter for Http3ByteCounter {
    fn name(&self) -> &'static str {
        "http3"
    }

    fn count(&self, packet: &Packet) -> Result<u64, Error> {
        if !packet.has_protocol("http3") {
            return Ok(0);
        }
        let mut cnt = 0;
        for layer in packet.layers_named("http3") {
            if let Some(uni) = layer.field("http3.stream_uni") {
                cnt += field_size(uni, layer.name(), "http3.stream_uni")?;
                continue;
            }
            if !layer.has_field("http3.frame_length") && !layer.has_field("http3.frame_type") {
                if self.strict {
                    return Err(Error::MissingField {
                        layer: layer.name().to_owned(),
                        field: "http3.frame_length".to_owned(),
                    });
                }
                continue;
            }
            for field in layer.fields("http3.frame_length") {
                cnt += field_u64(field, "http3.frame_length")?
                    + field_size(field, layer.name(), "http3.frame_length")?;
            }
            for field in layer.fields("http3.frame_type") {
                cnt += field_size(field, layer.name(), "http3.frame_type")?;
            }
        }
        Ok(cnt)
    }
}

#[cfg(test)]
mod tests {
    use super::Http3ByteCounter;
    use crate::counter::ByteCounter;
    use libwf_tools::{Field, Layer, Packet};

    #[test]
    fn frames_count_value_plus_encoded_sizes() {
        let mut layer = Layer::new("http3");
        layer.add_field("http3.frame_type", Field::with_size("0", 1));
        layer.add_field("http3.frame_length", Field::with_size("1024", 2));
        layer.add_field("http3.frame_type", Field::with_size("1", 1));
        layer.add_field("http3.frame_length", Field::with_size("57", 1));
        let mut packet = Packet::new(1);
        packet.push_layer(layer);
        // lengths (1024+2, 57+1) plus type sizes (1, 1)
        assert_eq!(Http3ByteCounter::new().count(&packet).unwrap(), 1086);
    }

    #[test]
    fn stream_uni_size_subsumes_frame_fields() {
        let mut layer = Layer::new("http3");
        layer.add_field("http3.stream_uni", Field::with_size("", 9));
        layer.add_field("http3.frame_type", Field::with_size("4", 1));
        layer.add_field("http3.frame_length", Field::with_size("5", 1));
        let mut packet = Packet::new(1);
        packet.push_layer(layer);
        assert_eq!(Http3ByteCounter::new().count(&packet).unwrap(), 9);
    }

    #[test]
    fn empty_layer_counts_zero_by_default() {
        let mut packet = Packet::new(1);
        packet.push_layer(Layer::new("http3"));
        assert_eq!(Http3ByteCounter::new().count(&packet).unwrap(), 0);
    }

    #[test]
    fn empty_layer_errors_in_strict_mode() {
        let mut packet = Packet::new(1);
        packet.push_layer(Layer::new("http3"));
        assert!(Http3ByteCounter::strict().count(&packet).is_err());
    }

    #[test]
    fn missing_encoded_size_is_an_error() {
        let mut layer = Layer::new("http3");
        layer.add_field("http3.frame_length", Field::new("1024"));
        let mut packet = Packet::new(1);
        packet.push_layer(layer);
        assert!(Http3ByteCounter::new().count(&packet).is_err());
    }

    #[test]
    fn absent_protocol_counts_zero() {
        let packet = Packet::new(1);
        assert_eq!(Http3ByteCounter::new().count(&packet).unwrap(), 0);
    }
}
