use libwf_tools::{Error, Layer, Packet, DATA_LAYER};

/// Protocols the extractor knows reassembly markers for
const SUPPORTED_PROTOCOLS: &[&str] = &["tcp", "tls", "http2", "vmess"];

/// Extraction of the layers relevant to one protocol adjacency.
///
/// Configured with an upper protocol built directly on a lower protocol in
/// the actual stack (e.g. HTTP/2 on TLS, or TLS on TCP), the extractor
/// returns every layer of the upper protocol in packet order, together with
/// the synthetic reassembly layer immediately marking segments of the lower
/// protocol. No stack-consistency validation is performed: the caller
/// guarantees the adjacency holds for the analyzed capture.
pub struct LayerExtractor {
    upper: String,
    lower: String,
    lower_marker: String,
}

impl LayerExtractor {
    pub fn new(upper: &str, lower: &str) -> Result<LayerExtractor, Error> {
        let upper = upper.to_ascii_lowercase();
        let lower = lower.to_ascii_lowercase();
        for proto in [&upper, &lower] {
            if !SUPPORTED_PROTOCOLS.contains(&proto.as_str()) {
                return Err(Error::UnsupportedProtocol(proto.clone()));
            }
        }
        let lower_marker = format!("{lower}.segments");
        Ok(LayerExtractor {
            upper,
            lower,
            lower_marker,
        })
    }

    /// Layers of the upper protocol in packet order, each possibly preceded
    /// by the reassembly layer marking segments of the lower protocol.
    /// Empty when either protocol is absent from the packet.
    pub fn extract<'p>(&self, packet: &'p Packet) -> Vec<&'p Layer> {
        if !packet.has_protocol(&self.upper) || !packet.has_protocol(&self.lower) {
            return Vec::new();
        }
        packet
            .layers()
            .iter()
            .filter(|layer| {
                layer.name() == self.upper
                    || (layer.name() == DATA_LAYER && layer.has_field(&self.lower_marker))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::LayerExtractor;
    use libwf_tools::{Error, Field, Layer, Packet};

    fn reassembly_layer(marker: &str) -> Layer {
        let mut layer = Layer::new("data");
        layer.add_field(marker, Field::new("2 reassembled segments"));
        layer
    }

    fn http2_on_tls_packet() -> Packet {
        let mut packet = Packet::new(1);
        packet.push_layer(Layer::new("tcp"));
        packet.push_layer(Layer::new("tls"));
        packet.push_layer(reassembly_layer("tls.segments"));
        packet.push_layer(Layer::new("http2"));
        packet.push_layer(reassembly_layer("tls.segments"));
        packet.push_layer(Layer::new("http2"));
        packet.push_layer(Layer::new("http2"));
        packet
    }

    #[test]
    fn interleaved_markers_and_upper_layers() {
        let extractor = LayerExtractor::new("http2", "tls").unwrap();
        let packet = http2_on_tls_packet();
        let layers = extractor.extract(&packet);
        let names: Vec<&str> = layers.iter().map(|l| l.name()).collect();
        assert_eq!(names, vec!["data", "http2", "data", "http2", "http2"]);
    }

    #[test]
    fn markers_of_other_adjacencies_are_skipped() {
        let mut packet = Packet::new(1);
        packet.push_layer(Layer::new("tcp"));
        packet.push_layer(reassembly_layer("tcp.segments"));
        packet.push_layer(Layer::new("tls"));
        packet.push_layer(reassembly_layer("tls.segments"));
        packet.push_layer(Layer::new("http2"));

        let extractor = LayerExtractor::new("http2", "tls").unwrap();
        let names: Vec<&str> = extractor
            .extract(&packet)
            .iter()
            .map(|l| l.name())
            .collect();
        assert_eq!(names, vec!["data", "http2"]);
    }

    #[test]
    fn absent_protocol_yields_empty() {
        let extractor = LayerExtractor::new("http2", "tls").unwrap();
        let mut packet = Packet::new(1);
        packet.push_layer(Layer::new("tcp"));
        packet.push_layer(Layer::new("tls"));
        assert!(extractor.extract(&packet).is_empty());
    }

    #[test]
    fn unsupported_protocol_fails_fast() {
        match LayerExtractor::new("http3", "tls").map(drop).unwrap_err() {
            Error::UnsupportedProtocol(name) => assert_eq!(name, "http3"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
