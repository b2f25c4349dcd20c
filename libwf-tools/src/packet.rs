use crate::layer::Layer;

/// A decoded capture frame: a frame number plus the ordered protocol layers,
/// lowest layer first.
///
/// A packet may carry zero, one or several layers of the same protocol (for
/// example multiple TLS records, or coalesced QUIC packets). Packets are
/// read-only once built.
#[derive(Clone, Debug, Default)]
pub struct Packet {
    frame_number: u64,
    layers: Vec<Layer>,
}

impl Packet {
    pub fn new(frame_number: u64) -> Packet {
        Packet {
            frame_number,
            layers: Vec::new(),
        }
    }

    /// Absolute frame number (1-based, capture order)
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn push_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    /// Ordered protocol layers, lowest first
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Test whether any layer carries the given protocol name
    /// (case-insensitive)
    pub fn has_protocol(&self, name: &str) -> bool {
        self.layers
            .iter()
            .any(|l| l.name().eq_ignore_ascii_case(name))
    }

    /// First layer of the given protocol
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers
            .iter()
            .find(|l| l.name().eq_ignore_ascii_case(name))
    }

    /// All layers of the given protocol, in packet order
    pub fn layers_named<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Layer> + 'a {
        let name = name.to_ascii_lowercase();
        self.layers.iter().filter(move |l| l.name() == name)
    }
}
