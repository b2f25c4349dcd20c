use super::field_u64;
use crate::counter::ByteCounter;
use libwf_tools::{Error, Packet};

/// Fixed per-record overhead: content type (1) + version (2) + length
/// prefix (1)
const RECORD_OVERHEAD: u64 = 4;

/// TLS byte counter.
///
/// A packet may carry several TLS layers (coalesced records split across
/// layer instances), and each layer may report several `tls.record.length`
/// occurrences (multiple records in one layer). Every record contributes its
/// declared length plus the fixed record overhead. Layers reporting no
/// record length contribute 0 (mid-stream continuation data).
#[derive(Clone, Copy, Debug, Default)]
pub struct TlsByteCounter;

impl ByteCounter for TlsByteCounter {
    fn name(&self) -> &'static str {
        "tls"
    }

    fn count(&self, packet: &Packet) -> Result<u64, Error> {
        if !packet.has_protocol("tls") {
            return Ok(0);
        }
        let mut cnt = 0;
        for layer in packet.layers_named("tls") {
            for field in layer.fields("tls.record.length") {
                cnt += field_u64(field, "tls.record.length")? + RECORD_OVERHEAD;
            }
        }
        Ok(cnt)
    }
}
