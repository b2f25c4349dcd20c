use libwf_tools::{Error, Packet};

/// Common trait for per-protocol byte counters.
///
/// A counter is a stateless strategy: `count` is a pure function of the
/// packet, safe to reuse across packets and captures. The contract is:
///
/// - the count is the number of bytes attributable to the protocol within
///   this single packet, framing overhead included;
/// - a packet not carrying the protocol counts 0 and never errors;
/// - a protocol layer present but with a required field missing or
///   non-numeric is a caller-visible error, never a silent 0.
pub trait ByteCounter: Send + Sync {
    /// Counter name, used as the key of the per-capture result map
    fn name(&self) -> &'static str;

    /// Count the bytes of this protocol within the given packet
    fn count(&self, packet: &Packet) -> Result<u64, Error>;
}
