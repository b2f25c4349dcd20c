use crate::counter::ByteCounter;
use indexmap::IndexMap;
use libwf_tools::{Error, PacketSource};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Per-protocol aggregate over one capture: number of packets with a
/// non-zero count, and total bytes
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ProtocolStats {
    pub packets: u64,
    pub bytes: u64,
}

/// Aggregation of several [`ByteCounter`]s over a whole capture.
///
/// The capture is iterated once, in frame order; for every packet each
/// registered counter is invoked in registration order. A packet increments
/// a protocol's packet tally only when its count is non-zero; its byte count
/// is added unconditionally. Counters carry no state, so re-running over the
/// same input yields identical results.
pub struct CaptureCounter {
    counters: Vec<Box<dyn ByteCounter>>,
}

impl CaptureCounter {
    /// Build an aggregator. Counter names are used as result keys and must
    /// be unique.
    pub fn new(counters: Vec<Box<dyn ByteCounter>>) -> Result<CaptureCounter, Error> {
        let mut seen = HashSet::new();
        for counter in &counters {
            if !seen.insert(counter.name()) {
                return Err(Error::DuplicateCounter(counter.name().to_owned()));
            }
        }
        Ok(CaptureCounter { counters })
    }

    /// Run all counters over the packets of `source`
    pub fn count<S: PacketSource>(
        &self,
        source: &mut S,
    ) -> Result<IndexMap<String, ProtocolStats>, Error> {
        let mut result: IndexMap<String, ProtocolStats> = self
            .counters
            .iter()
            .map(|c| (c.name().to_owned(), ProtocolStats::default()))
            .collect();
        while let Some(packet) = source.next_packet()? {
            for counter in &self.counters {
                let cnt = counter.count(&packet)?;
                if let Some(stats) = result.get_mut(counter.name()) {
                    if cnt > 0 {
                        stats.packets += 1;
                    }
                    stats.bytes += cnt;
                }
            }
        }
        Ok(result)
    }
}
