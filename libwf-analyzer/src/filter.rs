//! Display filter construction.
//!
//! The builders produce plain Wireshark display filter expressions,
//! consumed verbatim by the dissector when re-opening a capture. Slices
//! keep the caller's ordering, so generated filters are reproducible.

/// Build a filter matching any of the given TCP/UDP streams, e.g.
/// `tcp.stream == 1 or tcp.stream == 4`.
///
/// Both inputs empty produce the empty string (no packet can match a filter
/// with no stream).
pub fn stream_extract_filter(tcp_streams: &[&str], udp_streams: &[&str]) -> String {
    let clauses: Vec<String> = tcp_streams
        .iter()
        .map(|s| format!("tcp.stream == {s}"))
        .chain(udp_streams.iter().map(|s| format!("udp.stream == {s}")))
        .collect();
    clauses.join(" or ")
}

/// Build a filter excluding the given TCP/UDP streams while keeping all
/// remaining transport traffic, ICMP excepted.
///
/// A transport with no stream to exclude degenerates to the bare transport
/// name; both empty produce the constant `(tcp or udp) and not icmp`.
pub fn stream_exclude_filter(tcp_streams: &[&str], udp_streams: &[&str]) -> String {
    format!(
        "({} or {}) and not icmp",
        exclude_clause("tcp", tcp_streams),
        exclude_clause("udp", udp_streams)
    )
}

fn exclude_clause(transport: &str, streams: &[&str]) -> String {
    if streams.is_empty() {
        return transport.to_owned();
    }
    let mut clause = format!("({transport}");
    for stream in streams {
        clause.push_str(&format!(" and {transport}.stream != {stream}"));
    }
    clause.push(')');
    clause
}
