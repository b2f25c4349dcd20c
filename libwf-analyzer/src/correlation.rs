//! Stream/SNI correlation.
//!
//! Maps the TLS server names observed in ClientHello packets to the
//! transport streams carrying them. The two-pass workflows open the capture
//! twice with independent filters: a ClientHello-only pass to learn which
//! streams advertise a target SNI, then a second pass scoped by a filter
//! derived from the first.

use crate::filter::{stream_exclude_filter, stream_extract_filter};
use libwf_tools::{
    CaptureOptions, Error, Packet, PacketSource, TsharkCapture, CLIENT_HELLO_FILTER,
};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Server name advertised in a ClientHello
pub const SNI_FIELD: &str = "tls.handshake.extensions_server_name";

/// Display filter matching HTTP/2 DATA frames
const H2_DATA_FILTER: &str = "http2.type == 0";
/// Display filter matching HTTP/3 DATA frames
const H3_DATA_FILTER: &str = "http3.frame_type == 0";

/// Distinct transport stream identifiers, one numbering space per
/// transport.
///
/// Stream numbers are dissector-assigned, capture-local and opaque: they
/// are correlation keys, never arithmetic values.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StreamNumbers {
    pub tcp: BTreeSet<String>,
    pub udp: BTreeSet<String>,
}

impl StreamNumbers {
    pub fn is_empty(&self) -> bool {
        self.tcp.is_empty() && self.udp.is_empty()
    }

    /// Per-transport set intersection
    pub fn intersect(&self, other: &StreamNumbers) -> StreamNumbers {
        StreamNumbers {
            tcp: self.tcp.intersection(&other.tcp).cloned().collect(),
            udp: self.udp.intersection(&other.udp).cloned().collect(),
        }
    }
}

/// Collect the distinct server names of a ClientHello-filtered capture
pub fn sni_extract<S: PacketSource>(source: &mut S) -> Result<BTreeSet<String>, Error> {
    let mut snis = BTreeSet::new();
    while let Some(packet) = source.next_packet()? {
        for layer in packet.layers_named("tls") {
            for field in layer.fields(SNI_FIELD) {
                snis.insert(field.as_str().to_owned());
            }
        }
    }
    Ok(snis)
}

/// Test whether any TLS layer of the packet advertises a server name from
/// the set
pub fn contains_sni(snis: &BTreeSet<String>, packet: &Packet) -> bool {
    packet
        .layers_named("tls")
        .any(|layer| layer.fields(SNI_FIELD).any(|f| snis.contains(f.as_str())))
}

/// Collect the stream identifiers of every packet satisfying the predicate
pub fn stream_numbers<S, P>(source: &mut S, mut predicate: P) -> Result<StreamNumbers, Error>
where
    S: PacketSource,
    P: FnMut(&Packet) -> bool,
{
    let mut streams = StreamNumbers::default();
    while let Some(packet) = source.next_packet()? {
        if !predicate(&packet) {
            continue;
        }
        if let Some(field) = packet.layer("tcp").and_then(|l| l.field("tcp.stream")) {
            streams.tcp.insert(field.as_str().to_owned());
        }
        if let Some(field) = packet.layer("udp").and_then(|l| l.field("udp.stream")) {
            streams.udp.insert(field.as_str().to_owned());
        }
    }
    Ok(streams)
}

/// Streams whose ClientHello advertises one of the given server names
pub fn sni_streams(
    path: &Path,
    snis: &BTreeSet<String>,
    options: &CaptureOptions,
) -> Result<StreamNumbers, Error> {
    let mut capture = open_with_filter(path, options, CLIENT_HELLO_FILTER)?;
    stream_numbers(&mut capture, |packet| contains_sni(snis, packet))
}

/// Build the display filter excluding every stream whose SNI is in the set,
/// keeping the remaining transport traffic
pub fn sni_exclude_filter(
    path: &Path,
    snis: &BTreeSet<String>,
    options: &CaptureOptions,
) -> Result<String, Error> {
    let streams = sni_streams(path, snis, options)?;
    let tcp: Vec<&str> = streams.tcp.iter().map(String::as_str).collect();
    let udp: Vec<&str> = streams.udp.iter().map(String::as_str).collect();
    Ok(stream_exclude_filter(&tcp, &udp))
}

/// Streams that both advertise one of the server names and carry HTTP/2
/// DATA frames
pub fn sni_h2_data_streams(
    path: &Path,
    snis: &BTreeSet<String>,
    options: &CaptureOptions,
) -> Result<StreamNumbers, Error> {
    let with_sni = sni_streams(path, snis, options)?;
    let mut capture = open_with_filter(path, options, H2_DATA_FILTER)?;
    let with_data = stream_numbers(&mut capture, |_| true)?;
    Ok(with_sni.intersect(&with_data))
}

/// Streams that both advertise one of the server names and carry HTTP/3
/// DATA frames
pub fn sni_h3_data_streams(
    path: &Path,
    snis: &BTreeSet<String>,
    options: &CaptureOptions,
) -> Result<StreamNumbers, Error> {
    let with_sni = sni_streams(path, snis, options)?;
    let mut capture = open_with_filter(path, options, H3_DATA_FILTER)?;
    let with_data = stream_numbers(&mut capture, |_| true)?;
    Ok(with_sni.intersect(&with_data))
}

/// Build the display filter matching exactly the streams of one transport
/// selection
pub fn stream_filter(streams: &StreamNumbers) -> String {
    let tcp: Vec<&str> = streams.tcp.iter().map(String::as_str).collect();
    let udp: Vec<&str> = streams.udp.iter().map(String::as_str).collect();
    stream_extract_filter(&tcp, &udp)
}

/// Read a host list file: one hostname per line, surrounding whitespace
/// trimmed, empty lines skipped
pub fn read_host_list<P: AsRef<Path>>(path: P) -> Result<Vec<String>, Error> {
    let reader = BufReader::new(File::open(path)?);
    let mut hosts = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let host = line.trim();
        if !host.is_empty() {
            hosts.push(host.to_owned());
        }
    }
    Ok(hosts)
}

fn open_with_filter(
    path: &Path,
    options: &CaptureOptions,
    filter: &str,
) -> Result<TsharkCapture, Error> {
    let mut options = options.clone();
    options.display_filter = Some(filter.to_owned());
    TsharkCapture::open(path, &options)
}

#[cfg(test)]
mod tests {
    use super::{contains_sni, sni_extract, stream_numbers, StreamNumbers};
    use libwf_tools::{Field, Layer, Packet};
    use std::collections::BTreeSet;

    fn client_hello(frame: u64, transport: &str, stream: &str, sni: &str) -> Packet {
        let mut packet = Packet::new(frame);
        let mut layer = Layer::new(transport);
        layer.add_field(format!("{transport}.stream"), Field::new(stream));
        packet.push_layer(layer);
        let mut tls = Layer::new("tls");
        tls.add_field(super::SNI_FIELD, Field::new(sni));
        packet.push_layer(tls);
        packet
    }

    fn capture() -> Vec<Packet> {
        vec![
            client_hello(1, "tcp", "1", "cdn.example.org"),
            client_hello(2, "tcp", "4", "tracker.example.net"),
            client_hello(3, "udp", "0", "cdn.example.org"),
            client_hello(4, "tcp", "1", "cdn.example.org"),
        ]
    }

    #[test]
    fn extract_distinct_snis() {
        let snis = sni_extract(&mut capture().into_iter()).unwrap();
        let expected: BTreeSet<String> = ["cdn.example.org", "tracker.example.net"]
            .iter()
            .map(|s| (*s).to_owned())
            .collect();
        assert_eq!(snis, expected);
    }

    #[test]
    fn streams_carrying_a_sni() {
        let snis: BTreeSet<String> = ["cdn.example.org".to_owned()].into_iter().collect();
        let streams =
            stream_numbers(&mut capture().into_iter(), |p| contains_sni(&snis, p)).unwrap();

        let mut expected = StreamNumbers::default();
        expected.tcp.insert("1".to_owned());
        expected.udp.insert("0".to_owned());
        assert_eq!(streams, expected);
    }

    #[test]
    fn intersection_is_per_transport() {
        let mut a = StreamNumbers::default();
        a.tcp.extend(["1".to_owned(), "2".to_owned()]);
        a.udp.insert("0".to_owned());
        let mut b = StreamNumbers::default();
        b.tcp.insert("2".to_owned());
        b.udp.insert("7".to_owned());

        let both = a.intersect(&b);
        assert_eq!(both.tcp, ["2".to_owned()].into_iter().collect());
        assert!(both.udp.is_empty());
    }
}
