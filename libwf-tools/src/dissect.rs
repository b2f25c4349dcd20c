//! Adapter over the external dissector (tshark).
//!
//! The dissector is asked for its JSON dissection (`-T json`), which exposes
//! the full packet/layer/field tree: repeated layers and repeated fields
//! arrive as arrays, and the raw-bytes entries (`-x`) carry the encoded size
//! of every field. The same JSON shape can be saved to disk and re-read with
//! [`DissectionFile`], so analyses re-run without the dissector installed.

use crate::config::Config;
use crate::error::Error;
use crate::layer::{Field, Layer, DATA_LAYER};
use crate::packet::Packet;
use crate::source::PacketSource;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::collections::VecDeque;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Display filter matching TLS ClientHello packets
pub const CLIENT_HELLO_FILTER: &str = "tls.handshake.type == 1";

/// Per-open capture configuration.
///
/// All dissector parameters are explicit here; nothing is taken from the
/// process environment.
#[derive(Clone, Debug, Default)]
pub struct CaptureOptions {
    /// Read-time display filter
    pub display_filter: Option<String>,
    /// TLS key log file enabling decryption
    pub keylog_file: Option<PathBuf>,
    /// Run a two-pass dissection (`-2`). Slower, but single-pass dissection
    /// mislabels some TCP packets as TLS continuation data.
    pub two_pass: bool,
    /// Extra arguments passed verbatim to the dissector (e.g. a custom
    /// configuration profile)
    pub extra_args: Vec<String>,
}

impl CaptureOptions {
    pub fn with_filter<S: Into<String>>(filter: S) -> CaptureOptions {
        CaptureOptions {
            display_filter: Some(filter.into()),
            ..CaptureOptions::default()
        }
    }

    pub fn keylog<P: Into<PathBuf>>(mut self, path: P) -> CaptureOptions {
        self.keylog_file = Some(path.into());
        self
    }

    pub fn two_pass(mut self) -> CaptureOptions {
        self.two_pass = true;
        self
    }
}

/// A saved JSON dissection, yielding packets in frame order
pub struct DissectionFile {
    packets: std::vec::IntoIter<Packet>,
}

impl DissectionFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<DissectionFile, Error> {
        let file = File::open(path)?;
        DissectionFile::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<DissectionFile, Error> {
        let json: Value = serde_json::from_reader(reader)?;
        let packets = parse_dissection(&json)?;
        Ok(DissectionFile {
            packets: packets.into_iter(),
        })
    }
}

impl PacketSource for DissectionFile {
    fn next_packet(&mut self) -> Result<Option<Packet>, Error> {
        Ok(self.packets.next())
    }
}

/// A capture file opened through the dissector
pub struct TsharkCapture {
    inner: DissectionFile,
}

impl TsharkCapture {
    /// Open `path` with the default dissector binary (`tshark`)
    pub fn open<P: AsRef<Path>>(path: P, options: &CaptureOptions) -> Result<TsharkCapture, Error> {
        TsharkCapture::open_with_config(path, options, &Config::default())
    }

    /// Open `path`, taking the dissector binary from the `tshark.path`
    /// configuration entry
    pub fn open_with_config<P: AsRef<Path>>(
        path: P,
        options: &CaptureOptions,
        config: &Config,
    ) -> Result<TsharkCapture, Error> {
        let tshark = config.get("tshark.path").unwrap_or("tshark");
        let mut command = Command::new(tshark);
        command
            .arg("-r")
            .arg(path.as_ref())
            .args(["-T", "json", "--no-duplicate-keys", "-x"]);
        if options.two_pass {
            command.arg("-2");
        }
        if let Some(filter) = &options.display_filter {
            command.arg("-Y").arg(filter);
        }
        if let Some(keylog) = &options.keylog_file {
            command
                .arg("-o")
                .arg(format!("tls.keylog_file:{}", keylog.display()));
        }
        command.args(&options.extra_args);
        debug!("running dissector: {command:?}");
        let output = command
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::Dissector(format!("cannot run '{tshark}': {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Dissector(format!(
                "'{tshark}' exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        let inner = DissectionFile::from_reader(&output.stdout[..])?;
        Ok(TsharkCapture { inner })
    }
}

impl PacketSource for TsharkCapture {
    fn next_packet(&mut self) -> Result<Option<Packet>, Error> {
        self.inner.next_packet()
    }
}

fn parse_dissection(json: &Value) -> Result<Vec<Packet>, Error> {
    let entries = json
        .as_array()
        .ok_or_else(|| Error::Dissector("dissection is not a JSON array".to_owned()))?;
    let mut packets = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.iter().enumerate() {
        let layers = entry
            .pointer("/_source/layers")
            .and_then(Value::as_object)
            .ok_or_else(|| {
                Error::Dissector(format!("entry {}: missing '_source.layers'", idx + 1))
            })?;
        let mut packet_layers = Vec::new();
        for (key, value) in layers {
            // raw-bytes companions of whole layers carry no fields
            if key.ends_with("_raw") {
                continue;
            }
            let name = normalize_proto(key);
            match value {
                // repeated layers of one protocol
                Value::Array(items) => {
                    for item in items {
                        if let Some(obj) = item.as_object() {
                            packet_layers.push(parse_layer(&name, obj));
                        }
                    }
                }
                Value::Object(obj) => packet_layers.push(parse_layer(&name, obj)),
                _ => {}
            }
        }
        let frame_number = packet_layers
            .iter()
            .find(|l| l.name() == "frame")
            .and_then(|l| l.field("frame.number"))
            .and_then(Field::as_u64)
            .unwrap_or(idx as u64 + 1);
        let mut packet = Packet::new(frame_number);
        for layer in packet_layers {
            packet.push_layer(layer);
        }
        packets.push(packet);
    }
    Ok(packets)
}

/// The reassembly wrapper proto gets the canonical `data` name
fn normalize_proto(key: &str) -> String {
    if key == "fake-field-wrapper" {
        DATA_LAYER.to_owned()
    } else {
        key.to_ascii_lowercase()
    }
}

fn parse_layer(name: &str, obj: &Map<String, Value>) -> Layer {
    let mut values = Vec::new();
    let mut sizes = HashMap::new();
    collect_object(obj, &mut values, &mut sizes);
    let mut layer = Layer::new(name);
    for (fname, fvalue) in values {
        // raw entries appear in the same traversal order as their fields,
        // so sizes pair positionally per name
        let field = match sizes.get_mut(&fname).and_then(VecDeque::pop_front) {
            Some(size) => Field::with_size(fvalue, size),
            None => Field::new(fvalue),
        };
        layer.add_field(&fname, field);
    }
    layer
}

fn collect_object(
    obj: &Map<String, Value>,
    values: &mut Vec<(String, String)>,
    sizes: &mut HashMap<String, VecDeque<u64>>,
) {
    for (key, value) in obj {
        if let Some(base) = key.strip_suffix("_raw") {
            collect_raw(base, value, sizes);
        } else {
            collect_value(key, value, values, sizes);
        }
    }
}

fn collect_value(
    key: &str,
    value: &Value,
    values: &mut Vec<(String, String)>,
    sizes: &mut HashMap<String, VecDeque<u64>>,
) {
    match value {
        Value::String(s) => values.push((key.to_owned(), s.clone())),
        Value::Number(n) => values.push((key.to_owned(), n.to_string())),
        // subtree: the group node itself carries no value
        Value::Object(obj) => collect_object(obj, values, sizes),
        // repeated field occurrences
        Value::Array(items) => {
            for item in items {
                collect_value(key, item, values, sizes);
            }
        }
        _ => {}
    }
}

/// A raw entry is `[hex, position, length, bitmask, type]`, or an array of
/// such entries for a repeated field
fn collect_raw(base: &str, value: &Value, sizes: &mut HashMap<String, VecDeque<u64>>) {
    match value {
        Value::Array(items) if items.first().is_some_and(Value::is_array) => {
            for item in items {
                collect_raw(base, item, sizes);
            }
        }
        Value::Array(items) => {
            if let Some(len) = items.get(2).and_then(Value::as_u64) {
                sizes.entry(base.to_owned()).or_default().push_back(len);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::DissectionFile;
    use crate::source::PacketSource;

    const DISSECTION: &str = r#"[
      {
        "_source": {
          "layers": {
            "frame": { "frame.number": "1", "frame.len": "1514" },
            "ip": { "ip.proto": "6" },
            "tcp": {
              "tcp.stream": "2",
              "tcp.len": "1460",
              "tcp.hdr_len": "32"
            },
            "tls": {
              "tls.record": {
                "tls.record.length": ["100", "200"],
                "tls.record.length_raw": [
                  ["0064", 3, 2, 0, 5],
                  ["00c8", 109, 2, 0, 5]
                ]
              }
            }
          }
        }
      },
      {
        "_source": {
          "layers": {
            "frame": { "frame.number": "2" },
            "tcp": { "tcp.stream": "2", "tcp.len": "0", "tcp.hdr_len": "20" },
            "fake-field-wrapper": { "tcp.segments": "2 reassembled segments" },
            "http2": [
              { "http2.length": "1024" },
              { "http2.length": "57" }
            ]
          }
        }
      }
    ]"#;

    #[test]
    fn parse_dissection_json() {
        let mut source = DissectionFile::from_reader(DISSECTION.as_bytes()).unwrap();

        let p1 = source.next_packet().unwrap().unwrap();
        assert_eq!(p1.frame_number(), 1);
        assert!(p1.has_protocol("TLS"));
        let tls = p1.layer("tls").unwrap();
        let lengths: Vec<u64> = tls
            .fields("tls.record.length")
            .filter_map(|f| f.as_u64())
            .collect();
        assert_eq!(lengths, vec![100, 200]);
        // raw entries give the encoded sizes, paired in order
        let field_sizes: Vec<Option<u64>> =
            tls.fields("tls.record.length").map(|f| f.size()).collect();
        assert_eq!(field_sizes, vec![Some(2), Some(2)]);

        let p2 = source.next_packet().unwrap().unwrap();
        assert_eq!(p2.frame_number(), 2);
        // fake-field-wrapper is normalized to the synthetic data layer
        let data = p2.layer("data").unwrap();
        assert!(data.has_field("tcp.segments"));
        // repeated layers keep their order
        let h2: Vec<u64> = p2
            .layers_named("http2")
            .filter_map(|l| l.field("http2.length").and_then(|f| f.as_u64()))
            .collect();
        assert_eq!(h2, vec![1024, 57]);

        assert!(source.next_packet().unwrap().is_none());
    }

    #[test]
    fn reject_malformed_dissection() {
        assert!(DissectionFile::from_reader(&b"{}"[..]).is_err());
        assert!(DissectionFile::from_reader(&b"[{\"_source\": {}}]"[..]).is_err());
    }
}
