use crate::batch::HostReport;
use libwf_tools::{Config, Error};
use serde::Serialize;
use std::fs::{create_dir_all, File};
use std::io;
use std::path::PathBuf;

/// Get the base prefix of output directory (or "." if not specified)
pub fn get_output_dir(config: &Config) -> &str {
    config.get("output_dir").unwrap_or(".")
}

/// Create a file to output data, creating intermediate directories as needed
pub fn create_file<P: AsRef<str>>(base: &str, filename: P) -> Result<File, io::Error> {
    let mut path = PathBuf::from(base);
    path.push(filename.as_ref());
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    File::create(path)
}

#[derive(Serialize)]
struct ProtocolFileView<'a> {
    file: &'a str,
    streams: &'a [String],
    packets: u64,
    bytes: u64,
}

#[derive(Serialize)]
struct ProtocolReportView<'a> {
    host: &'a str,
    snis: &'a [String],
    files: Vec<ProtocolFileView<'a>>,
}

/// Write one JSON report per protocol of the host report, as
/// `<base>/<protocol>/<host>.json`
pub fn write_host_report(base: &str, report: &HostReport) -> Result<(), Error> {
    let mut protocols: Vec<&String> = Vec::new();
    for file in &report.files {
        for name in file.stats.keys() {
            if !protocols.contains(&name) {
                protocols.push(name);
            }
        }
    }
    for protocol in protocols {
        let view = ProtocolReportView {
            host: &report.host,
            snis: &report.snis,
            files: report
                .files
                .iter()
                .filter_map(|f| {
                    f.stats.get(protocol).map(|stats| ProtocolFileView {
                        file: &f.file,
                        streams: &f.streams,
                        packets: stats.packets,
                        bytes: stats.bytes,
                    })
                })
                .collect(),
        };
        let file = create_file(base, format!("{protocol}/{}.json", report.host))?;
        serde_json::to_writer(file, &view)?;
        info!("wrote {base}/{protocol}/{}.json", report.host);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::write_host_report;
    use crate::batch::{FileStats, HostReport};
    use crate::capture_counter::ProtocolStats;
    use indexmap::IndexMap;
    use serde_json::Value;

    #[test]
    fn per_protocol_report_files() {
        let mut stats = IndexMap::new();
        stats.insert(
            "tcp".to_owned(),
            ProtocolStats {
                packets: 32,
                bytes: 11408,
            },
        );
        stats.insert(
            "tls".to_owned(),
            ProtocolStats {
                packets: 16,
                bytes: 10347,
            },
        );
        let report = HostReport {
            host: "www.example.org".to_owned(),
            snis: vec!["cdn.example.org".to_owned()],
            files: vec![FileStats {
                file: "visit_0.pcapng".to_owned(),
                streams: vec!["2".to_owned()],
                stats,
            }],
        };

        let base = std::env::temp_dir().join("wf-output-test");
        write_host_report(&base.to_string_lossy(), &report).unwrap();

        let tcp: Value = serde_json::from_reader(
            std::fs::File::open(base.join("tcp/www.example.org.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(tcp["host"], "www.example.org");
        assert_eq!(tcp["files"][0]["packets"], 32);
        assert_eq!(tcp["files"][0]["bytes"], 11408);
        assert!(base.join("tls/www.example.org.json").is_file());

        std::fs::remove_dir_all(&base).unwrap();
    }
}
