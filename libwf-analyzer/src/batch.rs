//! Per-host batch processing.
//!
//! A dataset directory holds one subdirectory per website, each containing
//! the captures recorded while visiting it. For every capture file the
//! target streams are discovered (streams both advertising one of the
//! host's SNIs and carrying DATA frames), the capture is re-opened scoped to
//! those streams, and the counter chain is run over it.
//!
//! Captures are independent, so a worker pool may fan them out; results are
//! merged sorted by file name, never in completion order, keeping the
//! report identical to the sequential path. Within one capture, counting
//! stays strictly sequential.

use crate::capture_counter::{CaptureCounter, ProtocolStats};
use crate::correlation::{sni_h2_data_streams, sni_h3_data_streams, stream_filter, StreamNumbers};
use crate::counter::ByteCounter;
use crate::counters;
use crossbeam_channel::unbounded;
use indexmap::IndexMap;
use libwf_tools::{CaptureOptions, Error, TsharkCapture};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::thread;

/// Which production counter chain to run over a capture
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Chain {
    /// TCP + TLS + HTTP/2, streams discovered through HTTP/2 DATA frames
    Http2,
    /// UDP + QUIC + HTTP/3, streams discovered through HTTP/3 DATA frames
    Http3,
}

impl Chain {
    pub fn counters(&self) -> Vec<Box<dyn ByteCounter>> {
        match self {
            Chain::Http2 => counters::tcp_chain(),
            Chain::Http3 => counters::udp_chain(),
        }
    }

    fn data_streams(
        &self,
        path: &Path,
        snis: &BTreeSet<String>,
        options: &CaptureOptions,
    ) -> Result<StreamNumbers, Error> {
        match self {
            Chain::Http2 => sni_h2_data_streams(path, snis, options),
            Chain::Http3 => sni_h3_data_streams(path, snis, options),
        }
    }
}

impl FromStr for Chain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Chain, Error> {
        match s.to_ascii_lowercase().as_str() {
            "http2" => Ok(Chain::Http2),
            "http3" => Ok(Chain::Http3),
            _ => Err(Error::UnsupportedProtocol(s.to_owned())),
        }
    }
}

/// Batch processing configuration
pub struct BatchOptions {
    pub chain: Chain,
    /// Capture-open parameters (key log, two-pass, extra dissector
    /// arguments); the display filter is set per file
    pub capture: CaptureOptions,
    /// Explicit counter names overriding the chain's counters
    pub counter_names: Option<Vec<String>>,
    /// Worker count: 1 is sequential, 0 selects the number of CPUs
    pub num_threads: usize,
}

impl BatchOptions {
    pub fn new(chain: Chain) -> BatchOptions {
        BatchOptions {
            chain,
            capture: CaptureOptions::default(),
            counter_names: None,
            num_threads: 1,
        }
    }

    fn counters(&self) -> Result<Vec<Box<dyn ByteCounter>>, Error> {
        match &self.counter_names {
            Some(names) => counters::from_names(names),
            None => Ok(self.chain.counters()),
        }
    }
}

/// Aggregates of one capture file: the target streams and the per-protocol
/// statistics
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FileStats {
    pub file: String,
    pub streams: Vec<String>,
    pub stats: IndexMap<String, ProtocolStats>,
}

/// Statistics report for all captures of one host directory
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HostReport {
    pub host: String,
    pub snis: Vec<String>,
    pub files: Vec<FileStats>,
}

/// Count the capture files of every subdirectory of `base_dir`, keyed by
/// subdirectory name
pub fn file_count(base_dir: &Path) -> Result<BTreeMap<String, usize>, Error> {
    let mut cnt = BTreeMap::new();
    for entry in fs::read_dir(base_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            let name = entry.file_name().to_string_lossy().into_owned();
            cnt.insert(name, capture_files(&entry.path())?.len());
        }
    }
    Ok(cnt)
}

/// Capture files (`.pcap`/`.pcapng`) of one directory, sorted by name
pub fn capture_files(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file()
            && matches!(
                path.extension().and_then(OsStr::to_str),
                Some("pcap") | Some("pcapng")
            )
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Subdirectories of a dataset directory, sorted by name
pub fn host_dirs(base_dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(base_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Run the counter chain over every capture of one host directory
pub fn host_report(
    host_dir: &Path,
    snis: &BTreeSet<String>,
    options: &BatchOptions,
) -> Result<HostReport, Error> {
    let host = host_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or(Error::Generic("host directory has no name"))?;
    let files = capture_files(host_dir)?;
    info!("{host}: {} capture files", files.len());

    let num_threads = if options.num_threads == 0 {
        num_cpus::get()
    } else {
        options.num_threads
    };
    let file_stats = if num_threads > 1 && files.len() > 1 {
        process_files_parallel(&files, snis, options, num_threads)?
    } else {
        let mut all = Vec::new();
        for file in &files {
            if let Some(stats) = process_file(file, snis, options)? {
                all.push(stats);
            }
        }
        all
    };

    Ok(HostReport {
        host,
        snis: snis.iter().cloned().collect(),
        files: file_stats,
    })
}

fn process_file(
    file: &Path,
    snis: &BTreeSet<String>,
    options: &BatchOptions,
) -> Result<Option<FileStats>, Error> {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or(Error::Generic("capture file has no name"))?;
    let streams = options.chain.data_streams(file, snis, &options.capture)?;
    let filter = stream_filter(&streams);
    if filter.is_empty() {
        warn!("{name}: no stream matches the SNI set, skipping");
        return Ok(None);
    }
    debug!("{name}: scoping capture to '{filter}'");

    let mut capture_options = options.capture.clone();
    capture_options.display_filter = Some(filter);
    let mut capture = TsharkCapture::open(file, &capture_options)?;
    let counter = CaptureCounter::new(options.counters()?)?;
    let stats = counter.count(&mut capture)?;

    let stream_list = match options.chain {
        Chain::Http2 => streams.tcp.into_iter().collect(),
        Chain::Http3 => streams.udp.into_iter().collect(),
    };
    Ok(Some(FileStats {
        file: name,
        streams: stream_list,
        stats,
    }))
}

fn process_files_parallel(
    files: &[PathBuf],
    snis: &BTreeSet<String>,
    options: &BatchOptions,
    num_threads: usize,
) -> Result<Vec<FileStats>, Error> {
    let n_workers = num_threads.min(files.len());
    let (job_tx, job_rx) = unbounded::<&PathBuf>();
    let (result_tx, result_rx) = unbounded::<Result<Option<FileStats>, Error>>();

    let results: Vec<Result<Option<FileStats>, Error>> = thread::scope(|s| {
        for n in 0..n_workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            s.spawn(move || {
                trace!("starting batch worker {n}");
                for file in job_rx.iter() {
                    if result_tx.send(process_file(file, snis, options)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);
        for file in files {
            // workers hold the receiver as long as they run
            let _ = job_tx.send(file);
        }
        drop(job_tx);
        result_rx.iter().collect()
    });

    let mut stats = Vec::new();
    for result in results {
        if let Some(file_stats) = result? {
            stats.push(file_stats);
        }
    }
    // results arrive in completion order; sort for a deterministic report
    stats.sort_by(|a, b| a.file.cmp(&b.file));
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::{capture_files, file_count, Chain};
    use std::fs::{create_dir_all, File};
    use std::str::FromStr;

    #[test]
    fn chain_from_str() {
        assert_eq!(Chain::from_str("http2").unwrap(), Chain::Http2);
        assert_eq!(Chain::from_str("HTTP3").unwrap(), Chain::Http3);
        assert!(Chain::from_str("spdy").is_err());
    }

    #[test]
    fn count_captures_per_host() {
        let base = std::env::temp_dir().join("wf-batch-test");
        let host_a = base.join("www.example.org");
        let host_b = base.join("www.example.net");
        create_dir_all(&host_a).unwrap();
        create_dir_all(&host_b).unwrap();
        for name in ["visit_0.pcapng", "visit_1.pcap", "keylog.txt"] {
            File::create(host_a.join(name)).unwrap();
        }
        File::create(host_b.join("visit_0.pcapng")).unwrap();

        let cnt = file_count(&base).unwrap();
        assert_eq!(cnt["www.example.org"], 2);
        assert_eq!(cnt["www.example.net"], 1);

        let files = capture_files(&host_a).unwrap();
        let names: Vec<_> = files
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, vec!["visit_0.pcapng", "visit_1.pcap"]);

        std::fs::remove_dir_all(&base).unwrap();
    }
}
