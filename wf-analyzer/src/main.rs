#![warn(clippy::all)]

#[macro_use]
extern crate log;

extern crate clap;
use clap::{crate_version, Parser};
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

extern crate flate2;
extern crate lz4;
extern crate xz2;

use std::collections::BTreeSet;
use std::fs::File;
use std::io;
use std::path::Path;

use flate2::read::GzDecoder;
use xz2::read::XzDecoder;

use libwf_analyzer::*;
use libwf_tools::{Config, DissectionFile, Error};

/// Per-host traffic statistics extraction tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<String>,

    /// Counter chain to run: http2 or http3
    #[arg(short, long, default_value = "http2")]
    protocol: String,

    /// Counters to run (comma-separated), overriding the chain's counters
    #[arg(long)]
    counters: Option<String>,

    /// Target SNI (can be given several times)
    #[arg(short, long)]
    sni: Vec<String>,

    /// File with one target hostname per line, added to the SNI set
    #[arg(short, long)]
    filter_file: Option<String>,

    /// TLS key log file enabling decryption
    #[arg(short, long)]
    keylog: Option<String>,

    /// Reports output directory
    #[arg(short, long)]
    outdir: Option<String>,

    /// Number of jobs to run (default: 0 (auto))
    #[arg(short, long, default_value_t = 0)]
    jobs: u8,

    /// Use two-pass dissection (slower, but single-pass mislabels some TCP
    /// packets as TLS)
    #[arg(long)]
    two_pass: bool,

    /// Dissector configuration profile
    #[arg(long)]
    profile: Option<String>,

    /// List available counters and exit
    #[arg(long)]
    list_counters: bool,

    /// Input: a host capture directory, or a saved dissection file
    /// (.json, optionally .gz/.xz/.lz4 compressed)
    input: Option<String>,
}

fn load_config(config: &mut Config, filename: &str) -> Result<(), io::Error> {
    debug!("Loading configuration {filename}");
    let path = Path::new(&filename);
    let file = File::open(path)?;
    config.load_config(file)
}

fn main() -> Result<(), Error> {
    let args = Args::parse();

    // check if asked to list counters
    if args.list_counters {
        println!("wf-analyzer available counters:");
        for counter in counters::all() {
            println!("    {}", counter.name());
        }
        ::std::process::exit(0);
    }
    // load config
    let mut config = Config::default();
    if let Some(filename) = args.config.as_ref() {
        load_config(&mut config, filename)?;
    }
    // override config options from command-line arguments
    config.set("num_threads", args.jobs as i64);
    if let Some(dir) = args.outdir.as_ref() {
        config.set("output_dir", dir.as_str());
    }

    // Open log file
    let log_file = config.get("log_file").unwrap_or("wf-analyzer.log");
    let output_dir = get_output_dir(&config).to_owned();
    let file_appender = RollingFileAppender::new(Rotation::NEVER, &output_dir, log_file);
    let env_filter = EnvFilter::try_from_env("WF_ANALYZER_LOG")
        .unwrap_or_else(|_| EnvFilter::from_default_env().add_directive(Level::INFO.into()));
    tracing_subscriber::fmt()
        .with_writer(file_appender)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .compact()
        .init();

    // Now, really start
    info!("wf-analyzer {}", crate_version!());

    let input_filename = match args.input.as_ref() {
        Some(s) => s.as_str(),
        None => {
            return Err(Error::from(io::Error::new(
                io::ErrorKind::NotFound,
                "Input cannot be empty",
            )));
        }
    };
    let input_path = Path::new(input_filename);

    if input_path.is_dir() {
        run_batch(input_path, &args, &config, &output_dir)
    } else {
        run_saved_dissection(input_filename, &args)
    }
}

/// Production workflow: run the chain over every capture of a host
/// directory, writing per-protocol reports
fn run_batch(host_dir: &Path, args: &Args, config: &Config, output_dir: &str) -> Result<(), Error> {
    let chain: Chain = args.protocol.parse()?;

    let mut snis: BTreeSet<String> = args.sni.iter().cloned().collect();
    if let Some(filter_file) = args.filter_file.as_ref() {
        snis.extend(read_host_list(filter_file)?);
    }
    if snis.is_empty() {
        return Err(Error::Generic("no target SNI given"));
    }

    let mut options = BatchOptions::new(chain);
    options.capture.keylog_file = args.keylog.as_ref().map(Into::into);
    options.capture.two_pass = args.two_pass;
    if let Some(profile) = args.profile.as_ref() {
        options.capture.extra_args = vec!["-C".to_owned(), profile.clone()];
    }
    options.counter_names = args
        .counters
        .as_ref()
        .map(|s| s.split(',').map(str::to_owned).collect());
    options.num_threads = config.get_usize("num_threads").unwrap_or(1);

    let report = host_report(host_dir, &snis, &options)?;
    write_host_report(output_dir, &report)?;

    info!("wf-analyzer: done, exiting");
    Ok(())
}

/// Count a single saved dissection and print the result as JSON
fn run_saved_dissection(input_filename: &str, args: &Args) -> Result<(), Error> {
    let file = File::open(input_filename)?;
    let input_reader: Box<dyn io::Read> = if input_filename.ends_with(".gz") {
        Box::new(GzDecoder::new(file))
    } else if input_filename.ends_with(".xz") {
        Box::new(XzDecoder::new(file))
    } else if input_filename.ends_with(".lz4") {
        Box::new(lz4::Decoder::new(file)?)
    } else {
        Box::new(file)
    };

    let counters = match args.counters.as_ref() {
        Some(names) => counters::from_names(&names.split(',').collect::<Vec<_>>())?,
        None => args.protocol.parse::<Chain>()?.counters(),
    };
    let counter = CaptureCounter::new(counters)?;
    let mut source = DissectionFile::from_reader(input_reader)?;
    let result = counter.count(&mut source)?;

    serde_json::to_writer_pretty(io::stdout(), &result)?;
    println!();
    Ok(())
}
