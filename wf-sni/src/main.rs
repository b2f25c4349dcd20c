#![warn(clippy::all)]

#[macro_use]
extern crate log;

use clap::Parser;
use libwf_analyzer::{capture_files, create_file, host_dirs, read_host_list, sni_extract};
use libwf_tools::{CaptureOptions, Error, TsharkCapture, CLIENT_HELLO_FILTER};
use std::collections::{BTreeMap, BTreeSet};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// SNI survey tool: extract the server names observed in every capture of a
/// dataset directory
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The dataset directory (one subdirectory per host)
    #[arg(short, long)]
    dir: String,

    /// Existing filter file (one hostname per line); its SNIs are
    /// subtracted so only new names are reported
    #[arg(short, long)]
    filter: Option<String>,

    /// Output file
    #[arg(short, long, default_value = "sni.json")]
    output: String,
}

fn main() -> Result<(), Error> {
    let args = Args::parse();

    let env_filter = EnvFilter::try_from_env("WF_SNI_LOG")
        .unwrap_or_else(|_| EnvFilter::from_default_env().add_directive(Level::INFO.into()));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .compact()
        .init();
    info!("wf-sni tool starting");

    let mut existing = BTreeSet::new();
    if let Some(filter) = args.filter.as_ref() {
        existing.extend(read_host_list(filter)?);
        debug!("{} SNIs already covered by the filter", existing.len());
    }

    let options = CaptureOptions::with_filter(CLIENT_HELLO_FILTER);
    let mut results: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for host_dir in host_dirs(args.dir.as_ref())? {
        for file in capture_files(&host_dir)? {
            let name = file.file_name().map(|n| n.to_string_lossy().into_owned());
            let name = match name {
                Some(name) => name,
                None => continue,
            };
            let mut capture = TsharkCapture::open(&file, &options)?;
            let snis = sni_extract(&mut capture)?;
            let new: Vec<String> = snis.difference(&existing).cloned().collect();
            debug!("{name}: {} new SNIs", new.len());
            results.insert(name, new);
        }
    }

    let out = create_file(".", &args.output)?;
    serde_json::to_writer(out, &results)?;
    info!("wf-sni: wrote {}, exiting", args.output);
    Ok(())
}
