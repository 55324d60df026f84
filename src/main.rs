use clap::Parser;
use std::{io, process};
#[macro_use]
extern crate log;

mod cli;
mod features;

use cli::{Atm, Cli};

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        error!("{e:?}");
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = Cli::parse();
    debug!("Using data directory {}", args.data_dir.display());

    let mut atm = Atm::open(&args.data_dir)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    atm.execute(args.command, &mut out)
}
