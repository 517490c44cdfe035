mod api;
mod cli;
mod core;
mod prelude;
mod quantity;
mod statistics;
mod tables;

use clap::{Parser, crate_version};
use tracing_subscriber::EnvFilter;

use crate::{
    cli::{Args, Command},
    prelude::*,
};

fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .without_time()
        .compact()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    info!(version = crate_version!(), "starting…");

    match Args::parse().command {
        Command::Report(args) => args.run()?,
        Command::Instant(args) => args.run()?,
        Command::Totals(args) => args.run()?,
    }

    info!("done!");
    Ok(())
}
