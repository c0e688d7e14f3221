#![allow(clippy::enum_variant_names)]

use clap::Parser as _;
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;

use crate::{
    application::{Application, ApplicationError},
    cli::Cli,
};

mod application;
mod cli;
mod config;
mod sync;
mod tree;
mod view;

#[compio::main]
#[snafu::report]
async fn main() -> Result<(), ApplicationError> {
    let cli_args = Cli::parse();
    setup_tracing(&cli_args);
    debug!("Parsed CLI arguments: {cli_args:?}");

    Application::run(cli_args).await?;

    Ok(())
}

fn setup_tracing(cli_args: &Cli) {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::from(cli_args.log_level))
        .without_time()
        .compact()
        .with_writer(std::io::stderr)
        .init();
}
