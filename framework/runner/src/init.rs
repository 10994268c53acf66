use crate::cli::CarrierBenchCli;
use clap::Parser;

/// Initialise the CLI and logging for the carrier bench runner.
pub fn init() -> CarrierBenchCli {
    env_logger::init();

    CarrierBenchCli::parse()
}
