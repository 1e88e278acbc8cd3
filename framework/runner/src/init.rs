use crate::cli::PrLoadScenarioCli;
use clap::Parser;

/// Initialise logging and parse the command line for the runner.
pub fn init() -> PrLoadScenarioCli {
    env_logger::init();

    PrLoadScenarioCli::parse()
}
