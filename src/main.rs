mod checker;
mod command;
mod error;
mod options;
mod repo;
mod review;
mod upsource;

use std::process::ExitCode;

use clap::Parser;

use crate::checker::Checker;
use crate::options::Options;
use crate::upsource::UpsourceClient;

#[tokio::main]
async fn main() -> ExitCode {
    let mut logger = pretty_env_logger::formatted_timed_builder();
    logger.filter_level(log::LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        logger.parse_filters(&filters);
    }
    logger.init();

    let options = Options::parse();
    log::info!("config = {options:?}");

    match run(&options).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(options: &Options) -> Result<bool, error::Error> {
    options.validate()?;
    let client = UpsourceClient::new(options)?;
    let checker = Checker::new(options, &client);
    checker.run().await
}
