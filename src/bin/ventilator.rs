//! Enumerates the domain table into a job descriptor.
//!
//! Usage: `cert-ventilator [EVENT_FILE]` (stdin when no file is given).

use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use aws_config::BehaviorVersion;
use cert_fleet::{
    core::{
        config::Settings,
        event::{read_event, render_error, render_response},
        logging::init_logging,
    },
    enumeration::{DynamoDbDomainTable, handle_event},
};
use log::info;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(body) => {
            println!("{body}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            println!("{}", render_error(&err));
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<String> {
    let settings = Settings::from_env()?;
    init_logging(&settings.logging)?;
    settings.log_notices();

    let event_path = std::env::args_os().nth(1).map(PathBuf::from);
    let event = read_event(event_path.as_deref())?;

    let aws = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let table = DynamoDbDomainTable::from_config(&aws, settings.domain_table.clone());
    info!("[ventilator] scanning {}", settings.domain_table);

    let job = handle_event(&event, &table).await?;
    render_response(&job)
}
