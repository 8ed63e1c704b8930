//! Provisions one domain set: checks ACM, issues through ACME DNS-01 when
//! needed, and publishes the result to S3 and ACM.
//!
//! Usage: `cert-runner [EVENT_FILE]` (stdin when no file is given).

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::Result;
use aws_config::BehaviorVersion;
use cert_fleet::{
    core::{
        config::Settings,
        event::{read_event, render_error, render_response},
        logging::init_logging,
    },
    distribution::S3ObjectStore,
    inventory::AcmCertificateManager,
    issuance::{AcmeDns01Issuer, dns_providers::Route53Adapter},
    provisioning::{Provisioner, ProvisionerOptions, handle_event},
};
use tokio::runtime::Handle;

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
    let dns = Route53Adapter::from_config(&aws, Handle::current(), settings.dns_propagation_timeout);
    let issuer = AcmeDns01Issuer::new(Arc::new(dns))
        .with_account_key(settings.acme_account_key_pem.clone());

    let provisioner = Provisioner::new(
        Arc::new(AcmCertificateManager::from_config(&aws)),
        Arc::new(S3ObjectStore::from_config(&aws)),
        Arc::new(issuer),
        ProvisionerOptions::from(&settings),
    );

    let response = handle_event(&event, &provisioner).await?;
    render_response(&response)
}
