use anyhow::Result;
use cert_fleet::{
    core::types::{ResponseStatus, RunnerResponse},
    distribution::MemoryObjectStore,
    inventory::find_existing_cert,
    provisioning::{DOMAIN_SET_TAG, ProvisionOutcome, handle_event},
    domain::DomainSet,
};
use chrono::{Duration, Utc};
use serde_json::json;

use super::test_utils::{BUCKET, LocalIssuer, harness, runner_event};

#[tokio::test]
async fn new_domain_set_is_published_everywhere() -> Result<()> {
    let h = harness(LocalIssuer::default(), MemoryObjectStore::new())?;

    let response = handle_event(
        &runner_event(json!("example.com,www.example.com")),
        &h.provisioner,
    )
    .await?;
    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(
        response.message,
        "A new certificate has been provisioned and uploaded to both S3 and ACM for: example.com,www.example.com"
    );

    assert_eq!(
        h.objects.keys(BUCKET),
        vec![
            "certs/README".to_string(),
            "certs/example.com/README".to_string(),
            "certs/example.com/cert.pem".to_string(),
            "certs/example.com/chain.pem".to_string(),
            "certs/example.com/fullchain.pem".to_string(),
            "certs/example.com/privkey.pem".to_string(),
        ]
    );

    let domains = DomainSet::parse_list("example.com,www.example.com")?;
    let imports = h.certificates.imports();
    assert_eq!(imports.len(), 1);
    assert!(imports[0].tags.contains(&(DOMAIN_SET_TAG.to_string(), domains.fingerprint())));

    // The imported certificate is now found for the same set.
    let found = find_existing_cert(h.certificates.as_ref(), &domains, 1000).await?;
    assert_eq!(found.map(|c| c.arn), Some(imports[0].arn.clone()));
    Ok(())
}

#[tokio::test]
async fn certificate_with_45_days_left_is_kept() -> Result<()> {
    let h = harness(LocalIssuer::default(), MemoryObjectStore::new())?;
    h.certificates
        .insert(["example.com"], Some(Utc::now() + Duration::days(45)));

    let response = handle_event(&runner_event(json!(["example.com"])), &h.provisioner).await?;
    assert_eq!(
        response,
        RunnerResponse::success(
            "A certificate with at least 30 days until expiration already exists in both S3 and ACM for: example.com"
                .to_string()
        )
    );
    assert_eq!(h.issuer.request_count(), 0);
    assert!(h.objects.keys(BUCKET).is_empty());
    Ok(())
}

#[tokio::test]
async fn certificate_with_10_days_left_is_reimported() -> Result<()> {
    let h = harness(LocalIssuer::default(), MemoryObjectStore::new())?;
    let arn = h
        .certificates
        .insert(["example.com"], Some(Utc::now() + Duration::days(10)));

    let job = cert_fleet::core::types::ProvisionJob::from_event(&runner_event(json!(["example.com"])))?;
    let outcome = h.provisioner.run(&job).await?;
    match outcome {
        ProvisionOutcome::Provisioned {
            arn: got,
            reimported,
            object_keys,
        } => {
            assert_eq!(got, arn);
            assert!(reimported);
            assert_eq!(object_keys.len(), 6);
        }
        other => panic!("expected provisioning, got {other:?}"),
    }

    let stored = h.certificates.certificates();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].not_after.is_some_and(|at| at > Utc::now() + Duration::days(60)));
    Ok(())
}

#[tokio::test]
async fn superset_certificate_does_not_match() -> Result<()> {
    let h = harness(LocalIssuer::default(), MemoryObjectStore::new())?;
    h.certificates.insert(
        ["example.com", "other.example.net"],
        Some(Utc::now() + Duration::days(80)),
    );

    handle_event(&runner_event(json!(["example.com"])), &h.provisioner).await?;
    assert_eq!(h.issuer.request_count(), 1);
    assert_eq!(h.certificates.certificates().len(), 2);
    Ok(())
}

#[tokio::test]
async fn failed_upload_skips_the_import() -> Result<()> {
    let h = harness(
        LocalIssuer::default(),
        MemoryObjectStore::new().failing_on("chain.pem"),
    )?;

    let err = handle_event(&runner_event(json!(["example.com"])), &h.provisioner)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("chain.pem"));
    assert!(h.certificates.imports().is_empty());
    assert_eq!(std::fs::read_dir(h.scratch.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn issuer_failure_is_an_error() -> Result<()> {
    let h = harness(LocalIssuer::failing("directory unreachable"), MemoryObjectStore::new())?;
    let err = handle_event(&runner_event(json!(["example.com"])), &h.provisioner)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("directory unreachable"));
    Ok(())
}

#[tokio::test]
async fn empty_keys_are_rejected() {
    let h = harness(LocalIssuer::default(), MemoryObjectStore::new()).unwrap();
    let mut event = runner_event(json!(["example.com"]));
    event["email"] = json!("");
    let err = handle_event(&event, &h.provisioner).await.unwrap_err();
    assert_eq!(err.to_string(), "Key has an empty value: email");
    assert_eq!(h.issuer.request_count(), 0);
}
