use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_dynamodb::{Client, types::AttributeValue};
use log::debug;

use super::{DomainSource, EnumerationError};

/// Partition key of the domain table; the only attribute this system reads.
pub const DOMAIN_ATTRIBUTE: &str = "subject_alternative_name";

/// Domain records stored one per row in a DynamoDB table.
pub struct DynamoDbDomainTable {
    client: Client,
    table_name: String,
}

impl DynamoDbDomainTable {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    pub fn from_config(config: &aws_config::SdkConfig, table_name: impl Into<String>) -> Self {
        Self::new(Client::new(config), table_name)
    }
}

#[async_trait]
impl DomainSource for DynamoDbDomainTable {
    fn name(&self) -> &str {
        &self.table_name
    }

    /// Full table scan. Fine at the current number of domains; follows
    /// pagination so results past the 1 MB page limit are not lost.
    async fn scan_domains(&self) -> Result<Vec<String>> {
        let mut paginator = self
            .client
            .scan()
            .table_name(&self.table_name)
            .projection_expression("#san")
            .expression_attribute_names("#san", DOMAIN_ATTRIBUTE)
            .into_paginator()
            .send();

        let mut domains = Vec::new();
        let mut pages = 0;
        while let Some(page) = paginator.next().await {
            let page = page
                .with_context(|| format!("Failed to scan DynamoDB table {}", self.table_name))?;
            pages += 1;
            for item in page.items() {
                match item.get(DOMAIN_ATTRIBUTE) {
                    Some(AttributeValue::S(domain)) => domains.push(domain.clone()),
                    other => {
                        return Err(EnumerationError::InvalidRecord {
                            table: self.table_name.clone(),
                            value: format!("{other:?}"),
                            reason: format!("no string {DOMAIN_ATTRIBUTE} attribute"),
                        }
                        .into());
                    }
                }
            }
        }
        debug!(
            "[ventilator] scanned {} page(s) from {}",
            pages, self.table_name
        );
        Ok(domains)
    }
}
