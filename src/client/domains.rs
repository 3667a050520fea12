//! DNS domains, records and zone files

use super::{ApiError, VultrClient};
use crate::zone::{self, ZoneLine};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

/// Body for `POST /domains`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDomainRequest {
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_sec: Option<String>,
}

/// Body for creating or updating a DNS record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordRequest {
    #[serde(rename = "type", alias = "record_type")]
    pub record_type: String,
    pub name: String,
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
}

impl VultrClient {
    pub async fn list_domains(&self) -> Result<Vec<Value>, ApiError> {
        self.list_all("/domains", "domains").await
    }

    pub async fn get_domain(&self, domain: &str) -> Result<Value, ApiError> {
        self.get_object(&format!("/domains/{}", domain), "domain").await
    }

    pub async fn create_domain(&self, request: &CreateDomainRequest) -> Result<Value, ApiError> {
        let body = self.post("/domains", request).await?;
        Ok(super::unwrap_envelope(body, "domain"))
    }

    pub async fn delete_domain(&self, domain: &str) -> Result<Value, ApiError> {
        self.delete(&format!("/domains/{}", domain)).await
    }

    pub async fn list_records(&self, domain: &str) -> Result<Vec<Value>, ApiError> {
        self.list_all(&format!("/domains/{}/records", domain), "records")
            .await
    }

    pub async fn get_record(&self, domain: &str, record_id: &str) -> Result<Value, ApiError> {
        self.get_object(&format!("/domains/{}/records/{}", domain, record_id), "record")
            .await
    }

    pub async fn create_record(
        &self,
        domain: &str,
        record: &RecordRequest,
    ) -> Result<Value, ApiError> {
        let body = self
            .post(&format!("/domains/{}/records", domain), record)
            .await?;
        Ok(super::unwrap_envelope(body, "record"))
    }

    pub async fn update_record(
        &self,
        domain: &str,
        record_id: &str,
        record: &RecordRequest,
    ) -> Result<Value, ApiError> {
        self.patch(&format!("/domains/{}/records/{}", domain, record_id), record)
            .await
    }

    pub async fn delete_record(&self, domain: &str, record_id: &str) -> Result<Value, ApiError> {
        self.delete(&format!("/domains/{}/records/{}", domain, record_id))
            .await
    }

    /// Export a domain's records as a BIND zone file
    pub async fn export_zone_file(&self, domain: &str) -> Result<String, ApiError> {
        // Fails early with NotFound for unknown domains.
        self.get_domain(domain).await?;
        let records = self.list_records(domain).await?;
        Ok(zone::export_zone_file(domain, &records))
    }

    /// Import records from a zone file.
    ///
    /// Returns one entry per significant line: the planned or created
    /// record, or an `{"error", "line"}` entry. API failures do not stop
    /// the import.
    pub async fn import_zone_file(
        &self,
        domain: &str,
        zone_data: &str,
        dry_run: bool,
    ) -> Result<Vec<Value>, ApiError> {
        let mut results = Vec::new();
        let mut created = 0usize;

        for entry in zone::parse_zone(zone_data, domain) {
            match entry {
                ZoneLine::Error { line, message, .. } => {
                    results.push(json!({"error": message, "line": line}));
                }
                ZoneLine::Record { line_no, line, record } => {
                    if dry_run {
                        results.push(json!({
                            "action": "create",
                            "type": record.record_type,
                            "name": record.name,
                            "data": record.data,
                            "ttl": record.ttl,
                            "priority": record.priority,
                        }));
                        continue;
                    }

                    let request = RecordRequest {
                        record_type: record.record_type,
                        name: record.name,
                        data: record.data,
                        ttl: Some(record.ttl),
                        priority: record.priority,
                    };
                    match self.create_record(domain, &request).await {
                        Ok(value) => {
                            created += 1;
                            results.push(value);
                        }
                        Err(e) => {
                            warn!(domain = %domain, line = line_no, error = %e, "Zone import record failed");
                            results.push(json!({
                                "error": format!("Line {}: {}", line_no, e),
                                "line": line,
                            }));
                        }
                    }
                }
            }
        }

        info!(domain = %domain, dry_run, entries = results.len(), created, "Zone file import finished");
        Ok(results)
    }
}
