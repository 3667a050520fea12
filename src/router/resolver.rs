//! Smart identifier resolution
//!
//! Tools accept either a UUID or a human-friendly name (label, hostname,
//! description...). Names are resolved by listing the objects and scanning
//! the configured fields.

use crate::client::ApiError;
use serde_json::Value;
use std::future::Future;
use thiserror::Error;
use tracing::debug;

/// Identifier resolution errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error("{kind} '{identifier}' not found (searched by {})", .fields.join(", "))]
    NotFound {
        kind: String,
        identifier: String,
        fields: Vec<String>,
    },

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// True when `s` is a hyphenated UUID
pub fn is_uuid(s: &str) -> bool {
    s.len() == 36 && uuid::Uuid::parse_str(s).is_ok()
}

/// Render an `id` value (string or number) as a string
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Resolves names to IDs for one kind of object
#[derive(Debug, Clone, Copy)]
pub struct IdentifierResolver {
    kind: &'static str,
    fields: &'static [&'static str],
    id_field: &'static str,
    case_insensitive: bool,
    accept_uuid: bool,
}

impl IdentifierResolver {
    pub const fn new(kind: &'static str, fields: &'static [&'static str]) -> Self {
        Self {
            kind,
            fields,
            id_field: "id",
            case_insensitive: false,
            accept_uuid: true,
        }
    }

    /// Compare names ignoring ASCII case
    pub const fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    /// Field holding the identifier returned on a match
    pub const fn id_field(mut self, id_field: &'static str) -> Self {
        self.id_field = id_field;
        self
    }

    /// Always scan, even for UUID-shaped input (objects keyed by non-UUID IDs)
    pub const fn scan_only(mut self) -> Self {
        self.accept_uuid = false;
        self
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    fn field_matches(&self, item: &Value, field: &str, identifier: &str) -> bool {
        let Some(value) = item.get(field).and_then(id_string) else {
            return false;
        };
        if self.case_insensitive {
            value.eq_ignore_ascii_case(identifier)
        } else {
            value == identifier
        }
    }

    /// First object whose configured fields match the identifier
    pub fn find<'a>(&self, identifier: &str, items: &'a [Value]) -> Option<&'a Value> {
        items.iter().find(|item| {
            self.fields
                .iter()
                .any(|field| self.field_matches(item, field, identifier))
        })
    }

    /// Resolve from an already-fetched list
    pub fn resolve_in(&self, identifier: &str, items: &[Value]) -> Result<String, ResolveError> {
        if self.accept_uuid && is_uuid(identifier) {
            return Ok(identifier.to_string());
        }

        self.find(identifier, items)
            .and_then(|item| item.get(self.id_field))
            .and_then(id_string)
            .ok_or_else(|| self.not_found(identifier))
    }

    /// Resolve an identifier, listing objects only when it is not a UUID
    pub async fn resolve<F, Fut>(&self, identifier: &str, list: F) -> Result<String, ResolveError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Value>, ApiError>>,
    {
        if self.accept_uuid && is_uuid(identifier) {
            return Ok(identifier.to_string());
        }

        let items = list().await?;
        let id = self.resolve_in(identifier, &items)?;
        debug!(kind = self.kind, identifier = %identifier, id = %id, "Resolved identifier");
        Ok(id)
    }

    pub fn not_found(&self, identifier: &str) -> ResolveError {
        ResolveError::NotFound {
            kind: self.kind.to_string(),
            identifier: identifier.to_string(),
            fields: self.fields.iter().map(|f| f.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const INSTANCE: IdentifierResolver = IdentifierResolver::new("Instance", &["label", "hostname"]);
    const UUID: &str = "cb676a46-66fd-4dfb-b839-443f2e6c0b60";

    fn instances() -> Vec<Value> {
        vec![
            json!({"id": UUID, "label": "web", "hostname": "web-1.example.com"}),
            json!({"id": "11111111-2222-3333-4444-555555555555", "label": "db", "hostname": "db-1"}),
        ]
    }

    #[test]
    fn test_is_uuid() {
        assert!(is_uuid(UUID));
        assert!(!is_uuid("web"));
        assert!(!is_uuid("cb676a4666fd4dfbb839443f2e6c0b60"));
    }

    #[tokio::test]
    async fn test_uuid_skips_listing() {
        let calls = AtomicUsize::new(0);
        let id = INSTANCE
            .resolve(UUID, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(instances())
            })
            .await
            .unwrap();
        assert_eq!(id, UUID);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolves_by_any_field() {
        let by_label = INSTANCE.resolve("web", || async { Ok(instances()) }).await.unwrap();
        assert_eq!(by_label, UUID);

        let by_hostname = INSTANCE.resolve("db-1", || async { Ok(instances()) }).await.unwrap();
        assert_eq!(by_hostname, "11111111-2222-3333-4444-555555555555");
    }

    #[tokio::test]
    async fn test_not_found_message() {
        let err = INSTANCE
            .resolve("missing", || async { Ok(instances()) })
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Instance 'missing' not found (searched by label, hostname)"
        );
    }

    #[tokio::test]
    async fn test_list_errors_propagate() {
        let err = INSTANCE
            .resolve("web", || async { Err(ApiError::RateLimited) })
            .await
            .unwrap_err();
        assert_eq!(err, ResolveError::Api(ApiError::RateLimited));
    }

    #[test]
    fn test_case_insensitive_and_numeric_ids() {
        let os = IdentifierResolver::new("Operating system", &["name"]).case_insensitive();
        let items = vec![json!({"id": 387, "name": "Ubuntu 22.04 LTS x64"})];
        assert_eq!(os.resolve_in("ubuntu 22.04 lts x64", &items).unwrap(), "387");
        assert!(INSTANCE.resolve_in("WEB", &instances()).is_err());
    }

    #[test]
    fn test_custom_id_field() {
        let users = IdentifierResolver::new("Database user", &["username"])
            .id_field("username")
            .scan_only();
        let items = vec![json!({"username": "vultradmin"})];
        assert_eq!(users.resolve_in("vultradmin", &items).unwrap(), "vultradmin");
    }
}
