//! Connection settings for a Couchbase datasource.
//!
//! Settings can be assembled in code through [`CouchbaseSettings::builder`] or
//! decoded from a JSON datasource object. Every field has a default, so an
//! empty object yields a local development configuration.
//!
//! ```ignore
//! let settings = CouchbaseSettings::from_json(&json!({
//!     "host": "cb.internal",
//!     "bucket": "tickets",
//!     "n1qlport": 18093
//! }))?;
//! assert_eq!(settings.query_url(), "http://cb.internal:18093");
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::error::DocumentStoreResult;

/// Settings recognized by the Couchbase store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CouchbaseSettings {
    pub host: String,
    /// Cluster management port.
    pub port: u16,
    /// N1QL query service port.
    #[serde(alias = "n1qlport")]
    pub query_port: u16,
    pub bucket: String,
    #[serde(alias = "connectionTimeout")]
    pub connection_timeout_ms: u64,
    #[serde(alias = "operationTimeout")]
    pub operation_timeout_ms: u64,
    /// Free-form deployment tag, attached to every request for tracing.
    #[serde(alias = "env")]
    pub environment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for CouchbaseSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8091,
            query_port: 8093,
            bucket: "default".to_string(),
            connection_timeout_ms: 20_000,
            operation_timeout_ms: 15_000,
            environment: "debugging".to_string(),
            username: None,
            password: None,
        }
    }
}

impl CouchbaseSettings {
    pub fn builder() -> CouchbaseSettingsBuilder {
        CouchbaseSettingsBuilder::default()
    }

    /// Decodes settings from a JSON datasource object; missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if a present key has the wrong type.
    pub fn from_json(value: &Value) -> DocumentStoreResult<Self> {
        Ok(Self::deserialize(value)?)
    }

    /// The cluster connection string. Carries no port: the SDK bootstrap
    /// negotiates ports itself.
    pub fn connect_url(&self) -> String {
        format!("couchbase://{}", self.host)
    }

    /// Base URL of the N1QL query service.
    pub fn query_url(&self) -> String {
        format!("http://{}:{}", self.host, self.query_port)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

/// Builder for [`CouchbaseSettings`], starting from the defaults.
#[derive(Debug, Clone, Default)]
pub struct CouchbaseSettingsBuilder {
    settings: CouchbaseSettings,
}

impl CouchbaseSettingsBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.settings.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.settings.port = port;
        self
    }

    pub fn query_port(mut self, port: u16) -> Self {
        self.settings.query_port = port;
        self
    }

    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.settings.bucket = bucket.into();
        self
    }

    pub fn connection_timeout_ms(mut self, millis: u64) -> Self {
        self.settings.connection_timeout_ms = millis;
        self
    }

    pub fn operation_timeout_ms(mut self, millis: u64) -> Self {
        self.settings.operation_timeout_ms = millis;
        self
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.settings.environment = environment.into();
        self
    }

    /// Sets the RBAC credentials used for every request.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.settings.username = Some(username.into());
        self.settings.password = Some(password.into());
        self
    }

    pub fn build(self) -> CouchbaseSettings {
        self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_object_yields_defaults() {
        let settings = CouchbaseSettings::from_json(&json!({})).unwrap();

        assert_eq!(settings, CouchbaseSettings::default());
        assert_eq!(settings.host, "localhost");
        assert_eq!(settings.port, 8091);
        assert_eq!(settings.query_port, 8093);
        assert_eq!(settings.bucket, "default");
        assert_eq!(settings.connection_timeout_ms, 20_000);
        assert_eq!(settings.operation_timeout_ms, 15_000);
        assert_eq!(settings.environment, "debugging");
    }

    #[test]
    fn accepts_datasource_aliases() {
        let settings = CouchbaseSettings::from_json(&json!({
            "host": "cb.internal",
            "n1qlport": 18093,
            "bucket": "tickets",
            "env": "production",
            "connectionTimeout": 5000,
            "operationTimeout": 2500
        }))
        .unwrap();

        assert_eq!(settings.query_url(), "http://cb.internal:18093");
        assert_eq!(settings.connect_url(), "couchbase://cb.internal");
        assert_eq!(settings.environment, "production");
        assert_eq!(settings.connection_timeout(), Duration::from_millis(5000));
        assert_eq!(settings.operation_timeout(), Duration::from_millis(2500));
    }

    #[test]
    fn rejects_wrongly_typed_keys() {
        assert!(CouchbaseSettings::from_json(&json!({ "port": "eighty" })).is_err());
    }

    #[test]
    fn builder_overrides_defaults() {
        let settings = CouchbaseSettings::builder()
            .host("10.0.0.5")
            .bucket("tickets")
            .credentials("app", "secret")
            .build();

        assert_eq!(settings.query_url(), "http://10.0.0.5:8093");
        assert_eq!(settings.username.as_deref(), Some("app"));
        assert_eq!(settings.port, 8091);
    }
}
