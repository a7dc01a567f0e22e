use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use couchlayer_core::{
    backend::{DocumentStore, DocumentStoreBuilder},
    compiler::CompiledClause,
    config::CouchbaseSettings,
    error::{DocumentStoreError, DocumentStoreResult},
    record::Record,
};

use crate::{
    response::{QueryError, QueryRequest, QueryResponse},
    statement,
};

/// Store backed by the Couchbase N1QL query service.
///
/// Every operation, including the key-value ones, is a single statement
/// posted to `/query/service` with positional arguments.
#[derive(Debug)]
pub struct CouchbaseStore {
    client: reqwest::Client,
    settings: CouchbaseSettings,
}

impl CouchbaseStore {
    pub fn new(client: reqwest::Client, settings: CouchbaseSettings) -> Self {
        Self { client, settings }
    }

    pub fn builder(settings: CouchbaseSettings) -> CouchbaseStoreBuilder {
        CouchbaseStoreBuilder::new(settings)
    }

    pub fn settings(&self) -> &CouchbaseSettings {
        &self.settings
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.settings.query_url(), path)
    }

    fn context_id(&self) -> String {
        format!("{}-{}", self.settings.environment, Uuid::new_v4())
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.settings.username {
            Some(username) => request.basic_auth(username, self.settings.password.as_deref()),
            None => request,
        }
    }

    #[tracing::instrument(level = "debug", skip(self, args), fields(args = args.len()), err)]
    async fn execute(&self, statement: &str, args: &[Value]) -> Result<Vec<Value>, QueryError> {
        let request = QueryRequest {
            statement,
            args,
            timeout: format!("{}ms", self.settings.operation_timeout_ms),
            client_context_id: self.context_id(),
        };

        let response = self
            .authorize(self.client.post(self.endpoint("/query/service")))
            .json(&request)
            .send()
            .await?;
        let http_status = response.status();
        let body = match response.json::<QueryResponse>().await {
            Ok(body) => body,
            // error pages from proxies in front of the service carry no query body
            Err(_) if !http_status.is_success() => QueryResponse::default(),
            Err(err) => return Err(err.into()),
        };

        body.into_results(http_status).inspect_err(|err| {
            tracing::warn!(%http_status, error = %err, "statement failed");
        })
    }
}

#[async_trait]
impl DocumentStore for CouchbaseStore {
    async fn get(&self, bucket: &str, key: &str) -> DocumentStoreResult<Record> {
        let rows = self
            .execute(&statement::get(bucket)?, &[Value::from(key)])
            .await
            .map_err(DocumentStoreError::backend)?;

        match rows.into_iter().next() {
            Some(row) => Record::try_from(row),
            None => Err(DocumentStoreError::DocumentNotFound(key.to_string(), bucket.to_string())),
        }
    }

    async fn insert(&self, bucket: &str, key: &str, record: Record) -> DocumentStoreResult<()> {
        self.execute(&statement::insert(bucket)?, &[Value::from(key), record.into_value()])
            .await
            .map_err(|err| match err {
                err if err.is_duplicate_key() => {
                    DocumentStoreError::DocumentAlreadyExists(key.to_string(), bucket.to_string())
                }
                err => DocumentStoreError::backend(err),
            })?;

        Ok(())
    }

    async fn upsert(&self, bucket: &str, key: &str, record: Record) -> DocumentStoreResult<()> {
        self.execute(&statement::upsert(bucket)?, &[Value::from(key), record.into_value()])
            .await
            .map_err(DocumentStoreError::backend)?;

        Ok(())
    }

    async fn remove(&self, bucket: &str, key: &str) -> DocumentStoreResult<()> {
        let rows = self
            .execute(&statement::remove(bucket)?, &[Value::from(key)])
            .await
            .map_err(DocumentStoreError::backend)?;

        if rows.is_empty() {
            return Err(DocumentStoreError::DocumentNotFound(key.to_string(), bucket.to_string()));
        }

        Ok(())
    }

    async fn run_query(
        &self,
        _bucket: &str,
        clause: &CompiledClause,
    ) -> DocumentStoreResult<Vec<Value>> {
        self.execute(clause.statement(), clause.args())
            .await
            .map_err(DocumentStoreError::backend)
    }
}

/// Connects to the query service described by [`CouchbaseSettings`].
#[derive(Debug)]
pub struct CouchbaseStoreBuilder {
    settings: CouchbaseSettings,
}

impl CouchbaseStoreBuilder {
    pub fn new(settings: CouchbaseSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl DocumentStoreBuilder for CouchbaseStoreBuilder {
    type Store = CouchbaseStore;

    /// Builds the HTTP client and pings the query service once.
    async fn connect(self) -> DocumentStoreResult<Self::Store> {
        tracing::debug!(
            cluster = %self.settings.connect_url(),
            query_url = %self.settings.query_url(),
            bucket = %self.settings.bucket,
            "connecting"
        );

        let client = reqwest::Client::builder()
            .connect_timeout(self.settings.connection_timeout())
            .timeout(self.settings.operation_timeout())
            .build()
            .map_err(|e| DocumentStoreError::Connection(e.to_string()))?;
        let store = CouchbaseStore::new(client, self.settings);

        store
            .authorize(store.client.get(store.endpoint("/admin/ping")))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                tracing::warn!(error = %e, "query service unreachable");
                DocumentStoreError::Connection(e.to_string())
            })?;

        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use couchlayer_core::adapter::StoreAdapter;
    use reqwest::StatusCode;
    use serde_json::json;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    fn store(settings: CouchbaseSettings) -> CouchbaseStore {
        CouchbaseStore::new(reqwest::Client::new(), settings)
    }

    /// Serves every request with the same canned answer and returns settings
    /// pointing at it.
    async fn query_service(status: &'static str, body: Value) -> CouchbaseSettings {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let body = body.to_string();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let body = body.clone();
                tokio::spawn(async move {
                    read_request(&mut socket).await;
                    let response = format!(
                        "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    socket.write_all(response.as_bytes()).await.unwrap();
                    socket.shutdown().await.ok();
                });
            }
        });

        CouchbaseSettings::builder().host("127.0.0.1").query_port(port).build()
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    fn status_failure(err: &DocumentStoreError) -> Option<(StatusCode, String)> {
        let DocumentStoreError::Backend(source) = err else {
            return None;
        };
        match source.downcast_ref::<QueryError>()? {
            QueryError::Status { http, status } => Some((*http, status.clone())),
            _ => None,
        }
    }

    #[test]
    fn endpoints_use_the_query_port() {
        let store = store(CouchbaseSettings::builder().host("cb.local").query_port(18093).build());

        assert_eq!(store.endpoint("/query/service"), "http://cb.local:18093/query/service");
        assert_eq!(store.endpoint("/admin/ping"), "http://cb.local:18093/admin/ping");
    }

    #[test]
    fn context_ids_carry_the_environment() {
        let store = store(CouchbaseSettings::builder().environment("staging").build());

        let first = store.context_id();
        let (environment, id) = first.split_once('-').unwrap();
        assert_eq!(environment, "staging");
        assert!(Uuid::parse_str(id).is_ok());
        assert_ne!(first, store.context_id());
    }

    #[tokio::test]
    async fn get_returns_the_first_row() {
        let settings = query_service(
            "200 OK",
            json!({
                "status": "success",
                "results": [{ "documentId": "t-1", "documentType": "Ticket", "status": "open" }]
            }),
        )
        .await;
        let store = store(settings);

        let record = store.get("tickets", "t-1").await.unwrap();
        assert_eq!(record.document_id(), Some("t-1"));
        assert_eq!(record.get("status"), Some(&json!("open")));
    }

    #[tokio::test]
    async fn empty_results_mean_the_key_is_missing() {
        let settings = query_service("200 OK", json!({ "status": "success", "results": [] })).await;

        let store = store(settings.clone());
        assert!(matches!(
            store.get("tickets", "t-9").await,
            Err(DocumentStoreError::DocumentNotFound(key, bucket)) if key == "t-9" && bucket == "tickets"
        ));
        assert!(matches!(
            store.remove("tickets", "t-9").await,
            Err(DocumentStoreError::DocumentNotFound(..))
        ));

        let adapter = StoreAdapter::new(self::store(settings), "tickets");
        assert!(!adapter.exists("Ticket", "t-9").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_key_errors_become_already_exists() {
        let settings = query_service(
            "200 OK",
            json!({
                "status": "errors",
                "errors": [{ "code": 12009, "msg": "DML Error, possible causes include CAS mismatch. Failed to perform INSERT - cause: Duplicate Key t-1" }]
            }),
        )
        .await;
        let store = store(settings);
        let record = Record::try_from(json!({ "status": "open" })).unwrap();

        assert!(matches!(
            store.insert("tickets", "t-1", record).await,
            Err(DocumentStoreError::DocumentAlreadyExists(key, bucket)) if key == "t-1" && bucket == "tickets"
        ));
    }

    #[tokio::test]
    async fn unavailable_service_is_not_a_missing_key() {
        let settings = query_service("503 Service Unavailable", json!({ "status": "fatal" })).await;

        let store = store(settings.clone());
        let err = store.get("tickets", "t-1").await.unwrap_err();
        assert_eq!(
            status_failure(&err),
            Some((StatusCode::SERVICE_UNAVAILABLE, "fatal".to_string()))
        );
        let err = store.remove("tickets", "t-1").await.unwrap_err();
        assert!(status_failure(&err).is_some());

        let adapter = StoreAdapter::new(self::store(settings), "tickets");
        let err = adapter.exists("Ticket", "t-1").await.unwrap_err();
        assert!(status_failure(&err).is_some());
    }

    #[tokio::test]
    async fn unfinished_statements_are_failures() {
        let settings = query_service("200 OK", json!({ "status": "timeout", "results": [] })).await;
        let store = store(settings);

        let err = store.get("tickets", "t-1").await.unwrap_err();
        assert_eq!(status_failure(&err), Some((StatusCode::OK, "timeout".to_string())));
    }

    #[tokio::test]
    async fn connect_pings_the_query_service() {
        let healthy = query_service("200 OK", json!({ "status": "OK" })).await;
        assert!(CouchbaseStore::builder(healthy).connect().await.is_ok());

        let unavailable = query_service("503 Service Unavailable", json!({})).await;
        assert!(matches!(
            CouchbaseStore::builder(unavailable).connect().await,
            Err(DocumentStoreError::Connection(_))
        ));
    }
}
