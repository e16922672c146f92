//! Publishing config sections into a secret store.
//!
//! Every section of a [`ConfigDocument`] becomes one write at
//! `<namespace>/<environment>/<section>`, issued in file order, one at a
//! time. The first failed write stops the run; sections written before it
//! are left in place.

use crate::error::Result;
use crate::ini::{ConfigDocument, SectionBody};
use crate::store::SecretStore;
use std::fmt;
use tracing::{info, instrument};

/// Where a section is written: `namespace/environment/section`.
///
/// Components are joined as-is. A component containing `/` yields a deeper
/// or ambiguous path; that is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget<'a> {
    pub namespace: &'a str,
    pub environment: &'a str,
    pub section: &'a str,
}

impl PublishTarget<'_> {
    pub fn path(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PublishTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.environment, self.section)
    }
}

/// One planned write, without secret values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedWrite {
    pub path: String,
    pub keys: Vec<String>,
}

/// Outcome of a complete publish.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Paths written, in order
    pub written: Vec<String>,
}

/// Publishes config sections under a namespace and environment.
pub struct SecretPublisher<S> {
    store: S,
    namespace: String,
    environment: String,
}

impl<S: SecretStore> SecretPublisher<S> {
    pub fn new(store: S, namespace: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            environment: environment.into(),
        }
    }

    pub fn target<'a>(&'a self, section: &'a str) -> PublishTarget<'a> {
        PublishTarget {
            namespace: &self.namespace,
            environment: &self.environment,
            section,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Write one section's key-value pairs.
    ///
    /// Returns the store's response body, if any.
    pub async fn set(
        &self,
        section: &str,
        key_values: &SectionBody,
    ) -> Result<Option<serde_json::Value>> {
        let path = self.target(section).path();
        let response = self.store.write(&path, key_values).await?;
        info!(%path, keys = key_values.len(), "published section");
        Ok(response)
    }

    /// Write every section of `document`, in order, stopping at the first
    /// failure.
    pub async fn publish(&self, document: &ConfigDocument) -> Result<PublishReport> {
        self.publish_with(document, |_| {}).await
    }

    /// Like [`SecretPublisher::publish`], calling `on_written` with each path
    /// right after it is written.
    #[instrument(skip_all, fields(namespace = %self.namespace, environment = %self.environment))]
    pub async fn publish_with<F>(
        &self,
        document: &ConfigDocument,
        mut on_written: F,
    ) -> Result<PublishReport>
    where
        F: FnMut(&str),
    {
        let mut report = PublishReport::default();

        for (section, body) in document.iter() {
            self.set(section, body).await?;
            let path = self.target(section).path();
            on_written(&path);
            report.written.push(path);
        }

        Ok(report)
    }

    /// Writes that [`SecretPublisher::publish`] would issue.
    pub fn plan(&self, document: &ConfigDocument) -> Vec<PlannedWrite> {
        document
            .iter()
            .map(|(section, body)| PlannedWrite {
                path: self.target(section).path(),
                keys: body.keys().cloned().collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UploadError;
    use crate::ini::ParseOptions;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records writes; fails the write whose 1-based position is `fail_at`.
    #[derive(Default)]
    struct RecordingStore {
        writes: Mutex<Vec<(String, SectionBody)>>,
        attempts: Mutex<usize>,
        fail_at: Option<usize>,
    }

    #[async_trait]
    impl SecretStore for RecordingStore {
        async fn write(
            &self,
            path: &str,
            payload: &SectionBody,
        ) -> Result<Option<serde_json::Value>> {
            let mut attempts = self.attempts.lock().unwrap();
            *attempts += 1;
            if Some(*attempts) == self.fail_at {
                return Err(UploadError::Server {
                    status: 500,
                    path: path.to_string(),
                    message: "forced failure".to_string(),
                });
            }
            self.writes
                .lock()
                .unwrap()
                .push((path.to_string(), payload.clone()));
            Ok(None)
        }
    }

    fn document(content: &str) -> ConfigDocument {
        ConfigDocument::parse_str(content, ParseOptions::case_sensitive()).unwrap()
    }

    #[test]
    fn test_target_path_composition() {
        let target = PublishTarget {
            namespace: "app1",
            environment: "prod",
            section: "db",
        };
        assert_eq!(target.path(), "app1/prod/db");
    }

    #[test]
    fn test_set_writes_to_composed_path() {
        let publisher = SecretPublisher::new(RecordingStore::default(), "app1", "prod");
        let mut body = SectionBody::new();
        body.insert("user".to_string(), "admin".to_string());

        tokio_test::block_on(publisher.set("db", &body)).unwrap();

        let writes = publisher.store().writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, "app1/prod/db");
        assert_eq!(writes[0].1, body);
    }

    #[test]
    fn test_publish_in_file_order() {
        let doc = document(
            "[DEFAULT]\nregion = eu\n[web]\nport = 80\n[db]\nuser = admin\n[cache]\nttl = 60\n",
        );
        let publisher = SecretPublisher::new(RecordingStore::default(), "shop", "staging");

        let report = tokio_test::block_on(publisher.publish(&doc)).unwrap();

        assert_eq!(
            report.written,
            vec!["shop/staging/web", "shop/staging/db", "shop/staging/cache"]
        );
        let writes = publisher.store().writes.lock().unwrap();
        assert_eq!(writes[1].1.get("region"), Some(&"eu".to_string()));
        assert_eq!(writes[1].1.get("user"), Some(&"admin".to_string()));
    }

    #[test]
    fn test_publish_stops_at_first_failure() {
        let doc = document("[a]\nk = 1\n[b]\nk = 2\n[c]\nk = 3\n");
        let store = RecordingStore {
            fail_at: Some(2),
            ..Default::default()
        };
        let publisher = SecretPublisher::new(store, "ns", "env");

        let result = tokio_test::block_on(publisher.publish(&doc));

        assert!(matches!(result, Err(UploadError::Server { ref path, .. }) if path == "ns/env/b"));
        let writes = publisher.store().writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, "ns/env/a");
        assert_eq!(*publisher.store().attempts.lock().unwrap(), 2);
    }

    #[test]
    fn test_publish_with_reports_progress() {
        let doc = document("[a]\nk = 1\n[b]\nk = 2\n");
        let publisher = SecretPublisher::new(RecordingStore::default(), "ns", "env");
        let mut seen = Vec::new();

        tokio_test::block_on(publisher.publish_with(&doc, |path| seen.push(path.to_string())))
            .unwrap();

        assert_eq!(seen, vec!["ns/env/a", "ns/env/b"]);
    }

    #[test]
    fn test_publish_twice_sends_identical_payloads() {
        let doc = document("[DEFAULT]\nshared = x\n[a]\nk = 1\n[b]\nk = 2\n");
        let publisher = SecretPublisher::new(RecordingStore::default(), "ns", "env");

        tokio_test::block_on(publisher.publish(&doc)).unwrap();
        tokio_test::block_on(publisher.publish(&doc)).unwrap();

        let writes = publisher.store().writes.lock().unwrap();
        assert_eq!(writes.len(), 4);
        assert_eq!(writes[0], writes[2]);
        assert_eq!(writes[1], writes[3]);
    }

    #[test]
    fn test_plan_lists_paths_and_keys_only() {
        let doc = document("[db]\npassword = hunter2\nuser = admin\n");
        let publisher = SecretPublisher::new(RecordingStore::default(), "app1", "prod");

        let plan = publisher.plan(&doc);

        assert_eq!(
            plan,
            vec![PlannedWrite {
                path: "app1/prod/db".to_string(),
                keys: vec!["password".to_string(), "user".to_string()],
            }]
        );
        assert!(publisher.store().writes.lock().unwrap().is_empty());
    }
}
