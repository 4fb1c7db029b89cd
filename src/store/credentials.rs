//! Credential persistence: an in-memory store and a JSON key-value file

use crate::core::error::Result;
use crate::model::Credentials;
use crate::store::CredentialStore;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

const KEY_DOMAIN: &str = "domain";
const KEY_USERNAME: &str = "username";
const KEY_PASSWORD: &str = "password";
const KEY_DEFAULT_POLICY: &str = "default_policy";
const KEY_LAST_URL: &str = "last_url";

/// Keeps credentials for the lifetime of the process only
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    credentials: Mutex<Option<Credentials>>,
    last_url: Mutex<Option<String>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that already holds credentials, as after a previous session
    pub fn with_credentials(credentials: Credentials, last_url: Option<String>) -> Self {
        Self {
            credentials: Mutex::new(Some(credentials)),
            last_url: Mutex::new(last_url),
        }
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn load(&self) -> Result<Option<Credentials>> {
        Ok(self.credentials.lock().await.clone())
    }

    async fn save(&self, credentials: &Credentials) -> Result<()> {
        *self.credentials.lock().await = Some(credentials.clone());
        Ok(())
    }

    async fn save_last_successful_url(&self, url: &str) -> Result<()> {
        *self.last_url.lock().await = Some(url.to_string());
        Ok(())
    }

    async fn load_last_successful_url(&self) -> Result<Option<String>> {
        Ok(self.last_url.lock().await.clone())
    }
}

/// Flat string map persisted as a JSON object
///
/// Every write rewrites the whole file through a temporary sibling and a
/// rename, so a crash never leaves a half-written file behind.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    // serializes read-modify-write cycles
    lock: Mutex<()>,
}

type Entries = BTreeMap<String, String>;

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> Result<Entries> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Entries::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_entries(&self, entries: &Entries) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, serde_json::to_string_pretty(entries)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn update(&self, edit: impl FnOnce(&mut Entries)) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries().await?;
        edit(&mut entries);
        self.write_entries(&entries).await
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<Credentials>> {
        let _guard = self.lock.lock().await;
        let entries = self.read_entries().await?;
        if !entries.contains_key(KEY_DOMAIN) {
            return Ok(None);
        }
        let get = |key: &str| entries.get(key).cloned().unwrap_or_default();
        Ok(Some(Credentials {
            domain_or_ip: get(KEY_DOMAIN),
            username: get(KEY_USERNAME),
            password: get(KEY_PASSWORD),
            default_policy_id: get(KEY_DEFAULT_POLICY),
        }))
    }

    async fn save(&self, credentials: &Credentials) -> Result<()> {
        let credentials = credentials.clone();
        self.update(move |entries| {
            entries.insert(KEY_DOMAIN.into(), credentials.domain_or_ip);
            entries.insert(KEY_USERNAME.into(), credentials.username);
            entries.insert(KEY_PASSWORD.into(), credentials.password);
            entries.insert(KEY_DEFAULT_POLICY.into(), credentials.default_policy_id);
        })
        .await
    }

    async fn save_last_successful_url(&self, url: &str) -> Result<()> {
        let url = url.to_string();
        self.update(move |entries| {
            entries.insert(KEY_LAST_URL.into(), url);
        })
        .await
    }

    async fn load_last_successful_url(&self) -> Result<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_entries().await?.remove(KEY_LAST_URL))
    }
}
