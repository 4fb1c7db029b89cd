//! In-memory router that simulates network latency
//!
//! Operations are serialized behind one async mutex, and each one sleeps for
//! its configured latency while holding it, so overlapping calls queue up the
//! way they would against a slow router.

use crate::core::config::LatencyConfig;
use crate::core::error::{PolicyError, Result};
use crate::core::types::generate_id;
use crate::model::{Client, Credentials, NewClient, Policy};
use crate::store::RouterStore;
use async_trait::async_trait;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::sync::Mutex;

struct RouterData {
    policies: Vec<Policy>,
    clients: Vec<Client>,
}

pub struct FakeRouterStore {
    data: Mutex<RouterData>,
    latency: LatencyConfig,
    /// Message for the next call to fail with
    injected_failure: StdMutex<Option<String>>,
}

impl FakeRouterStore {
    /// Router pre-populated with a typical home setup
    pub fn new(latency: LatencyConfig) -> Self {
        Self::with_data(seed_policies(), seed_clients(), latency)
    }

    pub fn with_data(policies: Vec<Policy>, clients: Vec<Client>, latency: LatencyConfig) -> Self {
        Self {
            data: Mutex::new(RouterData { policies, clients }),
            latency,
            injected_failure: StdMutex::new(None),
        }
    }

    /// Make the next operation fail with a transport error
    pub fn fail_next(&self, message: impl Into<String>) {
        let mut slot = self
            .injected_failure
            .lock()
            .unwrap_or_else(|p| p.into_inner());
        *slot = Some(message.into());
    }

    fn check_injected_failure(&self) -> Result<()> {
        let mut slot = self
            .injected_failure
            .lock()
            .unwrap_or_else(|p| p.into_inner());
        match slot.take() {
            Some(message) => {
                tracing::debug!("Injected router failure: {}", message);
                Err(PolicyError::Transport(message))
            }
            None => Ok(()),
        }
    }

    async fn simulate(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

fn normalize_domain(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with("http") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

fn client_not_found() -> PolicyError {
    PolicyError::NotFound("Клиент не найден".into())
}

#[async_trait]
impl RouterStore for FakeRouterStore {
    async fn verify_connection(&self, credentials: &Credentials) -> Result<String> {
        self.simulate(self.latency.verify()).await;
        self.check_injected_failure()?;

        if credentials.is_complete() {
            Ok(normalize_domain(&credentials.domain_or_ip))
        } else {
            Err(PolicyError::Validation(
                "Введите домен, логин и пароль".into(),
            ))
        }
    }

    async fn fetch_policies(&self) -> Result<Vec<Policy>> {
        self.simulate(self.latency.fetch_policies()).await;
        self.check_injected_failure()?;
        Ok(self.data.lock().await.policies.clone())
    }

    async fn fetch_clients(&self) -> Result<Vec<Client>> {
        self.simulate(self.latency.fetch_clients()).await;
        self.check_injected_failure()?;
        Ok(self.data.lock().await.clients.clone())
    }

    async fn apply_policy_to_client(&self, client_id: &str, policy_id: &str) -> Result<Client> {
        let mut data = self.data.lock().await;
        self.simulate(self.latency.single_mutation()).await;
        self.check_injected_failure()?;

        if !data.policies.iter().any(|p| p.id == policy_id) {
            return Err(PolicyError::NotFound(format!(
                "Политика {} не найдена",
                policy_id
            )));
        }
        let client = data
            .clients
            .iter_mut()
            .find(|c| c.id == client_id)
            .ok_or_else(client_not_found)?;
        *client = client.assigned_to(policy_id);
        Ok(client.clone())
    }

    async fn clear_policy_for_client(&self, client_id: &str) -> Result<Client> {
        let mut data = self.data.lock().await;
        self.simulate(self.latency.single_mutation()).await;
        self.check_injected_failure()?;

        let client = data
            .clients
            .iter_mut()
            .find(|c| c.id == client_id)
            .ok_or_else(client_not_found)?;
        *client = client.unassigned();
        Ok(client.clone())
    }

    async fn apply_policy_to_all(&self, policy_id: &str) -> Result<Vec<Client>> {
        let mut data = self.data.lock().await;
        self.simulate(self.latency.bulk_mutation()).await;
        self.check_injected_failure()?;

        if !data.policies.iter().any(|p| p.id == policy_id) {
            return Err(PolicyError::NotFound(format!(
                "Политика {} не найдена",
                policy_id
            )));
        }
        for client in data.clients.iter_mut() {
            if client.policy_id.as_deref() != Some(policy_id) {
                *client = client.assigned_to(policy_id);
            }
        }
        Ok(data.clients.clone())
    }

    async fn clear_policy_from_all(&self, policy_id: Option<&str>) -> Result<Vec<Client>> {
        let mut data = self.data.lock().await;
        self.simulate(self.latency.bulk_mutation()).await;
        self.check_injected_failure()?;

        for client in data.clients.iter_mut() {
            if policy_id.is_none() || client.policy_id.as_deref() == policy_id {
                *client = client.unassigned();
            }
        }
        Ok(data.clients.clone())
    }

    async fn register_client(&self, request: NewClient) -> Result<Client> {
        let mut data = self.data.lock().await;
        self.simulate(self.latency.register()).await;
        self.check_injected_failure()?;

        if data
            .clients
            .iter()
            .any(|c| c.mac.eq_ignore_ascii_case(&request.mac))
        {
            return Err(PolicyError::Duplicate("MAC уже зарегистрирован".into()));
        }

        let client = Client {
            id: generate_id(),
            name: request.name,
            mac: request.mac.to_uppercase(),
            ip: request.ip,
            policy_id: None,
            registered: true,
            alias: None,
            notes: request.notes,
            has_private_mac_warning: false,
        };
        data.clients.push(client.clone());
        tracing::debug!("Registered client {} ({})", client.name, client.mac);
        Ok(client)
    }
}

fn seed_policies() -> Vec<Policy> {
    vec![
        Policy::new("conform", "Conform").with_description("Дефолтный профиль Keenetic"),
        Policy::new("office", "Office"),
        Policy::new("kids", "Kids"),
        Policy::new("vpn", "WireGuard VPN"),
        Policy::new("guest", "Guest"),
    ]
}

fn seed_clients() -> Vec<Client> {
    vec![
        Client::new("c1", "Ноутбук Макс", "AA:BB:CC:DD:EE:01")
            .with_ip("192.168.10.20")
            .with_policy("office")
            .registered(),
        Client {
            has_private_mac_warning: true,
            ..Client::new("c2", "Планшет", "AA:BB:CC:DD:EE:02").with_ip("192.168.10.30")
        },
        Client::new("c3", "Smart TV", "AA:BB:CC:DD:EE:03")
            .with_ip("192.168.10.40")
            .with_policy("vpn")
            .registered(),
        Client::new("c4", "Смартфон Ани", "AA:BB:CC:DD:EE:04")
            .with_ip("192.168.10.50")
            .with_policy("kids")
            .registered(),
        Client::new("c5", "Printer", "AA:BB:CC:DD:EE:05")
            .with_ip("192.168.10.60")
            .registered(),
    ]
}
