//! Policy screen view-model
//!
//! Owns the [`StateContainer`] and is the only writer to it. Router
//! mutations follow one pattern:
//!
//! 1. write the desired end state immediately and mark the operation busy,
//!    keeping what was there before;
//! 2. call the store on a detached task, so the result lands even if the
//!    caller stops waiting;
//! 3. on success adopt the store's returned records, on failure put the
//!    previous records back. Either way the busy marker is cleared in the
//!    same update.
//!
//! Failures never escape as errors to the screen: they become a rollback
//! plus a toast, or a banner when the request came from the assistant.

use crate::assistant::parser::parse_command;
use crate::command::executor::{AssistantCommand, AssistantExecution, CommandExecutor};
use crate::command::resolver::IntentResolver;
use crate::core::clock::{Clock, SystemClock};
use crate::core::config::AppConfig;
use crate::core::error::{PolicyError, Result};
use crate::core::types::generate_id;
use crate::model::custom_command::{export_commands, import_commands};
use crate::model::{AssistantActionType, Client, CustomCommand, NewClient};
use crate::store::{CredentialStore, RouterStore};
use crate::ui::container::StateContainer;
use crate::ui::events::{HapticType, UiEvent};
use crate::ui::state::{ConnectionStatus, DragState, UiState};
use crate::ui::validation::{is_valid_mac, validate_credentials};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

const EVENT_CAPACITY: usize = 64;

/// How a user operation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// Store confirmed; state holds the store's records
    Committed,
    /// Store failed; state restored to the pre-operation records
    RolledBack { reason: String },
    /// Refused before anything was changed or sent
    Rejected { reason: String },
    /// Nothing to do (unknown client or policy in the current snapshot)
    Skipped,
}

impl Settlement {
    pub fn is_committed(&self) -> bool {
        matches!(self, Settlement::Committed)
    }
}

#[derive(Clone)]
pub struct PolicySwitcher {
    state: Arc<StateContainer>,
    store: Arc<dyn RouterStore>,
    credential_store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<UiEvent>,
    config: Arc<AppConfig>,
}

/// Run a settle step on its own task so dropping the caller cannot cancel it
async fn detached<T>(fut: impl Future<Output = T> + Send + 'static) -> Option<T>
where
    T: Send + 'static,
{
    match tokio::spawn(fut).await {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!("Store task aborted: {}", e);
            None
        }
    }
}

fn failure_message(error: &PolicyError, fallback: &str) -> String {
    let message = error.user_message();
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

impl PolicySwitcher {
    pub fn new(
        store: Arc<dyn RouterStore>,
        credential_store: Arc<dyn CredentialStore>,
        config: AppConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(StateContainer::default()),
            store,
            credential_store,
            clock: Arc::new(SystemClock),
            events,
            config: Arc::new(config),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Current snapshot
    pub fn state(&self) -> UiState {
        self.state.snapshot()
    }

    /// Observe every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.state.subscribe()
    }

    /// Toasts and haptics emitted from now on
    pub fn events(&self) -> broadcast::Receiver<UiEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn emit(&self, event: UiEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    fn set_assistant_banner(&self, message: String, is_error: bool) {
        let banner = CommandExecutor::banner_for_result(!is_error, message, self.clock.now());
        self.state.update(|s| s.assistant_banner = Some(banner));
    }

    // === SESSION ===

    /// Cold start: saved credentials go straight to `Ready` and refresh
    pub async fn start(&self) {
        let saved = match self.credential_store.load().await {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!("Could not load saved credentials: {}", e);
                None
            }
        };
        let Some(credentials) = saved else {
            tracing::info!("No saved credentials, waiting for login");
            return;
        };

        let last_url = self
            .credential_store
            .load_last_successful_url()
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Could not load last router URL: {}", e);
                None
            });

        let now = self.clock.now();
        self.state.update(|s| {
            s.credentials = credentials;
            s.creds_panel_expanded = false;
            s.connection_status = ConnectionStatus::Ready(now);
            s.last_successful_url = last_url;
        });
        tracing::info!("Restored saved credentials");

        self.refresh(true).await;
    }

    pub fn toggle_credentials_panel(&self) {
        self.state
            .update(|s| s.creds_panel_expanded = !s.creds_panel_expanded);
    }

    pub fn update_domain(&self, value: &str) {
        self.state
            .update(|s| s.credentials.domain_or_ip = value.to_string());
    }

    pub fn update_username(&self, value: &str) {
        self.state
            .update(|s| s.credentials.username = value.to_string());
    }

    pub fn update_password(&self, value: &str) {
        self.state
            .update(|s| s.credentials.password = value.to_string());
    }

    pub fn update_default_policy(&self, policy_id: &str) {
        self.state
            .update(|s| s.credentials.default_policy_id = policy_id.to_string());
    }

    /// Validate the form, then check the credentials against the router
    ///
    /// Returns true once the connection is `Ready`.
    pub async fn verify_connection(&self) -> bool {
        let snapshot = self.state.snapshot();
        let errors = validate_credentials(&snapshot.credentials, &snapshot.policies);
        if !errors.is_empty() {
            tracing::debug!("Credential form has {} invalid field(s)", errors.len());
            self.state.update(|s| {
                s.credential_errors = errors;
                s.connection_status = ConnectionStatus::Error("Проверьте введённые данные".into());
            });
            return false;
        }

        self.state.update(|s| {
            s.connection_status = ConnectionStatus::Validating;
            s.credential_errors.clear();
        });

        let credentials = snapshot.credentials;
        let this = self.clone();
        detached(async move {
            match this.store.verify_connection(&credentials).await {
                Ok(url) => {
                    if let Err(e) = this.credential_store.save(&credentials).await {
                        tracing::warn!("Could not save credentials: {}", e);
                    }
                    if let Err(e) = this.credential_store.save_last_successful_url(&url).await {
                        tracing::warn!("Could not save router URL: {}", e);
                    }
                    let now = this.clock.now();
                    this.state.update(|s| {
                        s.connection_status = ConnectionStatus::Ready(now);
                        s.last_successful_url = Some(url.clone());
                        s.creds_panel_expanded = false;
                    });
                    tracing::info!("Connected to {}", url);
                    this.refresh(true).await;
                    true
                }
                Err(e) => {
                    let reason = failure_message(&e, "Не удалось подключиться");
                    tracing::warn!("Connection check failed: {}", reason);
                    this.state
                        .update(|s| s.connection_status = ConnectionStatus::Error(reason));
                    false
                }
            }
        })
        .await
        .unwrap_or(false)
    }

    /// Reload policies and clients
    ///
    /// Without `force` this is a no-op unless connected and the cooldown has
    /// passed since the last successful fetch. Returns true if data was
    /// replaced.
    pub async fn refresh(&self, force: bool) -> bool {
        if !force {
            let (ready, last_synced) = self
                .state
                .read(|s| (s.connection_status.is_ready(), s.last_synced));
            if !ready {
                tracing::debug!("Refresh skipped: not connected");
                return false;
            }
            if let Some(last) = last_synced {
                if self.clock.now() - last < self.config.refresh_cooldown() {
                    tracing::debug!("Refresh skipped: cooldown");
                    return false;
                }
            }
        }

        self.state.update(|s| s.is_refreshing = true);

        let this = self.clone();
        detached(async move {
            let fetched = async {
                let policies = this.store.fetch_policies().await?;
                let clients = this.store.fetch_clients().await?;
                Ok::<_, PolicyError>((policies, clients))
            }
            .await;

            match fetched {
                Ok((policies, clients)) => {
                    let now = this.clock.now();
                    tracing::info!(
                        "Fetched {} policies and {} clients",
                        policies.len(),
                        clients.len()
                    );
                    this.state.update(|s| {
                        s.policies = policies;
                        s.clients = clients;
                        s.is_refreshing = false;
                        s.last_synced = Some(now);
                    });
                    true
                }
                Err(e) => {
                    tracing::warn!("Refresh failed: {}", e);
                    this.state.update(|s| s.is_refreshing = false);
                    this.emit(UiEvent::error_toast(failure_message(
                        &e,
                        "Не удалось обновить данные",
                    )));
                    false
                }
            }
        })
        .await
        .unwrap_or(false)
    }

    // === VIEW ===

    /// Show one policy's detail view, or the grid when `None`
    pub fn focus_on_policy(&self, policy_id: Option<&str>) {
        self.state
            .update(|s| s.focused_policy_id = policy_id.map(str::to_string));
    }

    pub fn update_search_query(&self, query: &str) {
        self.state.update(|s| s.search_query = query.to_string());
    }

    pub fn on_drag_state_change(&self, drag_state: DragState) {
        self.state.update(|s| s.drag_state = drag_state);
    }

    // === MUTATIONS ===

    pub async fn apply_policy_to_client(
        &self,
        client_id: &str,
        policy_id: &str,
        from_assistant: bool,
    ) -> Settlement {
        let snapshot = self.state.snapshot();
        let (Some(previous), Some(policy)) = (
            snapshot.client(client_id).cloned(),
            snapshot.policy(policy_id).cloned(),
        ) else {
            tracing::debug!("Apply skipped: unknown client {} or policy {}", client_id, policy_id);
            return Settlement::Skipped;
        };

        self.state.update(|s| {
            s.replace_client(previous.assigned_to(policy_id));
            s.operations_in_flight.insert(previous.id.clone());
        });

        let this = self.clone();
        detached(async move {
            let result = this
                .store
                .apply_policy_to_client(&previous.id, &policy.id)
                .await;

            match result {
                Ok(client) => {
                    this.state.update(|s| {
                        s.operations_in_flight.remove(&previous.id);
                        s.replace_client(client.clone());
                    });
                    tracing::info!("Applied {} to {}", policy.name, client.name);
                    if from_assistant {
                        this.set_assistant_banner(
                            format!("Готово: {} → {}", client.name, policy.name),
                            false,
                        );
                    }
                    this.emit(UiEvent::toast(format!(
                        "Политика {} применена для {}",
                        policy.name, client.name
                    )));
                    this.emit(UiEvent::Haptic(HapticType::Apply));
                    Settlement::Committed
                }
                Err(e) => {
                    this.state.update(|s| {
                        s.operations_in_flight.remove(&previous.id);
                        s.replace_client(previous.clone());
                    });
                    tracing::warn!("Apply {} to {} rolled back: {}", policy.id, previous.id, e);
                    if from_assistant {
                        this.set_assistant_banner(failure_message(&e, "Ошибка применения"), true);
                    }
                    let reason = failure_message(&e, "Не удалось применить");
                    this.emit(UiEvent::error_toast(reason.clone()));
                    Settlement::RolledBack { reason }
                }
            }
        })
        .await
        .unwrap_or(Settlement::RolledBack {
            reason: "Не удалось применить".into(),
        })
    }

    pub async fn clear_policy_for_client(&self, client_id: &str, from_assistant: bool) -> Settlement {
        let Some(previous) = self.state.read(|s| s.client(client_id).cloned()) else {
            tracing::debug!("Clear skipped: unknown client {}", client_id);
            return Settlement::Skipped;
        };

        self.state.update(|s| {
            s.replace_client(previous.unassigned());
            s.operations_in_flight.insert(previous.id.clone());
        });

        let this = self.clone();
        detached(async move {
            match this.store.clear_policy_for_client(&previous.id).await {
                Ok(client) => {
                    this.state.update(|s| {
                        s.operations_in_flight.remove(&previous.id);
                        s.replace_client(client.clone());
                    });
                    tracing::info!("Cleared policy for {}", client.name);
                    if from_assistant {
                        this.set_assistant_banner(format!("Снято: {}", client.name), false);
                    }
                    this.emit(UiEvent::toast(format!("Снято для {}", client.name)));
                    this.emit(UiEvent::Haptic(HapticType::Remove));
                    Settlement::Committed
                }
                Err(e) => {
                    this.state.update(|s| {
                        s.operations_in_flight.remove(&previous.id);
                        s.replace_client(previous.clone());
                    });
                    tracing::warn!("Clear for {} rolled back: {}", previous.id, e);
                    if from_assistant {
                        this.set_assistant_banner(failure_message(&e, "Ошибка снятия"), true);
                    }
                    let reason = failure_message(&e, "Не удалось снять");
                    this.emit(UiEvent::error_toast(reason.clone()));
                    Settlement::RolledBack { reason }
                }
            }
        })
        .await
        .unwrap_or(Settlement::RolledBack {
            reason: "Не удалось снять".into(),
        })
    }

    pub async fn apply_policy_to_all(&self, policy_id: &str, from_assistant: bool) -> Settlement {
        let snapshot = self.state.snapshot();
        let Some(policy) = snapshot.policy(policy_id).cloned() else {
            tracing::debug!("Bulk apply skipped: unknown policy {}", policy_id);
            return Settlement::Skipped;
        };
        let previous = snapshot.clients;

        self.state.update(|s| {
            s.clients = previous.iter().map(|c| c.assigned_to(policy_id)).collect();
            s.bulk_operation_in_progress = true;
        });

        let this = self.clone();
        detached(async move {
            match this.store.apply_policy_to_all(&policy.id).await {
                Ok(clients) => {
                    let count = clients.len();
                    this.state.update(|s| {
                        s.bulk_operation_in_progress = false;
                        s.clients = clients;
                    });
                    tracing::info!("Applied {} to {} clients", policy.name, count);
                    if from_assistant {
                        this.set_assistant_banner(format!("Готово: всем → {}", policy.name), false);
                    }
                    this.emit(UiEvent::toast(format!("{} устройств → {}", count, policy.name)));
                    Settlement::Committed
                }
                Err(e) => {
                    this.state.update(|s| {
                        s.bulk_operation_in_progress = false;
                        s.clients = previous;
                    });
                    tracing::warn!("Bulk apply of {} rolled back: {}", policy.id, e);
                    if from_assistant {
                        this.set_assistant_banner(
                            failure_message(&e, "Ошибка массового применения"),
                            true,
                        );
                    }
                    let reason = failure_message(&e, "Не удалось применить всем");
                    this.emit(UiEvent::error_toast(reason.clone()));
                    Settlement::RolledBack { reason }
                }
            }
        })
        .await
        .unwrap_or(Settlement::RolledBack {
            reason: "Не удалось применить всем".into(),
        })
    }

    /// Clear `policy_id` from every client holding it; `None` clears everyone
    pub async fn clear_policy_from_all(&self, policy_id: Option<&str>, from_assistant: bool) -> Settlement {
        let previous = self.state.read(|s| s.clients.clone());
        let target = policy_id.map(str::to_string);

        self.state.update(|s| {
            s.clients = previous
                .iter()
                .map(|c| {
                    if target.is_none() || c.policy_id == target {
                        c.unassigned()
                    } else {
                        c.clone()
                    }
                })
                .collect();
            s.bulk_operation_in_progress = true;
        });

        let this = self.clone();
        detached(async move {
            match this.store.clear_policy_from_all(target.as_deref()).await {
                Ok(clients) => {
                    let cleared = clients.iter().filter(|c| c.policy_id.is_none()).count();
                    this.state.update(|s| {
                        s.bulk_operation_in_progress = false;
                        s.clients = clients;
                    });
                    tracing::info!("Bulk clear done, {} clients without policy", cleared);
                    if from_assistant {
                        this.set_assistant_banner(format!("Сброшено: {} устройств", cleared), false);
                    }
                    this.emit(UiEvent::toast(format!("Снято у {} устройств", cleared)));
                    Settlement::Committed
                }
                Err(e) => {
                    this.state.update(|s| {
                        s.bulk_operation_in_progress = false;
                        s.clients = previous;
                    });
                    tracing::warn!("Bulk clear rolled back: {}", e);
                    if from_assistant {
                        this.set_assistant_banner(failure_message(&e, "Ошибка массового снятия"), true);
                    }
                    let reason = failure_message(&e, "Не удалось снять");
                    this.emit(UiEvent::error_toast(reason.clone()));
                    Settlement::RolledBack { reason }
                }
            }
        })
        .await
        .unwrap_or(Settlement::RolledBack {
            reason: "Не удалось снять".into(),
        })
    }

    /// Register a new device; the store assigns its id
    ///
    /// Name and MAC are checked before the store is contacted. A duplicate
    /// MAC is reported by the store.
    pub async fn register_client(
        &self,
        name: &str,
        mac: &str,
        ip: Option<&str>,
        notes: Option<&str>,
    ) -> Result<Client> {
        let name = name.trim();
        let mac = mac.trim();
        if name.is_empty() || !is_valid_mac(mac) {
            let message = "Проверьте имя и MAC";
            self.emit(UiEvent::error_toast(message));
            return Err(PolicyError::Validation(message.into()));
        }

        let request = NewClient {
            name: name.to_string(),
            mac: mac.to_string(),
            ip: ip.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string),
            notes: notes.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string),
        };

        let this = self.clone();
        detached(async move {
            match this.store.register_client(request).await {
                Ok(client) => {
                    this.state.update(|s| s.clients.push(client.clone()));
                    tracing::info!("Registered {} ({})", client.name, client.mac);
                    this.emit(UiEvent::toast(format!("Клиент {} зарегистрирован", client.name)));
                    Ok(client)
                }
                Err(e) => {
                    tracing::warn!("Registration failed: {}", e);
                    this.emit(UiEvent::error_toast(failure_message(
                        &e,
                        "Не удалось зарегистрировать",
                    )));
                    Err(e)
                }
            }
        })
        .await
        .unwrap_or_else(|| Err(PolicyError::Transport("Не удалось зарегистрировать".into())))
    }

    /// Local rename; blank names are ignored
    pub fn rename_client(&self, client_id: &str, new_name: &str) {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return;
        }
        self.state.update(|s| {
            if let Some(client) = s.clients.iter_mut().find(|c| c.id == client_id) {
                client.name = new_name.to_string();
            }
        });
    }

    pub fn set_client_registration(&self, client_id: &str, registered: bool) {
        self.state.update(|s| {
            if let Some(client) = s.clients.iter_mut().find(|c| c.id == client_id) {
                client.registered = registered;
            }
        });
    }

    // === ASSISTANT ===

    /// Interpret a typed or dictated command and run it
    ///
    /// All feedback goes to the assistant banner. Enabled custom phrases are
    /// checked before the built-in patterns.
    pub async fn handle_assistant_command(&self, command: &str) -> Settlement {
        if command.trim().is_empty() {
            return self.reject_assistant("Введите команду".into());
        }

        let snapshot = self.state.snapshot();
        let custom = IntentResolver::new(&snapshot)
            .resolve_custom_phrase(command)
            .cloned();

        let execution = match custom {
            Some(custom) => {
                tracing::debug!("Assistant matched custom command {}", custom.id);
                CommandExecutor::execute_custom(&custom, &snapshot)
            }
            None => match parse_command(command) {
                Some(intent) => CommandExecutor::execute(&intent, &snapshot),
                None => return self.reject_assistant("Не распознано".into()),
            },
        };

        match execution {
            AssistantExecution::Error { reason } => self.reject_assistant(reason),
            AssistantExecution::Command(cmd) => self.dispatch_command(cmd, true).await,
        }
    }

    fn reject_assistant(&self, reason: String) -> Settlement {
        tracing::debug!("Assistant rejected command: {}", reason);
        self.set_assistant_banner(reason.clone(), true);
        Settlement::Rejected { reason }
    }

    async fn dispatch_command(&self, cmd: AssistantCommand, from_assistant: bool) -> Settlement {
        for note in &cmd.notes {
            tracing::info!("Assistant: {}", note);
        }

        let client_id = cmd.client.as_ref().map(|c| c.id.as_str());
        let policy_id = cmd.policy.as_ref().map(|p| p.id.as_str());

        match (cmd.action_type, client_id, policy_id) {
            (AssistantActionType::ApplyToDevice, Some(client_id), Some(policy_id)) => {
                self.apply_policy_to_client(client_id, policy_id, from_assistant).await
            }
            (AssistantActionType::RemoveFromDevice, Some(client_id), _) => {
                self.clear_policy_for_client(client_id, from_assistant).await
            }
            (AssistantActionType::ApplyToAll, _, Some(policy_id)) => {
                self.apply_policy_to_all(policy_id, from_assistant).await
            }
            (AssistantActionType::RemoveFromAll, _, policy_id) => {
                self.clear_policy_from_all(policy_id, from_assistant).await
            }
            _ => Settlement::Skipped,
        }
    }

    pub fn dismiss_assistant_banner(&self) {
        self.state.update(|s| s.assistant_banner = None);
    }

    // === CUSTOM COMMANDS ===

    /// Run a stored command by id, as from the commands list
    ///
    /// Phrase matching and the enabled flag are bypassed. Problems surface
    /// as an error toast rather than the assistant banner.
    pub async fn run_custom_command(&self, command_id: &str) -> Settlement {
        let snapshot = self.state.snapshot();
        let Some(command) = snapshot.custom_commands.iter().find(|c| c.id == command_id) else {
            tracing::debug!("Run skipped: unknown custom command {}", command_id);
            return Settlement::Skipped;
        };

        match CommandExecutor::execute_custom(command, &snapshot) {
            AssistantExecution::Error { reason } => {
                tracing::debug!("Custom command {} not runnable: {}", command_id, reason);
                self.emit(UiEvent::error_toast(reason.clone()));
                Settlement::Rejected { reason }
            }
            AssistantExecution::Command(cmd) => self.dispatch_command(cmd, false).await,
        }
    }

    /// Add a command under a freshly generated id, which is returned
    pub fn add_custom_command(&self, command: CustomCommand) -> String {
        let id = generate_id();
        let command = CustomCommand {
            id: id.clone(),
            ..command
        };
        self.state.update(|s| s.custom_commands.push(command));
        id
    }

    /// Replace the command with the same id; returns false if none exists
    pub fn update_custom_command(&self, command: CustomCommand) -> bool {
        let mut found = false;
        self.state.update(|s| {
            if let Some(slot) = s.custom_commands.iter_mut().find(|c| c.id == command.id) {
                *slot = command;
                found = true;
            }
        });
        found
    }

    pub fn remove_custom_command(&self, command_id: &str) -> bool {
        let mut removed = false;
        self.state.update(|s| {
            let before = s.custom_commands.len();
            s.custom_commands.retain(|c| c.id != command_id);
            removed = s.custom_commands.len() != before;
        });
        removed
    }

    pub fn export_commands_as_json(&self) -> Result<String> {
        self.state.read(|s| export_commands(&s.custom_commands))
    }

    /// Replace all custom commands; on malformed input nothing changes
    pub fn import_commands_from_json(&self, json: &str) -> Result<usize> {
        let commands = match import_commands(json) {
            Ok(commands) => commands,
            Err(e) => {
                tracing::warn!("Custom command import rejected: {}", e);
                return Err(e);
            }
        };
        let count = commands.len();
        self.state.update(|s| s.custom_commands = commands);
        tracing::info!("Imported {} custom commands", count);
        Ok(count)
    }
}
