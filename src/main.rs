//! Policy Switcher - Entry Point
//!
//! Interactive console front end for the policy screen. It wires the
//! view-model to the simulated router and a credentials file, then reads
//! commands in a loop. Anything that is not a console command goes to the
//! assistant.

use clap::Parser;
use policy_switcher::core::config::{config, set_config, AppConfig, LatencyConfig};
use policy_switcher::core::error::Result;
use policy_switcher::model::{AssistantActionType, Client, CustomCommand};
use policy_switcher::store::{FakeRouterStore, FileCredentialStore};
use policy_switcher::ui::{ConnectionStatus, PolicySwitcher, Settlement, UiEvent, UiState};

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::sync::broadcast;

/// Assign router access policies to devices from the console
#[derive(Parser, Debug)]
#[command(name = "policy-switcher")]
#[command(about = "Assign router access policies to devices, by hand or by assistant phrase")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where saved credentials live (overrides the config file)
    #[arg(long)]
    credentials_file: Option<PathBuf>,

    /// Run one assistant command and exit
    #[arg(long, short = 'c')]
    command: Option<String>,

    /// Answer instantly instead of simulating router latency
    #[arg(long)]
    no_latency: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "policy_switcher=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut app_config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(path) = args.credentials_file {
        app_config.credentials_path = path;
    }
    if args.no_latency {
        app_config.latency = LatencyConfig::zero();
    }
    if set_config(app_config).is_err() {
        tracing::warn!("Configuration was already initialized");
    }
    let app_config = config().clone();

    tracing::info!("Policy Switcher starting...");

    let rt = Runtime::new()?;

    let store = Arc::new(FakeRouterStore::new(app_config.latency.clone()));
    let credential_store = Arc::new(FileCredentialStore::new(&app_config.credentials_path));
    let switcher = PolicySwitcher::new(store, credential_store, app_config);
    let mut events = switcher.events();

    rt.block_on(switcher.start());

    if let Some(command) = args.command {
        if !switcher.state().connection_status.is_ready() {
            println!("Not connected. Run without --command and log in first.");
            return Ok(());
        }
        let settlement = rt.block_on(switcher.handle_assistant_command(&command));
        print_events(&mut events);
        print_banner(&switcher.state());
        print_settlement(&settlement);
        return Ok(());
    }

    println!("\n=== POLICY SWITCHER ===");
    print_help();

    loop {
        print_status(&switcher.state());

        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input == "quit" || input == "q" {
            break;
        }

        let (verb, rest) = match input.split_once(' ') {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (input, ""),
        };

        match verb {
            "help" | "h" => print_help(),
            "login" => {
                let parts: Vec<&str> = rest.split_whitespace().collect();
                if parts.len() < 3 {
                    println!("Usage: login <domain> <user> <password> [default-policy]");
                    continue;
                }
                switcher.update_domain(parts[0]);
                switcher.update_username(parts[1]);
                switcher.update_password(parts[2]);
                if let Some(policy) = parts.get(3) {
                    switcher.update_default_policy(policy);
                }
                if !rt.block_on(switcher.verify_connection()) {
                    let state = switcher.state();
                    for (field, error) in &state.credential_errors {
                        println!("  {:?}: {}", field, error);
                    }
                }
            }
            "refresh" | "r" => {
                if !rt.block_on(switcher.refresh(rest == "force")) {
                    println!("Nothing refreshed");
                }
            }
            "policies" | "p" => print_policies(&switcher.state()),
            "clients" | "c" => print_clients(&switcher.state()),
            "focus" => switcher.focus_on_policy((!rest.is_empty()).then_some(rest)),
            "search" => switcher.update_search_query(rest),
            "apply" => match rest.split_once(' ') {
                Some((client, policy)) => {
                    let settlement =
                        rt.block_on(switcher.apply_policy_to_client(client, policy.trim(), false));
                    print_settlement(&settlement);
                }
                None => println!("Usage: apply <client-id> <policy-id>"),
            },
            "clear" => {
                if rest.is_empty() {
                    println!("Usage: clear <client-id>");
                } else {
                    let settlement = rt.block_on(switcher.clear_policy_for_client(rest, false));
                    print_settlement(&settlement);
                }
            }
            "apply-all" => {
                if rest.is_empty() {
                    println!("Usage: apply-all <policy-id>");
                } else {
                    let settlement = rt.block_on(switcher.apply_policy_to_all(rest, false));
                    print_settlement(&settlement);
                }
            }
            "clear-all" => {
                let policy = (!rest.is_empty()).then_some(rest);
                let settlement = rt.block_on(switcher.clear_policy_from_all(policy, false));
                print_settlement(&settlement);
            }
            "register" => {
                let parts: Vec<&str> = rest.split_whitespace().collect();
                if parts.len() < 2 {
                    println!("Usage: register <name> <mac> [ip]");
                    continue;
                }
                let ip = parts.get(2).copied();
                match rt.block_on(switcher.register_client(parts[0], parts[1], ip, None)) {
                    Ok(client) => println!("Registered {} as {}", client.name, client.id),
                    Err(e) => println!("Registration failed: {}", e),
                }
            }
            "phrase" => match rest.split_once('=') {
                Some((phrase, target)) => {
                    let parts: Vec<&str> = target.split_whitespace().collect();
                    match parse_custom(phrase.trim(), &parts) {
                        Some(command) => {
                            let id = switcher.add_custom_command(command);
                            println!("Added custom command {}", id);
                        }
                        None => println!(
                            "Usage: phrase <words> = apply|clear|apply-all|clear-all [policy-id] [client-id]"
                        ),
                    }
                }
                None => println!(
                    "Usage: phrase <words> = apply|clear|apply-all|clear-all [policy-id] [client-id]"
                ),
            },
            "export" => match switcher.export_commands_as_json() {
                Ok(json) => println!("{}", json),
                Err(e) => println!("Export failed: {}", e),
            },
            "import" => match std::fs::read_to_string(rest) {
                Ok(json) => match switcher.import_commands_from_json(&json) {
                    Ok(count) => println!("Imported {} custom commands", count),
                    Err(e) => println!("Import failed: {}", e),
                },
                Err(e) => println!("Could not read {}: {}", rest, e),
            },
            "run" => {
                if rest.is_empty() {
                    println!("Usage: run <command-id>");
                } else {
                    match rt.block_on(switcher.run_custom_command(rest)) {
                        Settlement::Skipped => println!("No custom command {}", rest),
                        settlement => print_settlement(&settlement),
                    }
                }
            }
            "dismiss" => switcher.dismiss_assistant_banner(),
            _ => {
                let settlement = rt.block_on(switcher.handle_assistant_command(input));
                print_banner(&switcher.state());
                print_settlement(&settlement);
            }
        }

        print_events(&mut events);
    }

    println!("\nGoodbye!");
    Ok(())
}

fn parse_custom(phrase: &str, parts: &[&str]) -> Option<CustomCommand> {
    if phrase.is_empty() {
        return None;
    }
    let (action, args) = parts.split_first()?;
    let command = match *action {
        "apply" => CustomCommand::new(phrase, AssistantActionType::ApplyToDevice)
            .with_policy(*args.first()?)
            .with_device(*args.get(1)?),
        "clear" => CustomCommand::new(phrase, AssistantActionType::RemoveFromDevice)
            .with_device(*args.first()?),
        "apply-all" => CustomCommand::new(phrase, AssistantActionType::ApplyToAll)
            .with_policy(*args.first()?),
        "clear-all" => {
            let command = CustomCommand::new(phrase, AssistantActionType::RemoveFromAll);
            match args.first() {
                Some(policy) => command.with_policy(*policy),
                None => command,
            }
        }
        _ => return None,
    };
    Some(command)
}

fn print_help() {
    println!();
    println!("Commands:");
    println!("  login <domain> <user> <pass> [policy] - Connect to the router");
    println!("  refresh / r [force]                   - Reload policies and clients");
    println!("  policies / p                          - List policies");
    println!("  clients / c                           - List clients (respects focus and search)");
    println!("  focus [policy-id]                     - Focus a policy, or back to the grid");
    println!("  search <text>                         - Filter clients");
    println!("  apply <client-id> <policy-id>         - Assign a policy");
    println!("  clear <client-id>                     - Remove a client's policy");
    println!("  apply-all <policy-id>                 - Assign a policy to everyone");
    println!("  clear-all [policy-id]                 - Remove a policy from everyone");
    println!("  register <name> <mac> [ip]            - Register a device");
    println!("  phrase <words> = <action> [ids]       - Add a custom assistant phrase");
    println!("  export / import <file>                - Custom phrases as JSON");
    println!("  run <command-id>                      - Run a custom phrase's action directly");
    println!("  dismiss                               - Hide the assistant banner");
    println!("  quit / q                              - Exit");
    println!("  <any text>                            - Assistant command");
    println!();
}

fn print_status(state: &UiState) {
    let connection = match &state.connection_status {
        ConnectionStatus::NotSet => "not set".to_string(),
        ConnectionStatus::Validating => "validating".to_string(),
        ConnectionStatus::Ready(at) => format!("ready since {}", at.format("%H:%M:%S")),
        ConnectionStatus::Error(reason) => format!("error: {}", reason),
    };
    println!();
    println!(
        "--- {} | {} policies | {} clients ---",
        connection,
        state.policies.len(),
        state.clients.len()
    );
    if let Some(policy) = state.focused_policy() {
        println!("  Focused: {}", policy.name);
    }
    if !state.search_query.is_empty() {
        println!("  Search: {}", state.search_query);
    }
}

fn print_policies(state: &UiState) {
    for policy in &state.policies {
        let count = state
            .clients
            .iter()
            .filter(|c| c.policy_id.as_deref() == Some(policy.id.as_str()))
            .count();
        println!("  {:<10} {:<16} {} device(s)", policy.id, policy.name, count);
    }
}

fn print_clients(state: &UiState) {
    let (holding, others) = state.clients_for_focused_policy();
    if state.focused_policy_id.is_some() && !others.is_empty() {
        print_client_rows(state, &holding);
        println!("  -- other devices --");
        print_client_rows(state, &others);
    } else {
        print_client_rows(state, &holding);
    }
}

fn print_client_rows(state: &UiState, clients: &[&Client]) {
    for client in clients {
        let policy = client
            .policy_id
            .as_deref()
            .map(|id| state.policy_name(id))
            .unwrap_or("-");
        let busy = if state.is_busy(&client.id) {
            " (pending)"
        } else {
            ""
        };
        println!(
            "  {:<38} {:<16} {} {:<14}{}",
            client.id, client.name, client.mac, policy, busy
        );
    }
}

fn print_banner(state: &UiState) {
    if let Some(banner) = &state.assistant_banner {
        let marker = if banner.is_error { "!" } else { "*" };
        println!("[{}] {}", marker, banner.message);
    }
}

fn print_settlement(settlement: &Settlement) {
    match settlement {
        Settlement::Committed | Settlement::Skipped => {}
        Settlement::RolledBack { reason } => println!("Rolled back: {}", reason),
        Settlement::Rejected { reason } => println!("Rejected: {}", reason),
    }
}

fn print_events(events: &mut broadcast::Receiver<UiEvent>) {
    while let Ok(event) = events.try_recv() {
        if let UiEvent::Toast { message, is_error } = event {
            if is_error {
                println!("  ! {}", message);
            } else {
                println!("  {}", message);
            }
        }
    }
}
