//! Synchronous input checks run before any store call

use crate::model::{CredentialField, Credentials, Policy};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn domain_regex() -> &'static Regex {
    static DOMAIN: OnceLock<Regex> = OnceLock::new();
    DOMAIN.get_or_init(|| {
        Regex::new(r"^(https?://)?([A-Za-z0-9-]+\.)*[A-Za-z0-9-]+(\.[A-Za-z]{2,})?(:\d+)?$")
            .expect("domain pattern must compile")
    })
}

fn mac_regex() -> &'static Regex {
    static MAC: OnceLock<Regex> = OnceLock::new();
    MAC.get_or_init(|| {
        Regex::new(r"^[0-9A-Fa-f]{2}(:[0-9A-Fa-f]{2}){5}$").expect("MAC pattern must compile")
    })
}

/// Per-field error messages; empty when the credentials can be submitted
///
/// A default policy is only demanded once the router's policies are known.
pub fn validate_credentials(
    credentials: &Credentials,
    policies: &[Policy],
) -> BTreeMap<CredentialField, String> {
    let mut errors = BTreeMap::new();

    if !domain_regex().is_match(&credentials.domain_or_ip) {
        errors.insert(CredentialField::Domain, "Некорректный домен/адрес".to_string());
    }
    if credentials.username.trim().is_empty() {
        errors.insert(CredentialField::Username, "Введите логин".to_string());
    }
    if credentials.password.trim().is_empty() {
        errors.insert(CredentialField::Password, "Введите пароль".to_string());
    }
    if credentials.default_policy_id.trim().is_empty() && !policies.is_empty() {
        errors.insert(CredentialField::DefaultPolicy, "Выберите политику".to_string());
    }

    errors
}

/// Six colon-separated hex byte groups
pub fn is_valid_mac(mac: &str) -> bool {
    mac_regex().is_match(mac)
}
