use crate::models::Tier;
use serde::Deserialize;
use serde_json::Value;

pub(crate) const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub(crate) const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com";
pub(crate) const DEFAULT_LOG_LEVEL: &str = "info";

/// One configured sign-in account.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountEntry {
    pub username: String,
    pub password: String,
    #[serde(default = "default_tier")]
    pub tier: Tier,
    #[serde(default, alias = "displayName")]
    pub display_name: Option<String>,
}

fn default_tier() -> Tier {
    Tier::Trial
}

/// Runtime configuration injected by the hosting page as `window.ENV`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_api_url: String,
    pub waitlist_webhook_url: Option<String>,
    pub subscription_webhook_url: Option<String>,
    /// UPI virtual payment address shown on the subscription form.
    pub upi_payee: Option<String>,
    pub log_level: String,
    pub accounts: Vec<AccountEntry>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
            gemini_api_url: DEFAULT_API_URL.to_string(),
            waitlist_webhook_url: None,
            subscription_webhook_url: None,
            upi_payee: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            accounts: Vec::new(),
        }
    }
}

/// Looks up `KEY` first, then `key`. Blank strings count as missing.
fn lookup<'a>(env: &'a Value, upper: &str) -> Option<&'a Value> {
    let lower = upper.to_ascii_lowercase();
    let found = [upper, lower.as_str()]
        .into_iter()
        .filter_map(|k| env.get(k))
        .find(|v| !v.is_null() && v.as_str().map(|s| !s.trim().is_empty()).unwrap_or(true));
    found
}

fn lookup_string(env: &Value, upper: &str) -> Option<String> {
    lookup(env, upper)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
}

impl EnvConfig {
    pub fn from_value(env: &Value) -> Self {
        let defaults = Self::default();

        let accounts = match lookup(env, "ACCOUNTS") {
            Some(raw) => match serde_json::from_value::<Vec<AccountEntry>>(raw.clone()) {
                Ok(list) => list,
                Err(e) => {
                    log::warn!("event=config_accounts module=config status=error reason={e}");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        Self {
            gemini_api_key: lookup_string(env, "GEMINI_API_KEY"),
            gemini_model: lookup_string(env, "GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_api_url: lookup_string(env, "GEMINI_API_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.gemini_api_url),
            waitlist_webhook_url: lookup_string(env, "WAITLIST_WEBHOOK_URL"),
            subscription_webhook_url: lookup_string(env, "SUBSCRIPTION_WEBHOOK_URL"),
            upi_payee: lookup_string(env, "UPI_PAYEE"),
            log_level: lookup_string(env, "LOG_LEVEL").unwrap_or(defaults.log_level),
            accounts,
        }
    }

    /// Reads `window.ENV`; anything missing or unreadable falls back to defaults.
    pub fn from_window() -> Self {
        let Some(window) = web_sys::window() else {
            return Self::default();
        };
        let Some(env) = window.get("ENV") else {
            return Self::default();
        };
        if env.is_undefined() || !env.is_object() {
            return Self::default();
        }

        let json = js_sys::JSON::stringify(&env)
            .ok()
            .and_then(|s| s.as_string())
            .and_then(|s| serde_json::from_str::<Value>(&s).ok());

        match json {
            Some(value) => Self::from_value(&value),
            None => Self::default(),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.gemini_api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_env_config_defaults_when_empty() {
        let cfg = EnvConfig::from_value(&json!({}));
        assert_eq!(cfg, EnvConfig::default());
        assert_eq!(cfg.gemini_model, "gemini-2.5-flash");
        assert_eq!(cfg.gemini_api_url, "https://generativelanguage.googleapis.com");
        assert_eq!(cfg.log_level, "info");
        assert!(!cfg.has_api_key());
    }

    #[test]
    fn test_env_config_prefers_upper_case_keys() {
        let cfg = EnvConfig::from_value(&json!({
            "GEMINI_API_KEY": "upper",
            "gemini_api_key": "lower",
            "gemini_model": "gemini-2.0-pro",
        }));
        assert_eq!(cfg.gemini_api_key.as_deref(), Some("upper"));
        assert_eq!(cfg.gemini_model, "gemini-2.0-pro");
    }

    #[test]
    fn test_env_config_blank_values_fall_back() {
        let cfg = EnvConfig::from_value(&json!({
            "GEMINI_API_KEY": "  ",
            "GEMINI_API_URL": "http://localhost:8080/",
            "LOG_LEVEL": "",
        }));
        assert_eq!(cfg.gemini_api_key, None);
        assert_eq!(cfg.gemini_api_url, "http://localhost:8080");
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn test_env_config_blank_upper_key_uses_lower() {
        let cfg = EnvConfig::from_value(&json!({
            "GEMINI_API_KEY": " ",
            "gemini_api_key": "lower",
            "UPI_PAYEE": null,
            "upi_payee": "focus@bank",
        }));
        assert_eq!(cfg.gemini_api_key.as_deref(), Some("lower"));
        assert_eq!(cfg.upi_payee.as_deref(), Some("focus@bank"));
    }

    #[test]
    fn test_env_config_parses_accounts() {
        let cfg = EnvConfig::from_value(&json!({
            "ACCOUNTS": [
                {"username": "asha", "password": "pw", "tier": "pro", "displayName": "Asha"},
                {"username": "ravi", "password": "pw2"}
            ]
        }));
        assert_eq!(cfg.accounts.len(), 2);
        assert_eq!(cfg.accounts[0].tier, Tier::Pro);
        assert_eq!(cfg.accounts[0].display_name.as_deref(), Some("Asha"));
        assert_eq!(cfg.accounts[1].tier, Tier::Trial);
    }

    #[test]
    fn test_env_config_bad_accounts_are_ignored() {
        let cfg = EnvConfig::from_value(&json!({ "ACCOUNTS": "not-a-list" }));
        assert!(cfg.accounts.is_empty());
    }
}
