use std::collections::HashMap;
use std::env;

use thiserror::Error;

use crate::tenant::{TENANT_IDS, TransportKind};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: String, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub dev_mode: bool,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub resend_api_key: Option<String>,
    pub mail_from: String,
    pub db_host_override: Option<String>,
    db_password: Option<String>,
    db_passwords: HashMap<String, String>,
    pub ssh_user: Option<String>,
    pub ssh_password: Option<String>,
    pub ssh_port: u16,
    pub proxy_url: Option<String>,
    default_transport: TransportKind,
    tenant_transports: HashMap<String, TransportKind>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Builds the configuration from a variable lookup, collecting every
    /// missing required name into a single error.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut missing: Vec<String> = Vec::new();
        let mut require = |name: &str| -> String {
            match var(name) {
                Some(value) if !value.is_empty() => value,
                _ => {
                    missing.push(name.to_string());
                    String::new()
                }
            }
        };

        let stripe_secret_key = require("STRIPE_SECRET_KEY");
        let stripe_webhook_secret = require("STRIPE_WEBHOOK_SECRET");

        let dev_mode = var("EXAMGATE_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = var("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port: u16 = var("PORT").and_then(|p| p.parse().ok()).unwrap_or(3000);

        let default_transport = parse_transport("TRANSPORT", var("TRANSPORT"))?;
        let mut tenant_transports = HashMap::new();
        let mut db_passwords = HashMap::new();
        for id in TENANT_IDS {
            let suffix = id.to_uppercase();
            let name = format!("TRANSPORT_{suffix}");
            if let Some(raw) = var(&name) {
                let kind = raw.parse().map_err(|_| ConfigError::Invalid {
                    name,
                    value: raw.clone(),
                })?;
                tenant_transports.insert(id.to_string(), kind);
            }
            if let Some(password) = var(&format!("DB_PASSWORD_{suffix}")) {
                db_passwords.insert(id.to_string(), password);
            }
        }

        let db_password = var("DB_PASSWORD");
        let ssh_user = var("SSH_USER");
        let ssh_password = var("SSH_PASSWORD");
        let proxy_url = var("PROXY_URL");

        // Each tenant's effective transport decides which credentials are
        // mandatory at startup.
        for id in TENANT_IDS {
            let effective = tenant_transports
                .get(id)
                .copied()
                .unwrap_or(default_transport);
            if effective.uses_sql()
                && db_password.is_none()
                && !db_passwords.contains_key(id)
                && !missing.iter().any(|m| m == "DB_PASSWORD")
            {
                missing.push("DB_PASSWORD".to_string());
            }
            if effective.uses_tunnel() {
                if ssh_user.is_none() && !missing.iter().any(|m| m == "SSH_USER") {
                    missing.push("SSH_USER".to_string());
                }
                if ssh_password.is_none() && !missing.iter().any(|m| m == "SSH_PASSWORD") {
                    missing.push("SSH_PASSWORD".to_string());
                }
            }
            if effective == TransportKind::Proxy
                && proxy_url.is_none()
                && !missing.iter().any(|m| m == "PROXY_URL")
            {
                missing.push("PROXY_URL".to_string());
            }
        }

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        Ok(Self {
            host,
            port,
            dev_mode,
            stripe_secret_key,
            stripe_webhook_secret,
            resend_api_key: var("RESEND_API_KEY"),
            mail_from: var("MAIL_FROM")
                .unwrap_or_else(|| "Exam Access <onboarding@resend.dev>".to_string()),
            db_host_override: var("DB_HOST"),
            db_password,
            db_passwords,
            ssh_user,
            ssh_password,
            ssh_port: var("SSH_PORT").and_then(|p| p.parse().ok()).unwrap_or(22),
            proxy_url,
            default_transport,
            tenant_transports,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Per-tenant password override, falling back to the shared one.
    pub fn db_password_for(&self, tenant_id: &str) -> Option<&str> {
        self.db_passwords
            .get(tenant_id)
            .or(self.db_password.as_ref())
            .map(String::as_str)
    }

    pub fn transport_for(&self, tenant_id: &str) -> TransportKind {
        self.tenant_transports
            .get(tenant_id)
            .copied()
            .unwrap_or(self.default_transport)
    }
}

fn parse_transport(name: &str, value: Option<String>) -> Result<TransportKind, ConfigError> {
    match value {
        None => Ok(TransportKind::Auto),
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            name: name.to_string(),
            value: raw,
        }),
    }
}
