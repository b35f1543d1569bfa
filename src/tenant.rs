use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::Config;

/// Every tenant served by this deployment, in display order.
pub const TENANT_IDS: [&str; 3] = ["aprobado", "ciudadania", "lifeinuk"];

const DEFAULT_DB_HOST: &str = "cyberix.me.uk";
const DEFAULT_DB_PORT: u16 = 3306;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Direct SQL first, SSH tunnel on connection failure.
    Auto,
    Direct,
    Tunnel,
    Proxy,
}

impl TransportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::Auto => "auto",
            TransportKind::Direct => "direct",
            TransportKind::Tunnel => "tunnel",
            TransportKind::Proxy => "proxy",
        }
    }

    /// True when the transport speaks MySQL itself and needs DB credentials.
    pub fn uses_sql(self) -> bool {
        !matches!(self, TransportKind::Proxy)
    }

    pub fn uses_tunnel(self) -> bool {
        matches!(self, TransportKind::Auto | TransportKind::Tunnel)
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(TransportKind::Auto),
            "direct" => Ok(TransportKind::Direct),
            "tunnel" | "tunneled" => Ok(TransportKind::Tunnel),
            "proxy" => Ok(TransportKind::Proxy),
            other => Err(format!("unknown transport: {other}")),
        }
    }
}

#[derive(Clone)]
pub struct SshProfile {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for SshProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SshProfile")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Clone)]
pub struct ConnectionProfile {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub ssh: Option<SshProfile>,
    pub proxy_url: Option<String>,
}

impl fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .field("ssh", &self.ssh)
            .field("proxy_url", &self.proxy_url)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub domain: String,
    pub currency: String,
    pub price_cents: i64,
    pub locale: String,
    pub exam_questions: u32,
    /// Minimum score percentage counted as a pass.
    pub pass_score: u32,
    pub stripe_price_id: String,
    pub success_url: String,
    pub cancel_url: String,
    pub transport: TransportKind,
    pub connection: ConnectionProfile,
}

impl Tenant {
    pub fn price_display(&self) -> String {
        format!(
            "{:.2} {}",
            self.price_cents as f64 / 100.0,
            self.currency
        )
    }
}

struct TenantSeed {
    id: &'static str,
    name: &'static str,
    domain: &'static str,
    currency: &'static str,
    price_cents: i64,
    locale: &'static str,
    exam_questions: u32,
    pass_score: u32,
    stripe_price_id: &'static str,
    database: &'static str,
    db_user: &'static str,
}

const SEEDS: [TenantSeed; 3] = [
    TenantSeed {
        id: "aprobado",
        name: "Aprobado Express",
        domain: "aprobado.express",
        currency: "EUR",
        price_cents: 2499,
        locale: "es",
        exam_questions: 30,
        pass_score: 90,
        stripe_price_id: "price_1QQaLhP1jZOZUKXSzxHVQOkQ",
        database: "cyberixm_aprobadoexpress",
        db_user: "cyberixm_aprobadox",
    },
    TenantSeed {
        id: "ciudadania",
        name: "Ciudadanía Express",
        domain: "ciudadania.express",
        currency: "EUR",
        price_cents: 2999,
        locale: "es",
        exam_questions: 25,
        pass_score: 60,
        stripe_price_id: "price_1QQaLiP1jZOZUKXS3DvQpMcY",
        database: "cyberixm_ciudadaniaexpress",
        db_user: "cyberixm_ciudadaniax",
    },
    TenantSeed {
        id: "lifeinuk",
        name: "Life in UK Express",
        domain: "lifeinuk.express",
        currency: "GBP",
        price_cents: 2499,
        locale: "en",
        exam_questions: 24,
        pass_score: 75,
        stripe_price_id: "price_1QQaLjP1jZOZUKXSyBcNvXlM",
        database: "cyberixm_lifeinuk",
        db_user: "cyberixm_lifeinukx",
    },
];

/// Immutable set of tenants, assembled once at startup.
#[derive(Debug, Clone)]
pub struct TenantRegistry {
    tenants: Vec<Arc<Tenant>>,
}

impl TenantRegistry {
    pub fn from_config(config: &Config) -> Self {
        let tenants = SEEDS
            .iter()
            .map(|seed| {
                let host = config
                    .db_host_override
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DB_HOST.to_string());
                let ssh = match (&config.ssh_user, &config.ssh_password) {
                    (Some(user), Some(password)) => Some(SshProfile {
                        host: host.clone(),
                        port: config.ssh_port,
                        user: user.clone(),
                        password: password.clone(),
                    }),
                    _ => None,
                };
                Arc::new(Tenant {
                    id: seed.id.to_string(),
                    name: seed.name.to_string(),
                    domain: seed.domain.to_string(),
                    currency: seed.currency.to_string(),
                    price_cents: seed.price_cents,
                    locale: seed.locale.to_string(),
                    exam_questions: seed.exam_questions,
                    pass_score: seed.pass_score,
                    stripe_price_id: seed.stripe_price_id.to_string(),
                    success_url: format!("https://{}/dashboard", seed.domain),
                    cancel_url: format!("https://{}", seed.domain),
                    transport: config.transport_for(seed.id),
                    connection: ConnectionProfile {
                        host,
                        port: DEFAULT_DB_PORT,
                        database: seed.database.to_string(),
                        user: seed.db_user.to_string(),
                        password: config
                            .db_password_for(seed.id)
                            .unwrap_or_default()
                            .to_string(),
                        ssh,
                        proxy_url: config.proxy_url.clone(),
                    },
                })
            })
            .collect();
        Self { tenants }
    }

    pub fn get(&self, id: &str) -> Option<Arc<Tenant>> {
        self.tenants.iter().find(|t| t.id == id).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Tenant>> {
        self.tenants.iter()
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}
