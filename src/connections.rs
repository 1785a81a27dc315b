use crate::api::{ApiClient, ApiError};
use crate::validation::not_blank;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

const CONNECTIONS_PATH: &[&str] = &["api", "connections"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    Postgres,
    Mysql,
    Sqlserver,
    Snowflake,
    RestApi,
}

impl ConnectionKind {
    pub fn default_port(&self) -> Option<u16> {
        match self {
            ConnectionKind::Postgres => Some(5432),
            ConnectionKind::Mysql => Some(3306),
            ConnectionKind::Sqlserver => Some(1433),
            ConnectionKind::Snowflake => Some(443),
            ConnectionKind::RestApi => None,
        }
    }

    pub fn is_sql(&self) -> bool {
        !matches!(self, ConnectionKind::RestApi)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    #[default]
    Prefer,
    Require,
    Disable,
}

/// What the connection form submits.
#[derive(Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionForm {
    #[validate(custom(function = "not_blank", message = "Connection name is required"))]
    pub name: String,
    pub kind: ConnectionKind,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub ssl_mode: SslMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for ConnectionForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionForm")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("ssl_mode", &self.ssl_mode)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ConnectionForm {
    /// Blank form for `kind`, with its default port filled in.
    pub fn new(name: &str, kind: ConnectionKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            host: String::new(),
            port: kind.default_port().unwrap_or(0),
            database: String::new(),
            username: String::new(),
            password: String::new(),
            ssl_mode: SslMode::default(),
            base_url: None,
            api_key: None,
        }
    }

    /// Every problem with the form, in field order.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = crate::validation::messages(Validate::validate(self), &["name"]);
        if self.kind.is_sql() {
            let endpoint = SqlEndpoint {
                host: self.host.clone(),
                port: self.port,
                database: self.database.clone(),
                username: self.username.clone(),
            };
            errors.extend(crate::validation::messages(
                endpoint.validate(),
                &["host", "port", "database", "username"],
            ));
        } else {
            let endpoint = RestEndpoint {
                base_url: self
                    .base_url
                    .as_deref()
                    .map(str::trim)
                    .filter(|url| !url.is_empty())
                    .map(str::to_string),
            };
            errors.extend(crate::validation::messages(endpoint.validate(), &["base_url"]));
        }
        errors
    }
}

/// Fields a SQL database connection must fill in.
#[derive(Validate)]
struct SqlEndpoint {
    #[validate(custom(function = "not_blank", message = "Host is required"))]
    host: String,
    #[validate(range(min = 1, max = 65535, message = "Port must be between 1 and 65535"))]
    port: u16,
    #[validate(custom(function = "not_blank", message = "Database is required"))]
    database: String,
    #[validate(custom(function = "not_blank", message = "Username is required"))]
    username: String,
}

#[derive(Validate)]
struct RestEndpoint {
    #[validate(
        required(message = "Base URL is required"),
        url(message = "Base URL must be a valid absolute URL")
    )]
    base_url: Option<String>,
}

/// A connection as stored by the backend. Secrets are never returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub name: String,
    pub kind: ConnectionKind,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionTestResult {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize)]
struct ConnectionList {
    #[serde(default)]
    connections: Vec<Connection>,
}

#[derive(Deserialize)]
struct ConnectionCreated {
    connection: Connection,
}

pub async fn list_connections(api: &ApiClient) -> Result<Vec<Connection>, ApiError> {
    let resp: ConnectionList = api.get(CONNECTIONS_PATH).await?;
    Ok(resp.connections)
}

pub async fn create_connection(api: &ApiClient, form: &ConnectionForm) -> Result<Connection> {
    let errors = form.validate();
    if !errors.is_empty() {
        bail!(errors.join("; "));
    }
    let resp: ConnectionCreated = api.post(CONNECTIONS_PATH, form).await?;
    info!(id = %resp.connection.id, name = %resp.connection.name, "connection created");
    Ok(resp.connection)
}

pub async fn test_connection(api: &ApiClient, form: &ConnectionForm) -> Result<ConnectionTestResult> {
    let errors = form.validate();
    if !errors.is_empty() {
        bail!(errors.join("; "));
    }
    Ok(api
        .post(&["api", "connections", "test"], form)
        .await?)
}

pub async fn delete_connection(api: &ApiClient, id: &str) -> Result<(), ApiError> {
    api.delete(&["api", "connections", id])
        .await
}
