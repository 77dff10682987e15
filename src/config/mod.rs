mod file_config;

pub use file_config::{DownloadsConfig, FileConfig, MailConfig, PaymentGatewayConfig};

use crate::notifications::well_known_service;
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8990";
const MAX_MAIL_TIMEOUT_SECS: u64 = 10;
const MAX_LINK_TTL_HOURS: i64 = 24 * 366;
const MAX_GATEWAY_TIMEOUT_SECS: u64 = 30;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub files_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub base_url: Option<String>,
    pub frontend_dir_path: Option<String>,
    pub seed_file: Option<PathBuf>,
    pub session_secret: Option<String>,
    pub gateway_url: Option<String>,
    pub mail_service: Option<String>,
    pub mail_host: Option<String>,
    pub mail_port: Option<u16>,
    pub mail_username: Option<String>,
    pub mail_password: Option<String>,
    pub mail_from: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub files_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub base_url: String,
    pub frontend_dir_path: Option<String>,
    pub seed_file: Option<PathBuf>,
    pub session_secret: Option<String>,

    // Feature configs (with defaults)
    pub downloads: DownloadSettings,
    pub payment_gateway: PaymentGatewaySettings,
    /// None when no mail transport is configured.
    pub mail: Option<MailSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    pub link_ttl_hours: i64,
    pub api_prefix: String,
    pub send_email_on_issue: bool,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            link_ttl_hours: 24,
            api_prefix: "/api".to_string(),
            send_email_on_issue: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentGatewaySettings {
    pub url: String,
    pub create_timeout_secs: u64,
    pub update_timeout_secs: u64,
}

impl Default for PaymentGatewaySettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_GATEWAY_URL.to_string(),
            create_timeout_secs: 5,
            update_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailSettings {
    pub host: String,
    pub port: u16,
    /// Implicit TLS from the first byte. Otherwise STARTTLS when offered.
    pub secure: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub timeout_secs: u64,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let files_dir = file
            .files_dir
            .map(PathBuf::from)
            .or_else(|| cli.files_dir.clone())
            .unwrap_or_else(|| db_dir.join("files"));

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);
        if metrics_port == port && port != 0 {
            bail!("Metrics port must differ from the server port ({})", port);
        }

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let base_url = file
            .base_url
            .or_else(|| cli.base_url.clone())
            .unwrap_or_else(|| format!("http://localhost:{}", port))
            .trim_end_matches('/')
            .to_string();

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());
        let seed_file = file
            .seed_file
            .map(PathBuf::from)
            .or_else(|| cli.seed_file.clone());
        let session_secret = file
            .session_secret
            .or_else(|| cli.session_secret.clone())
            .filter(|s| !s.is_empty());

        let downloads_file = file.downloads.unwrap_or_default();
        let download_defaults = DownloadSettings::default();
        let downloads = DownloadSettings {
            link_ttl_hours: downloads_file
                .link_ttl_hours
                .unwrap_or(download_defaults.link_ttl_hours),
            api_prefix: downloads_file
                .api_prefix
                .unwrap_or(download_defaults.api_prefix),
            send_email_on_issue: downloads_file
                .send_email_on_issue
                .unwrap_or(download_defaults.send_email_on_issue),
        };
        if !(1..=MAX_LINK_TTL_HOURS).contains(&downloads.link_ttl_hours) {
            bail!(
                "downloads.link_ttl_hours must be between 1 and {}",
                MAX_LINK_TTL_HOURS
            );
        }
        if !downloads.api_prefix.is_empty() && !downloads.api_prefix.starts_with('/') {
            bail!("downloads.api_prefix must start with '/'");
        }

        let gateway_file = file.payment_gateway.unwrap_or_default();
        let gateway_defaults = PaymentGatewaySettings::default();
        let payment_gateway = PaymentGatewaySettings {
            url: gateway_file
                .url
                .or_else(|| cli.gateway_url.clone())
                .unwrap_or(gateway_defaults.url),
            create_timeout_secs: gateway_file
                .create_timeout_secs
                .unwrap_or(gateway_defaults.create_timeout_secs),
            update_timeout_secs: gateway_file
                .update_timeout_secs
                .unwrap_or(gateway_defaults.update_timeout_secs),
        };
        for (name, secs) in [
            ("create_timeout_secs", payment_gateway.create_timeout_secs),
            ("update_timeout_secs", payment_gateway.update_timeout_secs),
        ] {
            if !(1..=MAX_GATEWAY_TIMEOUT_SECS).contains(&secs) {
                bail!(
                    "payment_gateway.{} must be between 1 and {}",
                    name,
                    MAX_GATEWAY_TIMEOUT_SECS
                );
            }
        }

        let mail = resolve_mail(cli, file.mail.unwrap_or_default())?;

        Ok(Self {
            db_dir,
            files_dir,
            port,
            metrics_port,
            logging_level,
            base_url,
            frontend_dir_path,
            seed_file,
            session_secret,
            downloads,
            payment_gateway,
            mail,
        })
    }

    pub fn store_db_path(&self) -> PathBuf {
        self.db_dir.join("storefront.db")
    }
}

fn resolve_mail(cli: &CliConfig, file: MailConfig) -> Result<Option<MailSettings>> {
    let service = file.service.or_else(|| cli.mail_service.clone());
    let host = file.host.or_else(|| cli.mail_host.clone());
    let port = file.port.or(cli.mail_port);
    let username = file.username.or_else(|| cli.mail_username.clone());
    let password = file.password.or_else(|| cli.mail_password.clone());
    let from = file.from.or_else(|| cli.mail_from.clone());

    let (host, default_port, default_secure) = match service.as_deref() {
        None if host.is_none() => return Ok(None),
        None | Some("custom") => {
            let host = match host {
                Some(host) => host,
                None => bail!("mail.host is required for a custom mail service"),
            };
            let port = port.unwrap_or(587);
            (host, port, port == 465)
        }
        Some(name) => match well_known_service(name) {
            Some((known_host, known_port, known_secure)) => (
                host.unwrap_or_else(|| known_host.to_string()),
                known_port,
                known_secure,
            ),
            None => bail!("Unknown mail service '{}'", name),
        },
    };

    let from = match from.or_else(|| username.clone()) {
        Some(from) => from,
        None => bail!("mail.from or mail.username must be set to send email"),
    };

    Ok(Some(MailSettings {
        host,
        port: port.unwrap_or(default_port),
        secure: file.secure.unwrap_or(default_secure),
        username,
        password,
        from,
        timeout_secs: file
            .timeout_secs
            .unwrap_or(MAX_MAIL_TIMEOUT_SECS)
            .clamp(1, MAX_MAIL_TIMEOUT_SECS),
    }))
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
