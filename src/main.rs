use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ebook_storefront::config::{AppConfig, CliConfig, FileConfig};
use ebook_storefront::notifications::{MailTransport, SmtpMailer};
use ebook_storefront::payment::{HttpPaymentGateway, PaymentGateway};
use ebook_storefront::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig};
use ebook_storefront::store::seed::{seed_books, SeedFile};
use ebook_storefront::store::{SqliteStorefrontStore, StorefrontStore};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Its values override the CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding the SQLite database.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Directory holding the book files. Defaults to `<db-dir>/files`.
    #[clap(long, value_parser = parse_path)]
    pub files_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Public origin used in emailed and returned download links.
    #[clap(long)]
    pub base_url: Option<String>,

    /// Path to the frontend directory to be statically served.
    #[clap(long = "frontend-dir")]
    pub frontend_dir_path: Option<String>,

    /// TOML file with `[[books]]` to insert at startup.
    #[clap(long, value_parser = parse_path)]
    pub seed_file: Option<PathBuf>,

    /// Secret used to verify admin session tokens.
    #[clap(long, env = "SESSION_SECRET")]
    pub session_secret: Option<String>,

    /// Base URL of the payment gateway.
    #[clap(long)]
    pub gateway_url: Option<String>,

    /// Well-known mail service ("gmail", "outlook", ...) or "custom".
    #[clap(long)]
    pub mail_service: Option<String>,

    #[clap(long)]
    pub mail_host: Option<String>,

    #[clap(long)]
    pub mail_port: Option<u16>,

    #[clap(long)]
    pub mail_username: Option<String>,

    #[clap(long, env = "MAIL_PASSWORD")]
    pub mail_password: Option<String>,

    /// Sender address. Defaults to the mail username.
    #[clap(long)]
    pub mail_from: Option<String>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            files_dir: self.files_dir.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
            logging_level: self.logging_level.clone(),
            base_url: self.base_url.clone(),
            frontend_dir_path: self.frontend_dir_path.clone(),
            seed_file: self.seed_file.clone(),
            session_secret: self.session_secret.clone(),
            gateway_url: self.gateway_url.clone(),
            mail_service: self.mail_service.clone(),
            mail_host: self.mail_host.clone(),
            mail_port: self.mail_port,
            mail_username: self.mail_username.clone(),
            mail_password: self.mail_password.clone(),
            mail_from: self.mail_from.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    if !config.files_dir.is_dir() {
        warn!(
            "Files directory {:?} does not exist, downloads will fail",
            config.files_dir
        );
    }

    info!("Opening SQLite database at {:?}...", config.store_db_path());
    let store: Arc<dyn StorefrontStore> =
        Arc::new(SqliteStorefrontStore::new(config.store_db_path())?);

    if let Some(seed_path) = &config.seed_file {
        let seed = SeedFile::load(seed_path)?;
        let inserted = seed_books(store.as_ref(), &seed)?;
        info!("Seeded {} new books from {:?}", inserted, seed_path);
    }

    info!("Initializing metrics...");
    metrics::init_metrics();

    let mail_transport: Option<Arc<dyn MailTransport>> = match &config.mail {
        Some(settings) => {
            info!(
                "Email delivery through {}:{} as {}",
                settings.host, settings.port, settings.from
            );
            Some(Arc::new(SmtpMailer::new(settings)?) as Arc<dyn MailTransport>)
        }
        None => {
            warn!("No mail transport configured, download links will not be emailed");
            None
        }
    };

    info!("Payment gateway at {}", config.payment_gateway.url);
    let gateway: Arc<dyn PaymentGateway> = Arc::new(HttpPaymentGateway::new(
        &config.payment_gateway.url,
        Duration::from_secs(config.payment_gateway.create_timeout_secs),
        Duration::from_secs(config.payment_gateway.update_timeout_secs),
    )?);

    let server_config = ServerConfig {
        requests_logging_level: config.logging_level.clone(),
        port: config.port,
        frontend_dir_path: config.frontend_dir_path.clone(),
        base_url: config.base_url.clone(),
        api_prefix: config.downloads.api_prefix.clone(),
        link_ttl_hours: config.downloads.link_ttl_hours,
        send_email_on_issue: config.downloads.send_email_on_issue,
        session_secret: config.session_secret.clone(),
    };
    if server_config.session_secret.is_none() {
        warn!("No session secret configured, admin routes are disabled");
    }

    run_server(
        server_config,
        config.metrics_port,
        store,
        config.files_dir.clone(),
        mail_transport,
        gateway,
    )
    .await
}
