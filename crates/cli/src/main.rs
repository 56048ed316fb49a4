use clap::{Parser, Subcommand};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "despacho")]
#[command(about = "Despacho CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the gateway (HTTP surface of the assistant pipeline). The
    /// assistant webhook URL comes from DESPACHO_WEBHOOK_URL, the config
    /// file, or the built-in default, in that order.
    Gateway {
        /// Config file path (default: DESPACHO_CONFIG_PATH or ~/.despacho/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from config or 3000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Send one message to a running gateway (manual testing).
    Send {
        /// Message text.
        message: String,

        /// Gateway base URL.
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        gateway: String,

        /// Tenant id the message runs under.
        #[arg(long)]
        tenant: String,

        /// Caller user id.
        #[arg(long, default_value = "cli")]
        user: String,

        /// Caller role.
        #[arg(long, default_value = "admin")]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("despacho {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Gateway { config, port }) => {
            if let Err(e) = run_gateway(config, port).await {
                log::error!("gateway failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Send { message, gateway, tenant, user, role }) => {
            if let Err(e) = run_send(message, gateway, tenant, user, role).await {
                log::error!("send failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_gateway(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, _path) = lib::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!(
        "starting gateway on {}:{}",
        config.gateway.bind,
        config.gateway.port
    );
    let directory: Arc<dyn lib::directory::Directory> =
        Arc::new(lib::directory::MemoryDirectory::new());
    lib::gateway::run_gateway(config, directory).await
}

async fn run_send(
    message: String,
    gateway: String,
    tenant: String,
    user: String,
    role: String,
) -> anyhow::Result<()> {
    let url = format!("{}/message", gateway.trim_end_matches('/'));
    let client = reqwest::Client::new();
    let res = client
        .post(&url)
        .header("x-user-id", &user)
        .header("x-user-role", &role)
        .header("x-tenant-id", &tenant)
        .json(&serde_json::json!({ "message": message }))
        .send()
        .await?;
    let status = res.status();
    let body: serde_json::Value = res.json().await?;
    println!("{}\n{}", status, serde_json::to_string_pretty(&body)?);
    Ok(())
}
