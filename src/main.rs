use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use keyshop::config::Config;
use keyshop::db::{self, AppState, DbPool, queries};
use keyshop::models::Role;

#[derive(Parser)]
#[command(name = "keyshop", version, about = "License key storefront")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Mint an API key and print it once
    CreateKey {
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "customer")]
        role: Role,
    },
    /// Revoke an API key by id
    RevokeKey {
        #[arg(long)]
        id: i64,
    },
}

fn bootstrap_admin(pool: &DbPool, email: &str) -> anyhow::Result<()> {
    let conn = pool.get()?;
    if queries::count_api_keys_with_role(&conn, Role::Admin)? > 0 {
        return Ok(());
    }

    let (key, plaintext) = queries::create_api_key(&conn, email, Role::Admin)?;
    tracing::info!("Bootstrapped admin API key {} for {}", key.id, key.email);
    println!("Admin API key (shown once): {}", plaintext);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keyshop=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let pool = db::create_pool(&config.database_path, config.db_pool_size)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::CreateKey { email, role } => {
            if role == Role::None {
                anyhow::bail!("role must be customer or admin");
            }
            let conn = pool.get()?;
            let (_, plaintext) = queries::create_api_key(&conn, &email, role)?;
            println!("{}", plaintext);
        }
        Command::RevokeKey { id } => {
            let conn = pool.get()?;
            if !queries::revoke_api_key(&conn, id)? {
                anyhow::bail!("no active API key with id {}", id);
            }
            tracing::info!("Revoked API key {}", id);
        }
        Command::Serve => {
            if let Some(email) = &config.bootstrap_admin_email {
                bootstrap_admin(&pool, email)?;
            }

            let app = keyshop::app(AppState::new(pool, &config));
            let listener = tokio::net::TcpListener::bind(config.addr()).await?;
            tracing::info!("Listening on {}", config.addr());
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
