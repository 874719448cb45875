use clap::Parser;
use leadline_core::LeadlineConfig;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use leadline_server::server;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "leadline.toml")]
    config: String,

    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience — production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Init logging
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    // Load config
    let config = match LeadlineConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Connect to DB
    let pool = match leadline_core::db::create_pool(&config.database).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    if args.health {
        match leadline_core::db::health_check(&pool).await {
            Ok(v) => println!("✅ PostgreSQL connected: {}", v),
            Err(e) => {
                println!("❌ PostgreSQL connection failed: {}", e);
                std::process::exit(1);
            }
        }

        match leadline_core::db::check_schema(&pool).await {
            Ok(3) => println!("✅ Lead tables present"),
            Ok(n) => {
                println!("❌ Expected 3 lead tables, found {} — run migrations", n);
                std::process::exit(1);
            }
            Err(e) => {
                println!("❌ Schema check failed: {}", e);
                std::process::exit(1);
            }
        }

        println!("✅ Leadline DB health check passed");
        return Ok(());
    }

    // Shutdown broadcast: Ctrl+C fans out to both transports
    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    // Spawn HTTP API server (widget-facing) if enabled
    if config.http.enabled {
        let http_pool = pool.clone();
        let http_config = config.clone();
        let http_shutdown = tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) =
                leadline_server::http::start_http_server(http_pool, http_config, http_shutdown)
                    .await
            {
                tracing::error!("HTTP server error: {}", e);
            }
        });
    }

    let socket_path = config.service.socket_path.clone();
    server::run_unix_server(&socket_path, pool, config, tx.subscribe()).await?;

    Ok(())
}
