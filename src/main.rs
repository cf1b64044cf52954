use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio::signal;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use beverage_cms as app;

#[derive(Parser)]
#[command(name = "beverage-cms", about = "Beverage distribution CMS server", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Create an admin account unless the email is already registered
    CreateAdmin(CreateAdminArgs),
}

#[derive(Args)]
struct CreateAdminArgs {
    #[arg(long)]
    email: String,
    #[arg(long, default_value = "Administrator")]
    name: String,
    #[arg(long)]
    password: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = app::config::load_config().context("failed to load configuration")?;
    app::config::init_tracing(cfg.log_level(), cfg.log_json);

    let db_pool = app::db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to the database")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Migrate => {
            app::db::run_migrations(&db_pool)
                .await
                .context("failed running migrations")?;
            info!("Migrations applied");
            Ok(())
        }
        Command::CreateAdmin(args) => {
            app::db::run_migrations(&db_pool)
                .await
                .context("failed running migrations")?;
            let users = app::services::users::UserService::new(Arc::new(db_pool));
            let created = users
                .ensure_admin(&args.email, &args.name, &args.password)
                .await
                .context("failed to create admin user")?;
            if created {
                info!(email = %args.email, "Admin user created");
            } else {
                info!(email = %args.email, "A user with this email already exists; nothing changed");
            }
            Ok(())
        }
        Command::Serve => serve(cfg, db_pool).await,
    }
}

async fn serve(cfg: app::config::AppConfig, db_pool: app::db::DbPool) -> anyhow::Result<()> {
    if cfg.auto_migrate {
        app::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }

    let cors: CorsLayer = app::cors_layer(&cfg).map_err(|e| {
        error!("{}", e);
        anyhow::anyhow!(e.to_string())
    })?;

    let app_state = app::AppState::new(Arc::new(db_pool), cfg.clone());

    if let Some((email, password, name)) = cfg.bootstrap_admin() {
        match app_state.services.users.ensure_admin(email, name, password).await {
            Ok(true) => info!(email, "Bootstrap admin created"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Failed to create bootstrap admin"),
        }
    }

    let router = app::build_router(app_state).layer(cors);

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cfg.host, cfg.port))?;
    info!("beverage-cms listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
