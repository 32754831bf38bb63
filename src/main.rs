//! `entity-api` binary: serve the REST API or reset the database.

use clap::{Parser, Subcommand};
use entity_api::model::entities;
use entity_api::{
    bootstrap, build_router, builtin_custom_routes, connect, Argon2Hasher, EntityRegistry,
    PasswordHasher, Settings,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "entity-api", version, about = "Descriptor-driven CRUD REST backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Drop and recreate every entity table. Destroys all data.
    EmptyDb,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("entity_api=info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    let registry = Arc::new(EntityRegistry::new(entities::descriptors())?);
    let store = connect(&settings).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::EmptyDb => {
            store.reset(registry.entities()).await?;
            tracing::info!("database emptied");
            println!("Database emptied.");
        }
        Command::Serve => {
            store.ensure_tables(registry.entities()).await?;
            let hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2Hasher);
            let custom = builtin_custom_routes(&registry);
            let state = bootstrap(store, registry, hasher, &custom, &settings.base_url)?;
            let app = build_router(state, settings.body_limit);
            let listener = TcpListener::bind(settings.bind_addr).await?;
            tracing::info!("listening on http://{}{}/", listener.local_addr()?, settings.base_url);
            axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
        }
    }
    Ok(())
}
