use std::io::ErrorKind;
use std::sync::Arc;

use actix_web::{web, HttpServer};
use envconfig::Envconfig;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod ids;
mod routes;
mod schemas;
mod server;
mod store;
mod upstash;

use crate::config::{Backend, Config};
use crate::ids::IdSource;
use crate::routes::AppState;
use crate::store::{GroupStore, MemoryStore};
use crate::upstash::UpstashStore;

fn build_store(config: &Config) -> anyhow::Result<Arc<dyn GroupStore>> {
    let store: Arc<dyn GroupStore> = match config.backend {
        Backend::Memory => Arc::new(MemoryStore::new()),
        Backend::Upstash => {
            let (url, token) = config.upstash_credentials()?;
            Arc::new(UpstashStore::new(
                &url,
                token,
                config.groups_key().to_string(),
            )?)
        }
    };
    Ok(store)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::init_from_env()?;
    let store = build_store(&config)?;
    let base = config.api_base();
    let state = web::Data::new(AppState::new(store, IdSource::default()));

    let server = {
        let base = base.clone();
        HttpServer::new(move || server::build_app(state.clone(), &base))
    };
    let server = match server.bind((config.host.as_str(), config.port)) {
        Ok(server) => server,
        Err(err) if err.kind() == ErrorKind::AddrInUse => {
            tracing::error!(
                port = config.port,
                "port {} is already in use; start with another one, e.g. PORT={}",
                config.port,
                config.port.wrapping_add(1)
            );
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!(
        port = config.port,
        backend = %config.backend,
        base = %base,
        "listening on http://localhost:{}{}/groups",
        config.port,
        base
    );

    server.run().await?;
    Ok(())
}
