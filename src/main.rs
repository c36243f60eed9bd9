mod api;
mod blockchain;
mod config;
mod error;
mod network;
mod store;
mod transaction;

use std::io;

use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use log::info;
use uuid::Uuid;

use api::AppState;
use blockchain::Ledger;
use config::Config;
use network::HttpChainSource;
use store::{BlockStore, MemoryStore, SqliteStore};

#[actix_web::main]
async fn main() -> io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let config = Config::from_env();
    let node_id = Uuid::new_v4().simple().to_string();

    let store: Box<dyn BlockStore> = if config.uses_memory_store() {
        info!("STORE - using in-memory store, chain will not survive restarts");
        Box::new(MemoryStore::new())
    } else {
        info!("STORE - opening {}", config.database_path);
        Box::new(SqliteStore::open(&config.database_path).map_err(io::Error::other)?)
    };
    let ledger = Ledger::open(store).map_err(io::Error::other)?;
    let peers = HttpChainSource::new(config.peer_timeout).map_err(io::Error::other)?;

    info!(
        "⛓️ Starting node {node_id} at http://{}:{}",
        config.host, config.port
    );

    let state = web::Data::new(AppState::new(
        node_id,
        ledger,
        peers,
        config.mining_timeout,
    ));

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
