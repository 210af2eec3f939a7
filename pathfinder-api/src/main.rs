use pathfinder_db::{
    client::{DbError, MongoStore, Store},
    memory::MemoryStore,
};
use serde::Deserialize;
use server::ServerState;
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
};
use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod server;
mod service;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("MONGODB_USER and MONGODB_PASS must be set for the mongodb store backend")]
    MissingMongoCredentials,
    #[error("Error connecting to the database: {0}")]
    Database(#[from] DbError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StoreBackend {
    #[default]
    Mongodb,
    Memory,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct Env {
    #[serde(default = "default_server_address")]
    server_address: IpAddr,
    #[serde(default = "default_server_port", alias = "port")]
    server_port: u16,
    #[serde(default)]
    store_backend: StoreBackend,
    mongodb_user: Option<String>,
    mongodb_pass: Option<String>,
    #[serde(default = "default_mongodb_host")]
    mongodb_host: String,
    #[serde(default = "default_mongodb_database")]
    mongodb_database: String,
}

fn default_server_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_server_port() -> u16 {
    5000
}

fn default_mongodb_host() -> String {
    "cluster0.ipdatst.mongodb.net".to_owned()
}

fn default_mongodb_database() -> String {
    "path-finders".to_owned()
}

impl Env {
    fn mongodb_uri(&self) -> Result<String, InitError> {
        let (Some(user), Some(pass)) = (&self.mongodb_user, &self.mongodb_pass) else {
            return Err(InitError::MissingMongoCredentials);
        };

        Ok(format!(
            "mongodb+srv://{user}:{pass}@{}/?retryWrites=true&w=majority",
            self.mongodb_host
        ))
    }
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pathfinder_api=debug,\
                pathfinder_db=debug,\
                pathfinder_common=debug,\
                tower_http=debug,axum::rejection=trace,mongodb=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

async fn connect_store(env: &Env) -> Result<Arc<dyn Store>, InitError> {
    match env.store_backend {
        StoreBackend::Mongodb => {
            let uri = env.mongodb_uri()?;
            let store = MongoStore::connect(&uri, &env.mongodb_database).await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store, nothing will be persisted");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Could not listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let store = connect_store(&env).await?;
    let state = ServerState {
        store: Arc::clone(&store),
    };

    let tracing_layer = TraceLayer::new_for_http();
    let app = server::routes()
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(tracing_layer);

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(InitError::TcpServe);

    store.close().await;

    served
}
