//! docledger - document issue/return tracking service

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docledger::{
    clock::SystemClock,
    config::Args,
    db::MongoClient,
    documents::{
        DocumentRecord, DocumentService, Messages, MongoDocumentStore, DOCUMENT_COLLECTION,
    },
    server::{self, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("docledger={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  docledger - document tracking API");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Database: {}", args.mongodb_db);
    info!("======================================");

    // Connect to MongoDB; the handle is opened once here and shared for the
    // life of the process
    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => client,
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    // Applying indexes requires the typed handle; operations go through the
    // raw collection so listings can tolerate malformed records
    if let Err(e) = mongo.collection::<DocumentRecord>(DOCUMENT_COLLECTION).await {
        error!("Failed to prepare documents collection: {}", e);
        std::process::exit(1);
    }

    let store = Arc::new(MongoDocumentStore::new(
        mongo.raw_collection(DOCUMENT_COLLECTION),
    ));
    let service = Arc::new(DocumentService::new(
        store,
        Arc::new(SystemClock),
        Messages::default(),
    ));

    let state = Arc::new(AppState::new(args, service));

    // Run the server
    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
