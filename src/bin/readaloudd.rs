//! readaloudd — readaloud daemon.
//!
//! Serves pronunciation scoring, vocabulary extraction and page
//! description over HTTP.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use readaloud::server::config::{Config, Secrets, StorageBackend};
use readaloud::server::{AppState, serve};
use readaloud::store::{BlobStore, MemoryBlobStore, MemoryRowStore, RowStore};
use readaloud::{OpenAiGateway, Orchestrator, ReadaloudError, version};

/// readaloud daemon: AI reading tutor backend.
#[derive(Parser)]
#[command(name = "readaloudd")]
#[command(version = version::PKG_VERSION)]
#[command(about = "Reading tutor backend with AI and heuristic fallbacks")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind to (overrides `server.address`).
    #[arg(long, env = "READALOUD_ADDRESS")]
    address: Option<String>,

    /// JSON file of rows to preload into the memory store, keyed by table
    /// (`books`, `book_pages`, `vocabulary`).
    #[arg(long)]
    seed: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;
    let secrets = Secrets::load()?;

    let ai_config = config.ai_config(&secrets);
    let availability = ai_config.availability();
    if let readaloud::AiAvailability::Unavailable(reason) = availability {
        warn!(reason = reason.as_str(), "AI disabled; every operation uses heuristics");
    }
    let gateway = Arc::new(OpenAiGateway::new(&ai_config));
    let orchestrator = Orchestrator::new(gateway, &ai_config);

    let (store, blobs) = build_storage(&config, &secrets, args.seed.as_deref())?;
    let tokens = config.token_table();
    if tokens.is_empty() {
        warn!("no [[auth.tokens]] configured; every authenticated route will answer 401");
    }

    let state = AppState::new(orchestrator, store, blobs, tokens)
        .item_delay(config.batch.item_delay());

    let address = args.address.unwrap_or_else(|| config.server.address.clone());
    info!(
        version = version::version_string(),
        %address,
        ai = availability.is_available(),
        text_model = %ai_config.text_model,
        vision_model = %ai_config.vision_model,
        "readaloudd starting"
    );

    serve(&address, state).await?;
    Ok(())
}

type Storage = (Arc<dyn RowStore>, Arc<dyn BlobStore>);

fn build_storage(
    config: &Config,
    secrets: &Secrets,
    seed: Option<&Path>,
) -> Result<Storage, ReadaloudError> {
    match config.storage.backend {
        StorageBackend::Memory => {
            let mut store = MemoryRowStore::new();
            if let Some(path) = seed {
                store = seed_store(store, path)?;
            }
            Ok((Arc::new(store), Arc::new(MemoryBlobStore::default())))
        }
        #[cfg(feature = "supabase")]
        StorageBackend::Supabase => {
            use readaloud::store::{SupabaseBlobStore, SupabaseRowStore};

            if seed.is_some() {
                warn!("--seed only applies to the memory backend; ignored");
            }
            let supabase = config.supabase_config(secrets)?;
            info!(url = %supabase.url, bucket = %supabase.bucket, "using supabase storage");
            Ok((
                Arc::new(SupabaseRowStore::new(&supabase)),
                Arc::new(SupabaseBlobStore::new(&supabase)),
            ))
        }
        #[cfg(not(feature = "supabase"))]
        StorageBackend::Supabase => {
            let _ = secrets;
            Err(ReadaloudError::Configuration(
                "storage.backend is \"supabase\" but the `supabase` feature is disabled".into(),
            ))
        }
    }
}

fn seed_store(mut store: MemoryRowStore, path: &Path) -> Result<MemoryRowStore, ReadaloudError> {
    let content = std::fs::read_to_string(path)?;
    let tables: serde_json::Map<String, Value> = serde_json::from_str(&content)?;
    for (table, rows) in tables {
        let Value::Array(rows) = rows else {
            return Err(ReadaloudError::Configuration(format!(
                "seed table `{table}` must be an array of rows"
            )));
        };
        info!(%table, rows = rows.len(), "seeding memory store");
        store = store.with_table(&table, rows);
    }
    Ok(store)
}
