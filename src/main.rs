use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use ragvs_core::RagService;
use ragvs_core::config::{Config, ProviderKind};
use ragvs_gateway::GatewayServer;
use ragvs_llm::LlmProvider;
use ragvs_llm::any::AnyProvider;
use ragvs_llm::ollama::OllamaProvider;
use ragvs_llm::openai::OpenAiProvider;
use ragvs_memory::{SqliteStore, StoreHandle};
use tokio::sync::watch;

/// Retrieval-augmented question answering over a vector store.
#[derive(Debug, Parser)]
#[command(name = "ragvs", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_subscriber();

    let config_path = resolve_config_path(cli.config, std::env::var("RAGVS_CONFIG").ok());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let provider = create_provider(&config)?;
    tracing::info!(
        provider = provider.name(),
        model = %config.llm.model,
        "llm provider ready"
    );

    let store = StoreHandle::qdrant(config.store.qdrant_url.clone(), &config.store.collection);
    if store.is_configured() {
        tracing::info!(collection = %config.store.collection, "vector store configured");
    } else {
        tracing::warn!(
            "no vector store url configured (set RAGVS_QDRANT_URL); knowledge endpoints will return 503"
        );
    }

    let chat_logs = SqliteStore::new(&config.store.sqlite_path)
        .await
        .with_context(|| format!("failed to open sqlite at {}", config.store.sqlite_path))?;

    let service = Arc::new(RagService::new(provider, store, chat_logs, &config.rag));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e:#}");
            return;
        }
        tracing::info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    let gateway = &config.gateway;
    GatewayServer::new(&gateway.bind, gateway.port, service, shutdown_rx)
        .with_auth(gateway.auth_token.clone())
        .with_rate_limit(gateway.rate_limit)
        .with_max_body_size(gateway.max_body_size)
        .with_cors(gateway.cors_allow_any)
        .serve()
        .await
        .context("gateway server failed")?;

    tracing::info!("shutdown complete");
    Ok(())
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn resolve_config_path(arg: Option<PathBuf>, env: Option<String>) -> PathBuf {
    if let Some(path) = arg {
        return path;
    }
    if let Some(path) = env.filter(|p| !p.trim().is_empty()) {
        return PathBuf::from(path);
    }
    Path::new("config").join("default.toml")
}

fn create_provider(config: &Config) -> anyhow::Result<AnyProvider> {
    let llm = &config.llm;
    match llm.provider {
        ProviderKind::OpenAi => {
            let Some(api_key) = config.secrets.openai_api_key.as_ref() else {
                bail!("openai provider selected but RAGVS_OPENAI_API_KEY (or OPENAI_API_KEY) is not set");
            };
            Ok(AnyProvider::OpenAi(OpenAiProvider::new(
                api_key.expose().to_owned(),
                llm.base_url.clone(),
                llm.model.clone(),
                llm.max_tokens,
                Some(llm.embedding_model.clone()),
            )))
        }
        ProviderKind::Ollama => Ok(AnyProvider::Ollama(OllamaProvider::new(
            &llm.base_url,
            llm.model.clone(),
            llm.embedding_model.clone(),
        ))),
    }
}
