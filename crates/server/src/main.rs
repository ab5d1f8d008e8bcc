//! Support Agent Server Entry Point

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use support_agent_agent::{InMemoryConversationStore, ReplyComposer, ResponseScheduler};
use support_agent_config::{load_settings, ObservabilityConfig, Settings};
use support_agent_core::{CorpusRecord, CorpusStore, Embedder, LanguageModel, SystemClock};
use support_agent_llm::{OpenAIBackend, OpenAIConfig};
use support_agent_rag::{
    CachedEmbedder, CandidateReranker, CorpusSeed, HttpEmbedder, HttpEmbeddingConfig,
    HybridRetriever, InMemoryCorpusStore, QdrantCorpusStore, QdrantStoreConfig, RetrieverConfig,
};
use support_agent_server::{create_router, init_metrics, AppState};
use support_agent_text_processing::{IntentClassifier, ResponseValidator};
use support_agent_tools::{
    HttpOrderLookup, LookupOrderTool, SearchProductsConfig, SearchProductsTool, ToolExecutor,
    ToolRegistry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Priority: env vars > config/{env} > config/default > defaults
    let env = std::env::var("SUPPORT_AGENT_ENV").ok();
    let config = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            // Tracing not yet initialized
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        },
    };

    init_tracing(&config.observability);

    tracing::info!("Starting Support Agent Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?config.environment,
        config_path = env.as_deref().unwrap_or("default"),
        "Configuration loaded"
    );

    let metrics = if config.observability.metrics_enabled {
        let handle = init_metrics()?;
        tracing::info!("Initialized Prometheus metrics at /metrics");
        Some(handle)
    } else {
        None
    };

    let llm: Arc<dyn LanguageModel> = Arc::new(
        OpenAIBackend::new(OpenAIConfig::from(&config.llm)).context("chat backend")?,
    );
    let classifier_llm: Arc<dyn LanguageModel> = Arc::new(
        OpenAIBackend::new(OpenAIConfig {
            model: config.llm.classifier_model.clone(),
            ..OpenAIConfig::from(&config.llm)
        })
        .context("classifier backend")?,
    );

    let http_embedder = HttpEmbedder::new(HttpEmbeddingConfig::from(&config.embedding))
        .context("embedding client")?;
    let embedder: Arc<dyn Embedder> = Arc::new(CachedEmbedder::from_config(
        Arc::new(http_embedder),
        &config.embedding,
    ));

    let corpus = init_corpus_store(&config, embedder.as_ref()).await?;
    let retriever = Arc::new(HybridRetriever::new(
        RetrieverConfig::from(&config.retrieval),
        embedder,
        corpus,
    ));

    let reranker = config
        .reranker
        .enabled
        .then(|| Arc::new(CandidateReranker::new(classifier_llm.clone(), config.reranker.clone())));

    let tools = init_tools(&config, retriever.clone(), reranker)?;
    let tool_names: Vec<String> = tools.definitions().into_iter().map(|d| d.name).collect();
    tracing::info!(tools = ?tool_names, "Tool registry initialized");

    let composer = ReplyComposer::new(
        config.agent.clone(),
        config.retrieval.clone(),
        llm.clone(),
        Arc::new(IntentClassifier::new(config.intent.clone(), Some(classifier_llm))),
        retriever,
        Arc::new(tools),
        ResponseValidator::new(config.validator.clone()),
    );

    let conversations = Arc::new(InMemoryConversationStore::new());
    let scheduler = ResponseScheduler::new(
        config.scheduler.clone(),
        conversations.clone(),
        conversations.clone(),
        Arc::new(composer),
        Arc::new(SystemClock),
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;

    let state = AppState::new(config, conversations, scheduler, llm)
        .with_tools(tool_names)
        .with_metrics(metrics);
    let app = create_router(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

fn init_tracing(config: &ObservabilityConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("support_agent={},tower_http=debug", config.log_level).into()
    });

    let fmt_layer = if config.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();
}

/// Qdrant when a URL is configured, otherwise the in-memory store
///
/// A configured seed file is embedded and loaded into whichever store is used.
async fn init_corpus_store(
    config: &Settings,
    embedder: &dyn Embedder,
) -> anyhow::Result<Arc<dyn CorpusStore>> {
    let seed_path = config.vector_store.seed_path.as_deref();

    if config.vector_store.qdrant_url.is_none() {
        let store = match seed_path {
            Some(path) => InMemoryCorpusStore::from_seed_file(path)?,
            None => {
                tracing::warn!("No seed file configured, starting with an empty corpus");
                InMemoryCorpusStore::new()
            },
        };
        let indexed = store.index_embeddings(embedder).await;
        tracing::info!(indexed, "In-memory corpus store ready");
        return Ok(Arc::new(store));
    }

    let qdrant_config =
        QdrantStoreConfig::from_settings(&config.vector_store, config.embedding.dimensions);
    tracing::info!(
        endpoint = %qdrant_config.endpoint,
        prefix = %qdrant_config.collection_prefix,
        "Initializing Qdrant corpus store"
    );
    let store = QdrantCorpusStore::new(qdrant_config)?;
    store.ensure_collections().await?;

    if let Some(path) = seed_path {
        let raw = std::fs::read_to_string(path).with_context(|| format!("seed file {}", path))?;
        let seed: CorpusSeed = serde_json::from_str(&raw)?;
        seed_qdrant(&store, seed.into_records(), embedder).await?;
    }
    Ok(Arc::new(store))
}

async fn seed_qdrant(
    store: &QdrantCorpusStore,
    records: Vec<CorpusRecord>,
    embedder: &dyn Embedder,
) -> anyhow::Result<()> {
    let mut embedded = Vec::with_capacity(records.len());
    let mut embeddings = Vec::with_capacity(records.len());
    for record in records {
        match embedder.embed(&record.searchable_text()).await {
            Ok(vector) => {
                embeddings.push(vector);
                embedded.push(record);
            },
            Err(e) => tracing::warn!(error = %e, id = %record.id(), "Skipping seed record"),
        }
    }
    store.upsert(&embedded, &embeddings).await?;
    tracing::info!(records = embedded.len(), "Seeded Qdrant corpus");
    Ok(())
}

fn init_tools(
    config: &Settings,
    retriever: Arc<HybridRetriever>,
    reranker: Option<Arc<CandidateReranker>>,
) -> anyhow::Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    if config.agent.product_search_enabled {
        registry.register(SearchProductsTool::new(
            retriever,
            reranker,
            SearchProductsConfig::from_settings(&config.reranker, &config.agent),
        ));
    }

    if config.agent.order_lookup_enabled {
        match HttpOrderLookup::from_config(&config.commerce)? {
            Some(lookup) => registry.register(LookupOrderTool::new(Arc::new(lookup))),
            None => tracing::info!("No orders endpoint configured, order lookup disabled"),
        }
    }

    Ok(registry)
}
