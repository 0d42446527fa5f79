//! Wiring shared by the commands: config → provider, index, workflow.

use std::path::Path;
use std::sync::Arc;

use medroute_config::AppConfig;
use medroute_core::Provider;
use medroute_index::{ChunkOptions, Embedder, InMemoryIndex, load_catalog};
use medroute_router::RoutingWorkflow;
use tracing::info;

/// Load every catalog file under `data_dir` into an in-memory index.
pub async fn build_index(
    config: &AppConfig,
    provider: Arc<dyn Provider>,
    data_dir: &Path,
) -> Result<InMemoryIndex, Box<dyn std::error::Error>> {
    let index = match &config.index.embedding_model {
        Some(model) => InMemoryIndex::with_embedder(Embedder::new(provider, model)),
        None => InMemoryIndex::new(),
    };

    let chunking = ChunkOptions {
        size: config.index.chunk_size,
        overlap: config.index.chunk_overlap,
    };
    let documents = load_catalog(data_dir, chunking)?;
    let added = index.insert_many(documents).await?;
    info!(added, data_dir = %data_dir.display(), "Catalog indexed");
    Ok(index)
}

/// The provider, a loaded index and a workflow over both.
pub async fn build_workflow(
    config: &AppConfig,
) -> Result<(Arc<dyn Provider>, RoutingWorkflow), Box<dyn std::error::Error>> {
    let provider = medroute_providers::build_from_config(config);
    let index = build_index(config, provider.clone(), Path::new(&config.index.data_dir)).await?;
    let workflow = RoutingWorkflow::from_config(provider.clone(), Arc::new(index), config);
    Ok((provider, workflow))
}
