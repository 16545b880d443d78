use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::completion::CompletionModel;
use crate::completion::openai::OpenAICompletionModel;
use crate::config::Settings;
use crate::embedding::EmbeddingModel;
use crate::embedding::openai::OpenAIEmbeddingModel;
use crate::service::VectorService;
use crate::vector_store::EmbeddingRepository;
use crate::vector_store::memory::InMemoryEmbeddingRepository;
use crate::vector_store::pgvector::PGVectorRepository;

/// Install the global tracing subscriber. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

fn resolved(settings: &Settings, key: &str) -> String {
    settings
        .resolve_model_name(key)
        .unwrap_or_else(|| key.to_string())
}

/// Completion model described by the settings.
pub fn build_completion_model(settings: &Settings) -> anyhow::Result<Arc<dyn CompletionModel>> {
    let model_name = resolved(settings, &settings.completion_model);
    let model = OpenAICompletionModel::new(
        &settings.api_base,
        &model_name,
        settings.require_api_key()?,
        settings.default_max_tokens,
        settings.default_temperature,
    );
    info!("Completion model initialized: {model_name}");
    Ok(Arc::new(model))
}

/// Embedding model described by the settings.
pub fn build_embedding_model(settings: &Settings) -> anyhow::Result<Arc<dyn EmbeddingModel>> {
    let model_name = resolved(settings, &settings.embedding_model);
    let model = OpenAIEmbeddingModel::new(
        &settings.api_base,
        &model_name,
        settings.require_api_key()?,
        settings.vector_dimensions,
    );
    info!("Embedding model initialized: {model_name}");
    Ok(Arc::new(model))
}

/// Connect and initialize the configured repository.
pub async fn build_repository(
    settings: &Settings,
) -> anyhow::Result<Arc<dyn EmbeddingRepository>> {
    let repository: Arc<dyn EmbeddingRepository> = match settings.vector_store_provider.as_str()
    {
        "memory" => Arc::new(InMemoryEmbeddingRepository::new(
            settings.vector_dimensions as usize,
            settings.similarity_metric,
        )),
        _ => {
            let uri = settings
                .postgres_uri
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("POSTGRES_URI environment variable is required"))?;
            Arc::new(
                PGVectorRepository::new(
                    uri,
                    settings.db_pool_size,
                    settings.db_acquire_timeout_secs,
                    settings.vector_dimensions,
                    settings.similarity_metric,
                )
                .await?,
            )
        }
    };

    repository.initialize().await?;
    info!("Vector store initialized: {}", repository.provider_name());
    Ok(repository)
}

/// Wire an embedding model and repository into a [`VectorService`].
pub async fn build_vector_service(settings: &Settings) -> anyhow::Result<VectorService> {
    let embedding_model = build_embedding_model(settings)?;
    let repository = build_repository(settings).await?;
    Ok(VectorService::new(embedding_model, repository))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TomlConfig, resolve_settings};

    fn memory_settings(api_key: Option<&str>) -> Settings {
        let config: TomlConfig = toml::from_str(
            r#"
[registered_models]
chat = { model_name = "gpt-4.1-mini" }

[completion]
model = "chat"

[embedding]
dimensions = 4

[vector_store]
provider = "memory"
"#,
        )
        .unwrap();
        let key = api_key.map(str::to_string);
        resolve_settings(config, move |name: &str| {
            (name == "OPENAI_API_KEY").then(|| key.clone()).flatten()
        })
        .unwrap()
    }

    #[test]
    fn test_models_require_api_key() {
        let settings = memory_settings(None);
        assert!(build_completion_model(&settings).is_err());
        assert!(build_embedding_model(&settings).is_err());
    }

    #[test]
    fn test_completion_model_uses_registered_name() {
        let settings = memory_settings(Some("sk-test"));
        let model = build_completion_model(&settings).unwrap();
        assert_eq!(model.model_name(), "gpt-4.1-mini");
        let embedder = build_embedding_model(&settings).unwrap();
        assert_eq!(embedder.dimensions(), 4);
    }

    #[tokio::test]
    async fn test_memory_repository_is_built() {
        let settings = memory_settings(Some("sk-test"));
        let repo = build_repository(&settings).await.unwrap();
        assert_eq!(repo.provider_name(), "memory");
        assert_eq!(repo.dimensions(), 4);
    }

    #[tokio::test]
    async fn test_pgvector_repository_requires_postgres_uri() {
        let settings = resolve_settings(TomlConfig::default(), |name: &str| {
            (name == "OPENAI_API_KEY").then(|| "sk-test".to_string())
        })
        .unwrap();
        // Prompt-only runners still get a completion model.
        assert!(build_completion_model(&settings).is_ok());

        let err = match build_repository(&settings).await {
            Ok(_) => panic!("pgvector repository built without POSTGRES_URI"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("POSTGRES_URI"));
    }
}
