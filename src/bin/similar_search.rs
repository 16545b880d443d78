use tracing::info;

use ai_workshop::app::{build_vector_service, init_tracing};
use ai_workshop::config::{DEFAULT_CONFIG_PATH, load_settings_from_path};

const DOCUMENTS: &[&str] = &[
    "Dependency Injection hands an object its collaborators instead of letting it build them.",
    "Inversion of Control moves the flow of a program into a framework.",
    "Embeddings map text to vectors so that similar meanings end up close together.",
    "PostgreSQL with pgvector can order rows by vector distance.",
];
const QUERY: &str = "How are similar texts found with vectors?";
const LIMIT: usize = 3;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let settings = load_settings_from_path(DEFAULT_CONFIG_PATH)?;
    let service = build_vector_service(&settings).await?;

    for document in DOCUMENTS {
        if service.find_embedding(document).await?.is_none() {
            service.store_embedding(document).await?;
        }
    }

    info!("Searching for the {LIMIT} texts most similar to '{QUERY}'...");
    for (rank, content) in service.find_similar(QUERY, LIMIT).await?.iter().enumerate() {
        println!("{}. {content}", rank + 1);
    }

    Ok(())
}
