use tracing::info;

use ai_workshop::app::{build_completion_model, init_tracing};
use ai_workshop::config::{DEFAULT_CONFIG_PATH, load_settings_from_path};
use ai_workshop::service::dispatch;

const QUESTION: &str = "What are the core AI components and their relations?";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let settings = load_settings_from_path(DEFAULT_CONFIG_PATH)?;
    let model = build_completion_model(&settings)?;

    info!("Querying '{}' for '{QUESTION}'...", model.model_name());
    let answer = dispatch(model.as_ref(), QUESTION).await?;
    println!("{answer}");

    Ok(())
}
