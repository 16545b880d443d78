use tracing::info;

use ai_workshop::app::{build_completion_model, init_tracing};
use ai_workshop::completion::Message;
use ai_workshop::config::{DEFAULT_CONFIG_PATH, load_settings_from_path};
use ai_workshop::service::dispatch;

const SYSTEM_INSTRUCTIONS: &str =
    "Act as an experienced AI trainer, describe in a high-level overview";
const QUESTION: &str = "What are the relationships between AI, ML, DL and NLP?";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let settings = load_settings_from_path(DEFAULT_CONFIG_PATH)?;
    let model = build_completion_model(&settings)?;

    info!(
        "Querying '{}' for '{QUESTION}', using the system instructions '{SYSTEM_INSTRUCTIONS}'...",
        model.model_name()
    );
    let messages = vec![Message::system(SYSTEM_INSTRUCTIONS), Message::user(QUESTION)];
    let answer = dispatch(model.as_ref(), messages).await?;
    println!("{answer}");

    Ok(())
}
