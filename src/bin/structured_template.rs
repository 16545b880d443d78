use std::collections::HashMap;

use tracing::info;

use ai_workshop::app::{build_completion_model, init_tracing};
use ai_workshop::completion::template::PromptTemplate;
use ai_workshop::config::{DEFAULT_CONFIG_PATH, load_settings_from_path};
use ai_workshop::service::dispatch;

const SYSTEM_INSTRUCTIONS: &str = "Act as an experienced AI trainer";
const TEMPLATE: &str = "Describe the relationships between {terms}. \
Answer with one short paragraph per term, written for {audience}.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let settings = load_settings_from_path(DEFAULT_CONFIG_PATH)?;
    let model = build_completion_model(&settings)?;

    let vars = HashMap::from([
        ("terms", "AI, ML, DL and NLP".to_string()),
        ("audience", "software developers new to the field".to_string()),
    ]);
    let prompt = PromptTemplate::new(TEMPLATE).render_with_system(SYSTEM_INSTRUCTIONS, &vars)?;

    info!("Querying '{}' with a structured template...", model.model_name());
    let answer = dispatch(model.as_ref(), prompt).await?;
    println!("{answer}");

    Ok(())
}
