use tracing::{debug, info};

use crate::completion::{CompletionModel, Prompt};

/// Send a prompt to the completion model and return the answer text.
///
/// Messages are forwarded verbatim and in order; bare text goes out as a
/// single user message. Provider failures are returned unchanged.
pub async fn dispatch(
    model: &dyn CompletionModel,
    prompt: impl Into<Prompt>,
) -> anyhow::Result<String> {
    let messages = prompt.into().into_messages();
    debug!(
        "Dispatching {} message(s) to {}",
        messages.len(),
        model.model_name()
    );

    let result = model.complete(&messages, None, None).await?;

    if let Some(usage) = &result.usage {
        info!(
            "Token usage: prompt={}, completion={}, total={}",
            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
        );
    }

    Ok(result.content)
}
