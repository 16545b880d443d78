use std::collections::HashMap;

use super::{Message, Prompt};

/// A prompt with `{name}` placeholders. `{{` and `}}` produce literal braces.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Substitute every placeholder. Fails on an unknown or unterminated one.
    pub fn render(&self, vars: &HashMap<&str, String>) -> anyhow::Result<String> {
        let segments = parse(&self.template)?;
        let mut out = String::with_capacity(self.template.len());
        for segment in segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Brace(c) => out.push(c),
                Segment::Variable(name) => {
                    let value = vars
                        .get(name)
                        .ok_or_else(|| anyhow::anyhow!("Missing template variable: {name}"))?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }

    /// Render as a user message preceded by the given system instruction.
    pub fn render_with_system(
        &self,
        system: &str,
        vars: &HashMap<&str, String>,
    ) -> anyhow::Result<Prompt> {
        let user = self.render(vars)?;
        Ok(Prompt::Messages(vec![Message::system(system), Message::user(user)]))
    }
}

enum Segment<'a> {
    Literal(&'a str),
    Brace(char),
    Variable(&'a str),
}

fn parse(template: &str) -> anyhow::Result<Vec<Segment<'_>>> {
    let mut segments = Vec::new();
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        if pos > 0 {
            segments.push(Segment::Literal(&rest[..pos]));
        }
        let tail = &rest[pos..];
        if tail.starts_with("{{") {
            segments.push(Segment::Brace('{'));
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            segments.push(Segment::Brace('}'));
            rest = &tail[2..];
        } else if tail.starts_with('}') {
            anyhow::bail!("Unmatched '}}' at byte {}", template.len() - tail.len());
        } else {
            let end = tail
                .find('}')
                .ok_or_else(|| anyhow::anyhow!("Unterminated placeholder in template"))?;
            let name = tail[1..end].trim();
            if name.is_empty() {
                anyhow::bail!("Empty placeholder in template");
            }
            segments.push(Segment::Variable(name));
            rest = &tail[end + 1..];
        }
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }

    Ok(segments)
}
