use super::RepositoryError;

/// Format a vector as a pgvector text literal, e.g. `[0.1,0.2]`.
pub fn to_pgvector_literal(vector: &[f32]) -> String {
    format!(
        "[{}]",
        vector
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    )
}

/// Parse the text form pgvector returns for `embedding::text`.
pub fn parse_pgvector_literal(text: &str) -> Result<Vec<f32>, RepositoryError> {
    let inner = text
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| RepositoryError::MalformedVector(text.to_string()))?;

    if inner.trim().is_empty() {
        return Ok(vec![]);
    }

    inner
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .map_err(|_| RepositoryError::MalformedVector(text.to_string()))
        })
        .collect()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// `1 - cos(a, b)`. A zero vector is treated as orthogonal to everything.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = dot(a, a).sqrt();
    let norm_b = dot(b, b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot(a, b) / (norm_a * norm_b)
}

pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Same sign convention as pgvector's `<#>`.
pub fn negative_inner_product(a: &[f32], b: &[f32]) -> f32 {
    -dot(a, b)
}
