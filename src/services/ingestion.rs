//! Turning plain-text documents into passages for the index.

use std::path::Path;

use crate::domain::errors::{RagError, RagResult};
use crate::services::vector_index::SecondaryEmbedding;

/// Collapse whitespace runs, turn `•` bullets into `-`, and trim.
pub fn clean_text(text: &str) -> String {
    text.replace('•', "-")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split on blank lines into cleaned, non-empty paragraphs.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n");
    let mut paragraphs = Vec::new();
    let mut current = String::new();

    for line in normalized.lines() {
        if line.trim().is_empty() {
            push_paragraph(&mut paragraphs, &current);
            current.clear();
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    push_paragraph(&mut paragraphs, &current);
    paragraphs
}

fn push_paragraph(paragraphs: &mut Vec<String>, raw: &str) {
    let cleaned = clean_text(raw);
    if !cleaned.is_empty() {
        paragraphs.push(cleaned);
    }
}

/// Read a plain-text or markdown document and split it into passages.
pub async fn read_passages(path: &Path) -> RagResult<Vec<String>> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        RagError::Persistence(format!("cannot read document '{}': {e}", path.display()))
    })?;
    Ok(split_paragraphs(&text))
}

/// Read `[{"label": ..., "vector": [...]}]` image embeddings.
pub async fn read_secondary_embeddings(path: &Path) -> RagResult<Vec<SecondaryEmbedding>> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        RagError::Persistence(format!("cannot read image embeddings '{}': {e}", path.display()))
    })?;
    parse_secondary_embeddings(&raw)
}

pub fn parse_secondary_embeddings(raw: &str) -> RagResult<Vec<SecondaryEmbedding>> {
    serde_json::from_str(raw)
        .map_err(|e| RagError::Embedding(format!("invalid image embeddings JSON: {e}")))
}
