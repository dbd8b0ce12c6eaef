//! Atlassian Document Format (ADF)
//!
//! A API v3 rejeita descrições em texto puro. O texto é convertido em um
//! documento estruturado:
//!
//! - linhas em branco separam parágrafos
//! - quebras simples viram nós `hardBreak`
//! - texto vazio gera um único parágrafo vazio

use serde_json::{json, Value};

/// Converte texto livre em um documento ADF (`type: doc`, `version: 1`)
pub fn text_to_document(text: &str) -> Value {
    let normalized = text.replace("\r\n", "\n");

    let paragraphs: Vec<Value> = normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(paragraph)
        .collect();

    let content = if paragraphs.is_empty() {
        vec![json!({ "type": "paragraph", "content": [] })]
    } else {
        paragraphs
    };

    json!({
        "type": "doc",
        "version": 1,
        "content": content
    })
}

fn paragraph(block: &str) -> Value {
    let mut nodes = Vec::new();

    for (i, line) in block.lines().enumerate() {
        if i > 0 {
            nodes.push(json!({ "type": "hardBreak" }));
        }
        // Nós de texto vazios são inválidos em ADF
        if !line.is_empty() {
            nodes.push(json!({ "type": "text", "text": line }));
        }
    }

    json!({ "type": "paragraph", "content": nodes })
}
