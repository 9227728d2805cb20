use std::path::Path;

use anyhow::{Context, Result};
use pdfium_render::prelude::*;
use tracing::debug;

/// Bind pdfium from an explicit library path or the system search path.
pub fn bind_pdfium(pdfium_path: Option<&str>) -> Result<Pdfium> {
    let bindings = if let Some(path) = pdfium_path {
        Pdfium::bind_to_library(path)
            .with_context(|| format!("Failed to load pdfium from: {path}"))?
    } else {
        Pdfium::bind_to_system_library()
            .context("Failed to find pdfium. Install pdfium-binaries or use --pdfium-path")?
    };
    Ok(Pdfium::new(bindings))
}

/// Load a PDF and return its text as trimmed, non-empty lines in page order.
pub fn extract_lines(pdfium: &Pdfium, path: &Path) -> Result<Vec<String>> {
    let document = pdfium
        .load_pdf_from_file(path, None)
        .with_context(|| format!("Failed to load PDF: {}", path.display()))?;

    let mut lines = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let text = page
            .text()
            .with_context(|| format!("Failed to load text for page {}", idx + 1))?;
        let page_lines = split_lines(&text.all());
        debug!(page = idx + 1, lines = page_lines.len(), "page text extracted");
        lines.extend(page_lines);
    }
    Ok(lines)
}

/// Read document lines from a PDF, or from a plain-text dump of one.
pub fn read_document_lines(pdfium_path: Option<&str>, path: &Path) -> Result<Vec<String>> {
    let is_text = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("txt"));
    if is_text {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read text file: {}", path.display()))?;
        return Ok(split_lines(&text));
    }
    let pdfium = bind_pdfium(pdfium_path)?;
    extract_lines(&pdfium, path)
}

/// Split extracted text into trimmed, non-empty lines.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
