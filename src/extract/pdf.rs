//! PDF text and metadata extraction via poppler's command-line tools.
//!
//! `pdftotext` renders page text and `pdfinfo` supplies the page count and
//! the embedded metadata dictionary. A corrupt or unsupported file surfaces
//! as a [`PdfError`], never a crash.

use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

use thiserror::Error;

/// Errors from the PDF rendering tools.
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("external tool not found: {0}")]
    ToolNotFound(String),

    #[error("failed to render PDF: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Handle command output, extracting stdout on success.
fn handle_cmd_output(
    result: std::io::Result<std::process::Output>,
    tool_name: &str,
    error_prefix: &str,
) -> Result<String, PdfError> {
    match result {
        Ok(output) => {
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(PdfError::Render(format!("{}: {}", error_prefix, stderr)))
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(PdfError::ToolNotFound(tool_name.to_string()))
        }
        Err(e) => Err(PdfError::Io(e)),
    }
}

/// Render every page of a PDF to text, pages joined by a blank line.
pub fn extract_text(file_path: &Path) -> Result<String, PdfError> {
    let pages = page_count(file_path).unwrap_or(1);

    let mut page_texts = Vec::with_capacity(pages as usize);
    for page in 1..=pages {
        page_texts.push(extract_page_text(file_path, page)?);
    }

    Ok(page_texts.join("\n\n"))
}

/// Run pdftotext on a single page.
pub fn extract_page_text(file_path: &Path, page: u32) -> Result<String, PdfError> {
    let page_str = page.to_string();
    let output = Command::new("pdftotext")
        .args(["-layout", "-enc", "UTF-8", "-f", &page_str, "-l", &page_str])
        .arg(file_path)
        .arg("-") // Output to stdout
        .output();

    handle_cmd_output(
        output,
        "pdftotext (install poppler-utils)",
        &format!("pdftotext failed on page {}", page),
    )
}

/// Get the page count of a PDF.
pub fn page_count(file_path: &Path) -> Option<u32> {
    let output = Command::new("pdfinfo").arg(file_path).output().ok()?;

    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_page_count(&stdout)
}

/// Retrieve the embedded metadata dictionary.
pub fn metadata(file_path: &Path) -> Result<HashMap<String, String>, PdfError> {
    let output = Command::new("pdfinfo").arg(file_path).output();
    let stdout = handle_cmd_output(output, "pdfinfo (install poppler-utils)", "pdfinfo failed")?;
    Ok(parse_pdfinfo_output(&stdout))
}

fn parse_page_count(pdfinfo_output: &str) -> Option<u32> {
    for line in pdfinfo_output.lines() {
        if line.starts_with("Pages:") {
            return line.split_whitespace().nth(1).and_then(|s| s.parse().ok());
        }
    }
    None
}

/// Parse pdfinfo's `Key: value` lines into a dictionary.
fn parse_pdfinfo_output(output: &str) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    for line in output.lines() {
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            let value = value.trim();
            if !key.is_empty() && !value.is_empty() {
                metadata.insert(key.to_string(), value.to_string());
            }
        }
    }
    metadata
}
