use serde::{Deserialize, Serialize};

/// Structured preview of a generated document for the review screen:
/// paragraph text for body documents, per-page text for PDFs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DocumentPreview {
    Docx { paragraphs: Vec<String> },
    Pdf { pages: Vec<String> },
}
