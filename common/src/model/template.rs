use crate::model::mapping::FieldMapping;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discriminates the two template families the generator knows how to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateKind {
    /// A document body with `{variable}` placeholders and optional
    /// `{#block}...{/block}` repeat regions.
    #[serde(rename = "DOCX")]
    Docx,
    /// A PDF carrying AcroForm fields that are filled by name.
    #[serde(rename = "FILLABLE_PDF")]
    FillablePdf,
}

impl TemplateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::Docx => "DOCX",
            TemplateKind::FillablePdf => "FILLABLE_PDF",
        }
    }
}

/// Declared type of a PDF form field, taken from its `/FT` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdfFieldKind {
    Text,
    Choice,
}

/// One form-field descriptor detected at upload time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfField {
    pub name: String,
    pub kind: PdfFieldKind,
    /// Permitted values for choice fields, in `/Opt` order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// A repeat region parsed out of a body template at upload time: the block
/// name and the member variables (`block.member`) it encloses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatBlock {
    pub name: String,
    pub members: Vec<String>,
}

/// A stored document template with everything detection derived from the
/// uploaded file. `variables`, `pdf_fields` and `repeat_blocks` are computed
/// once at upload and never re-derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub kind: TemplateKind,
    pub county: Option<String>,
    pub case_type: Option<String>,
    pub category: Option<String>,
    /// Ordered scalar variable names (body templates).
    #[serde(default)]
    pub variables: Vec<String>,
    /// Form-field descriptors (fillable PDFs).
    #[serde(default)]
    pub pdf_fields: Vec<PdfField>,
    #[serde(default)]
    pub repeat_blocks: Vec<RepeatBlock>,
    /// The template's default mapping, edited from the mapping panel.
    #[serde(default)]
    pub mapping: FieldMapping,
    pub file_path: String,
    pub checksum: String,
    /// Optional base64 PNG stamped at the top of PDF output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letterhead_png: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Template {
    /// The variable names resolution works over, regardless of kind.
    pub fn variable_names(&self) -> Vec<String> {
        match self.kind {
            TemplateKind::Docx => self.variables.clone(),
            TemplateKind::FillablePdf => {
                self.pdf_fields.iter().map(|f| f.name.clone()).collect()
            }
        }
    }
}
