//! Fillable-PDF support: AcroForm field detection, filling and page-text
//! extraction, all through `lopdf`.
//!
//! Field names are taken verbatim from each field's `/T` entry. Only text
//! (`/FT /Tx`) and choice (`/FT /Ch`) fields are filled; buttons and
//! signatures pass through untouched.

use crate::error::ServiceError;
use common::model::template::{PdfField, PdfFieldKind};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;
use std::path::Path;

pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF-")
}

/// Walks the document's AcroForm and returns one descriptor per fillable
/// field, in `/Fields` order. Upload-time only.
pub fn detect_fields(path: &Path) -> Result<Vec<PdfField>, ServiceError> {
    let doc = load(path)?;
    let mut fields = Vec::new();
    for id in field_ids(&doc)? {
        let dict = doc
            .get_object(id)
            .and_then(Object::as_dict)
            .map_err(|e| bad_form(&e))?;
        if let Some(field) = describe_field(&doc, dict) {
            fields.push(field);
        }
    }
    if fields.is_empty() {
        return Err(ServiceError::Configuration(
            "PDF has no fillable form fields".to_string(),
        ));
    }
    Ok(fields)
}

/// Fills the named fields with their values and writes the result to
/// `out_path`. Fields without a value (or with a choice value not among the
/// field's options) are left empty, never removed.
pub fn fill_fields(
    path: &Path,
    out_path: &Path,
    values: &BTreeMap<String, String>,
) -> Result<(), ServiceError> {
    let mut doc = Document::load(path)
        .map_err(|e| ServiceError::Generation(format!("cannot read PDF template: {}", e)))?;

    let ids = field_ids(&doc).map_err(|e| ServiceError::Generation(e.to_string()))?;
    for id in ids {
        let descriptor = doc
            .get_object(id)
            .and_then(Object::as_dict)
            .ok()
            .and_then(|dict| describe_field(&doc, dict));
        let Some(field) = descriptor else { continue };
        let Some(value) = values.get(&field.name) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        if field.kind == PdfFieldKind::Choice && !field.options.iter().any(|opt| opt == value) {
            continue;
        }
        let dict = doc
            .get_object_mut(id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| ServiceError::Generation(e.to_string()))?;
        dict.set("V", Object::string_literal(value.as_str()));
        // Stale appearance streams would keep showing the old value.
        dict.remove(b"AP");
    }
    set_need_appearances(&mut doc)?;

    doc.save(out_path)
        .map_err(|e| ServiceError::Generation(format!("cannot write filled PDF: {}", e)))?;
    Ok(())
}

/// Extracts the text of every page, in page order, for the review preview.
pub fn page_text(path: &Path) -> Result<Vec<String>, ServiceError> {
    let doc = load(path)?;
    let mut pages = Vec::new();
    for page_number in doc.get_pages().keys() {
        let text = doc.extract_text(&[*page_number]).unwrap_or_default();
        pages.push(text.trim_end().to_string());
    }
    Ok(pages)
}

fn load(path: &Path) -> Result<Document, ServiceError> {
    Document::load(path)
        .map_err(|e| ServiceError::Configuration(format!("cannot parse PDF: {}", e)))
}

fn bad_form(err: &lopdf::Error) -> ServiceError {
    ServiceError::Configuration(format!("malformed AcroForm: {}", err))
}

/// The `/Fields` array of the catalog's AcroForm, as object ids.
fn field_ids(doc: &Document) -> Result<Vec<ObjectId>, ServiceError> {
    let catalog = doc.catalog().map_err(|e| bad_form(&e))?;
    let form = catalog
        .get(b"AcroForm")
        .map_err(|_| ServiceError::Configuration("PDF carries no AcroForm".to_string()))?;
    let form = resolve_dict(doc, form)?;
    let fields = form
        .get(b"Fields")
        .and_then(Object::as_array)
        .map_err(|e| bad_form(&e))?;
    let mut ids = Vec::with_capacity(fields.len());
    for entry in fields {
        ids.push(entry.as_reference().map_err(|e| bad_form(&e))?);
    }
    Ok(ids)
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Result<&'a Dictionary, ServiceError> {
    match obj {
        Object::Reference(id) => doc
            .get_object(*id)
            .and_then(Object::as_dict)
            .map_err(|e| bad_form(&e)),
        other => other.as_dict().map_err(|e| bad_form(&e)),
    }
}

/// Reads name, kind and (for choice fields) the permitted options out of one
/// field dictionary. Unsupported field types yield `None`.
fn describe_field(doc: &Document, dict: &Dictionary) -> Option<PdfField> {
    let name = match dict.get(b"T").ok()? {
        Object::String(bytes, _) => String::from_utf8_lossy(bytes).into_owned(),
        _ => return None,
    };
    let kind = match dict.get(b"FT").ok()?.as_name().ok()? {
        b"Tx" => PdfFieldKind::Text,
        b"Ch" => PdfFieldKind::Choice,
        _ => return None,
    };
    let options = if kind == PdfFieldKind::Choice {
        choice_options(doc, dict)
    } else {
        Vec::new()
    };
    Some(PdfField { name, kind, options })
}

/// `/Opt` entries are either plain strings or `[export, display]` pairs; the
/// export value is what `/V` must match.
fn choice_options(doc: &Document, dict: &Dictionary) -> Vec<String> {
    let Ok(raw) = dict.get(b"Opt") else {
        return Vec::new();
    };
    let resolved;
    let entries = match raw {
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(obj) => {
                resolved = obj;
                resolved.as_array().ok()
            }
            Err(_) => None,
        },
        other => other.as_array().ok(),
    };
    let Some(entries) = entries else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match entry {
            Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
            Object::Array(pair) => match pair.first() {
                Some(Object::String(bytes, _)) => {
                    Some(String::from_utf8_lossy(bytes).into_owned())
                }
                _ => None,
            },
            _ => None,
        })
        .collect()
}

/// Viewers only regenerate field appearances when the form asks them to.
fn set_need_appearances(doc: &mut Document) -> Result<(), ServiceError> {
    let gen_err = |e: lopdf::Error| ServiceError::Generation(e.to_string());
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(gen_err)?;
    let form_ref = {
        let catalog = doc.catalog().map_err(gen_err)?;
        match catalog.get(b"AcroForm") {
            Ok(Object::Reference(id)) => Some(*id),
            Ok(_) => None,
            Err(_) => return Ok(()),
        }
    };
    match form_ref {
        Some(form_id) => {
            let form = doc
                .get_object_mut(form_id)
                .and_then(Object::as_dict_mut)
                .map_err(gen_err)?;
            form.set("NeedAppearances", true);
        }
        None => {
            // AcroForm is an inline dictionary in the catalog itself.
            let catalog = doc
                .get_object_mut(catalog_id)
                .and_then(Object::as_dict_mut)
                .map_err(gen_err)?;
            if let Ok(form) = catalog.get_mut(b"AcroForm").and_then(Object::as_dict_mut) {
                form.set("NeedAppearances", true);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use lopdf::dictionary;
    use tempfile::TempDir;

    /// Builds a small two-field AcroForm PDF on disk: a text field
    /// `client_name` and a choice field `county` with two options.
    pub fn write_sample_form(path: &Path) {
        let mut doc = Document::with_version("1.5");
        let text_field = doc.add_object(dictionary! {
            "FT" => "Tx",
            "T" => Object::string_literal("client_name"),
            "V" => Object::string_literal(""),
        });
        let choice_field = doc.add_object(dictionary! {
            "FT" => "Ch",
            "T" => Object::string_literal("county"),
            "Opt" => vec![
                Object::string_literal("Cook"),
                Object::string_literal("Lake"),
            ],
        });
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "Annots" => vec![Object::Reference(text_field), Object::Reference(choice_field)],
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let form_id = doc.add_object(dictionary! {
            "Fields" => vec![Object::Reference(text_field), Object::Reference(choice_field)],
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
            "AcroForm" => Object::Reference(form_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc.save(path).unwrap();
    }

    #[test]
    fn detects_fields_with_kinds_and_options() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("form.pdf");
        write_sample_form(&path);

        let fields = detect_fields(&path).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "client_name");
        assert_eq!(fields[0].kind, PdfFieldKind::Text);
        assert_eq!(fields[1].name, "county");
        assert_eq!(fields[1].kind, PdfFieldKind::Choice);
        assert_eq!(fields[1].options, vec!["Cook", "Lake"]);
    }

    #[test]
    fn fills_text_and_honors_choice_options() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("form.pdf");
        let out = dir.path().join("filled.pdf");
        write_sample_form(&path);

        let mut values = BTreeMap::new();
        values.insert("client_name".to_string(), "Jane Doe".to_string());
        values.insert("county".to_string(), "Elsewhere".to_string());
        fill_fields(&path, &out, &values).unwrap();

        let filled = Document::load(&out).unwrap();
        let mut by_name = BTreeMap::new();
        for id in field_ids(&filled).unwrap() {
            let dict = filled.get_object(id).unwrap().as_dict().unwrap();
            let name = match dict.get(b"T").unwrap() {
                Object::String(bytes, _) => String::from_utf8_lossy(bytes).into_owned(),
                _ => panic!("field without name"),
            };
            let value = match dict.get(b"V") {
                Ok(Object::String(bytes, _)) => String::from_utf8_lossy(bytes).into_owned(),
                _ => String::new(),
            };
            by_name.insert(name, value);
        }
        assert_eq!(by_name["client_name"], "Jane Doe");
        // Not one of the declared options, so the field stays empty.
        assert_eq!(by_name["county"], "");
    }

    #[test]
    fn plain_text_file_is_not_a_pdf() {
        assert!(!is_pdf(b"Dear {client_name},"));
        assert!(is_pdf(b"%PDF-1.5\n"));
    }
}
