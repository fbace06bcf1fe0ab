//! End-to-end generation: upload, resolve, fill, record, mirror. Everything
//! runs against a scratch data directory; no server and no PDF fonts are
//! involved (body templates default to the filled-body output).

use backend::config::AppConfig;
use backend::error::ServiceError;
use backend::services::clients::store as clients;
use backend::services::generate::engine;
use backend::services::profiles;
use backend::services::templates::store as templates;
use backend::services::templates::upload::upload_template;
use chrono::Utc;
use common::model::document::GenerationStatus;
use common::model::mapping::{FieldMapping, MappingEntry};
use common::model::profile::{
    MappingProfile, OutputRules, RemoteRules, RepeatRule, RepeatSource,
};
use common::model::template::Template;
use common::requests::{GenerateBatchRequest, GenerateRequest, TemplateUploadMeta};
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::fs;
use tempfile::TempDir;
use uuid::Uuid;

fn setup() -> (TempDir, AppConfig, Connection) {
    let dir = TempDir::new().unwrap();
    let cfg = AppConfig::with_data_dir(dir.path());
    cfg.ensure_dirs().unwrap();
    let conn = backend::db::open(&cfg).unwrap();
    backend::db::init_schema(&conn).unwrap();
    (dir, cfg, conn)
}

fn meta(name: &str) -> TemplateUploadMeta {
    TemplateUploadMeta {
        name: name.to_string(),
        county: None,
        case_type: None,
        category: None,
    }
}

fn seed_petition(cfg: &AppConfig, conn: &Connection) -> Template {
    let body = "In re {client_name}, case {case_number}.\nBefore {judge}.";
    let template = upload_template(cfg, meta("Probate Petition"), body.as_bytes(), "t1").unwrap();

    let mut mapping = FieldMapping::default();
    mapping
        .fields
        .insert("judge".to_string(), MappingEntry::staff_input(None));
    templates::save_mapping(
        conn,
        &template.id,
        &serde_json::to_string(&mapping).unwrap(),
    )
    .unwrap();

    let mut bundle = BTreeMap::new();
    bundle.insert("client_name".to_string(), "Jane Doe".to_string());
    bundle.insert("case_number".to_string(), "2024-P-001".to_string());
    clients::replace_bundle(conn, "c1", &bundle).unwrap();

    templates::get(conn, &template.id).unwrap()
}

fn request(template_id: &str) -> GenerateRequest {
    GenerateRequest {
        client_id: "c1".to_string(),
        template_id: template_id.to_string(),
        profile_id: None,
        staff_inputs: BTreeMap::new(),
        formats: None,
        save_to_remote: false,
    }
}

#[test]
fn upload_detects_variables_once() {
    let (_dir, cfg, conn) = setup();
    let template = seed_petition(&cfg, &conn);
    assert_eq!(template.variables, vec!["client_name", "case_number", "judge"]);
    assert!(template.repeat_blocks.is_empty());
}

#[test]
fn generation_blocks_until_staff_supply_the_judge() {
    let (_dir, cfg, conn) = setup();
    let template = seed_petition(&cfg, &conn);

    let err = engine::generate_document(&cfg, &request(&template.id)).unwrap_err();
    match err {
        ServiceError::UnresolvedVariables(names) => assert_eq!(names, vec!["judge"]),
        other => panic!("expected unresolved variables, got {}", other),
    }

    let mut req = request(&template.id);
    req.staff_inputs
        .insert("judge".to_string(), "Hon. Smith".to_string());
    let record = engine::generate_document(&cfg, &req).unwrap();
    assert_eq!(record.status, GenerationStatus::Success);

    let output = fs::read_to_string(record.docx_path.unwrap()).unwrap();
    assert_eq!(output, "In re Jane Doe, case 2024-P-001.\nBefore Hon. Smith.");
    assert!(record.error.is_none());
}

#[test]
fn typed_staff_inputs_are_remembered_for_the_next_run() {
    let (_dir, cfg, conn) = setup();
    let template = seed_petition(&cfg, &conn);

    let mut req = request(&template.id);
    req.staff_inputs
        .insert("judge".to_string(), "Hon. Smith".to_string());
    engine::generate_document(&cfg, &req).unwrap();

    let saved = clients::load_staff_inputs(&conn, "c1").unwrap();
    assert_eq!(saved["judge"], "Hon. Smith");

    // The saved value satisfies the prompt on the next run.
    let record = engine::generate_document(&cfg, &request(&template.id)).unwrap();
    assert_eq!(record.status, GenerationStatus::Success);
    let output = fs::read_to_string(record.docx_path.unwrap()).unwrap();
    assert!(output.contains("Hon. Smith"));
}

#[test]
fn repeat_block_expands_one_repetition_per_row() {
    let (_dir, cfg, conn) = setup();
    let body = "Estate of {client_name}\n{#assets}\n- {assets.name}: {assets.value}\n{/assets}";
    let template = upload_template(&cfg, meta("Inventory"), body.as_bytes(), "t2").unwrap();

    let mut bundle = BTreeMap::new();
    bundle.insert("client_name".to_string(), "Jane Doe".to_string());
    clients::replace_bundle(&conn, "c1", &bundle).unwrap();
    let rows: Vec<BTreeMap<String, String>> = [("House", "$350,000"), ("Car", "$12,000"), ("Checking", "$4,100")]
        .iter()
        .map(|(name, value)| {
            let mut row = BTreeMap::new();
            row.insert("name".to_string(), name.to_string());
            row.insert("value".to_string(), value.to_string());
            row
        })
        .collect();
    clients::replace_collection(&conn, "c1", RepeatSource::AssetsDebts, &rows).unwrap();

    let mut repeat_rules = BTreeMap::new();
    repeat_rules.insert(
        "assets".to_string(),
        RepeatRule {
            source: RepeatSource::AssetsDebts,
        },
    );
    let profile = MappingProfile {
        id: Uuid::new_v4().to_string(),
        template_id: template.id.clone(),
        name: "Cook County".to_string(),
        mapping: FieldMapping::default(),
        repeat_rules,
        output_rules: OutputRules::default(),
        remote_rules: RemoteRules::default(),
        created_at: Utc::now(),
    };
    profiles::insert(&conn, &profile).unwrap();

    let mut req = request(&template.id);
    req.profile_id = Some(profile.id.clone());
    let record = engine::generate_document(&cfg, &req).unwrap();
    assert_eq!(record.status, GenerationStatus::Success);

    let output = fs::read_to_string(record.docx_path.unwrap()).unwrap();
    assert_eq!(
        output,
        "Estate of Jane Doe\n- House: $350,000\n- Car: $12,000\n- Checking: $4,100\n"
    );
}

#[test]
fn missing_repeat_rule_yields_a_failure_record_not_a_panic() {
    let (_dir, cfg, conn) = setup();
    let body = "{#heirs}{heirs.name}{/heirs}";
    let template = upload_template(&cfg, meta("Heirs"), body.as_bytes(), "t3").unwrap();
    clients::replace_bundle(&conn, "c1", &BTreeMap::new()).unwrap();

    let record = engine::generate_document(&cfg, &request(&template.id)).unwrap();
    assert_eq!(record.status, GenerationStatus::Failure);
    assert!(record.error.unwrap().contains("heirs"));
    assert!(record.docx_path.is_none());
}

#[test]
fn foreign_profile_is_rejected_before_any_generation() {
    let (_dir, cfg, conn) = setup();
    let first = seed_petition(&cfg, &conn);
    let second = upload_template(&cfg, meta("Other"), b"Hello {client_name}", "t4").unwrap();

    let profile = MappingProfile {
        id: Uuid::new_v4().to_string(),
        template_id: second.id.clone(),
        name: "Lake County".to_string(),
        mapping: FieldMapping::default(),
        repeat_rules: BTreeMap::new(),
        output_rules: OutputRules::default(),
        remote_rules: RemoteRules::default(),
        created_at: Utc::now(),
    };
    profiles::insert(&conn, &profile).unwrap();

    let mut req = request(&first.id);
    req.profile_id = Some(profile.id.clone());
    req.staff_inputs
        .insert("judge".to_string(), "Hon. Smith".to_string());
    let err = engine::generate_document(&cfg, &req).unwrap_err();
    assert!(matches!(err, ServiceError::Configuration(_)));
}

#[test]
fn profile_filename_pattern_names_the_output() {
    let (_dir, cfg, conn) = setup();
    let template = seed_petition(&cfg, &conn);
    let profile = MappingProfile {
        id: Uuid::new_v4().to_string(),
        template_id: template.id.clone(),
        name: "Cook County".to_string(),
        mapping: template.mapping.clone(),
        repeat_rules: BTreeMap::new(),
        output_rules: OutputRules {
            filename_pattern: Some("{yyyy}-{template}-{client}".to_string()),
            formats: Vec::new(),
        },
        remote_rules: RemoteRules::default(),
        created_at: Utc::now(),
    };
    profiles::insert(&conn, &profile).unwrap();

    let mut req = request(&template.id);
    req.profile_id = Some(profile.id.clone());
    req.staff_inputs
        .insert("judge".to_string(), "Hon. Smith".to_string());
    let record = engine::generate_document(&cfg, &req).unwrap();

    let path = record.docx_path.unwrap();
    let name = std::path::Path::new(&path)
        .file_name()
        .unwrap()
        .to_string_lossy()
        .into_owned();
    let year = Utc::now().format("%Y").to_string();
    assert_eq!(name, format!("{}-Probate_Petition-Jane_Doe.docx", year));
}

#[test]
fn remote_mirror_records_the_stored_paths() {
    let (_dir, cfg, conn) = setup();
    let template = seed_petition(&cfg, &conn);

    let mut req = request(&template.id);
    req.staff_inputs
        .insert("judge".to_string(), "Hon. Smith".to_string());
    req.save_to_remote = true;
    let record = engine::generate_document(&cfg, &req).unwrap();

    assert_eq!(record.status, GenerationStatus::Success);
    assert!(record.remote_warning.is_none());
    assert_eq!(record.remote_paths.len(), 1);
    assert!(fs::metadata(&record.remote_paths[0]).is_ok());
    assert!(record.remote_paths[0].starts_with(cfg.remote_dir().to_str().unwrap()));
}

#[test]
fn remote_failure_degrades_to_a_warning_on_the_success_record() {
    let (_dir, cfg, conn) = setup();
    let template = seed_petition(&cfg, &conn);

    // A plain file where the remote root should be makes every mirror
    // write fail while local generation is unaffected.
    fs::remove_dir_all(cfg.remote_dir()).unwrap();
    fs::write(cfg.remote_dir(), "not a directory").unwrap();

    let mut req = request(&template.id);
    req.staff_inputs
        .insert("judge".to_string(), "Hon. Smith".to_string());
    req.save_to_remote = true;
    let record = engine::generate_document(&cfg, &req).unwrap();

    assert_eq!(record.status, GenerationStatus::Success);
    assert!(record.docx_path.is_some());
    assert!(record.remote_warning.is_some());
    assert!(record.remote_paths.is_empty());
    assert!(record.error.is_none());
}

#[test]
fn batch_isolates_the_failing_template() {
    let (_dir, cfg, conn) = setup();
    let good_a = seed_petition(&cfg, &conn);
    let bad = upload_template(&cfg, meta("Broken"), b"{#heirs}{heirs.name}{/heirs}", "t5").unwrap();
    let good_b = upload_template(&cfg, meta("Letter"), b"Dear {client_name},", "t6").unwrap();

    let mut staff_inputs = BTreeMap::new();
    staff_inputs.insert("judge".to_string(), "Hon. Smith".to_string());
    let req = GenerateBatchRequest {
        client_id: "c1".to_string(),
        template_ids: vec![good_a.id.clone(), bad.id.clone(), good_b.id.clone()],
        staff_inputs,
        save_to_remote: false,
    };
    let items = engine::generate_batch(&cfg, &req).unwrap();
    assert_eq!(items.len(), 3);

    let status = |i: usize| items[i].record.as_ref().unwrap().status;
    assert_eq!(status(0), GenerationStatus::Success);
    assert_eq!(status(1), GenerationStatus::Failure);
    assert_eq!(status(2), GenerationStatus::Success);
}

#[test]
fn unknown_ids_are_caller_errors_not_records() {
    let (_dir, cfg, _conn) = setup();
    let err = engine::generate_document(&cfg, &request("nope")).unwrap_err();
    assert!(matches!(err, ServiceError::Configuration(_)));

    let batch = GenerateBatchRequest {
        client_id: String::new(),
        template_ids: vec!["x".to_string()],
        staff_inputs: BTreeMap::new(),
        save_to_remote: false,
    };
    assert!(matches!(
        engine::generate_batch(&cfg, &batch).unwrap_err(),
        ServiceError::Configuration(_)
    ));
}

#[test]
fn fillable_pdf_generation_fills_the_form() {
    let (_dir, cfg, conn) = setup();
    // A minimal AcroForm PDF built in place of a scanned court form.
    let pdf_bytes = sample_form_bytes();
    let template = upload_template(&cfg, meta("Court Form"), &pdf_bytes, "t7").unwrap();
    assert_eq!(template.pdf_fields.len(), 2);

    let mut bundle = BTreeMap::new();
    bundle.insert("client_name".to_string(), "Jane Doe".to_string());
    bundle.insert("county".to_string(), "Cook".to_string());
    clients::replace_bundle(&conn, "c1", &bundle).unwrap();

    let record = engine::generate_document(&cfg, &request(&template.id)).unwrap();
    assert_eq!(record.status, GenerationStatus::Success);
    let pdf_path = record.pdf_path.unwrap();
    let filled = lopdf::Document::load(&pdf_path).unwrap();
    let has_value = filled.objects.values().any(|obj| {
        obj.as_dict()
            .map(|dict| matches!(dict.get(b"V"), Ok(lopdf::Object::String(bytes, _)) if bytes == b"Jane Doe"))
            .unwrap_or(false)
    });
    assert!(has_value);
}

fn sample_form_bytes() -> Vec<u8> {
    use lopdf::{dictionary, Document, Object};

    let mut doc = Document::with_version("1.5");
    let text_field = doc.add_object(dictionary! {
        "FT" => "Tx",
        "T" => Object::string_literal("client_name"),
    });
    let choice_field = doc.add_object(dictionary! {
        "FT" => "Ch",
        "T" => Object::string_literal("county"),
        "Opt" => vec![Object::string_literal("Cook"), Object::string_literal("Lake")],
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

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}
