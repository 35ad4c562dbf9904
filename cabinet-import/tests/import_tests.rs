//! End-to-end import tests against temporary databases

use cabinet_common::config::ImportSettings;
use cabinet_common::db::{count_rows, find_honoraires, init_database, last_imports, Patient};
use cabinet_common::Error;
use cabinet_import::jobs::{
    actes, assistants, compte_rendus, honoraires, message_templates, patients,
    payment_validations, visits, WriteMode,
};
use cabinet_import::{diagnose, verify, SkipReason};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

async fn setup() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("cabinet.db")).await.unwrap();
    (temp_dir, pool)
}

fn settings(dir: &Path) -> ImportSettings {
    ImportSettings {
        batch_size: 2,
        progress_interval: 0,
        source_dir: dir.to_path_buf(),
    }
}

fn write_fixture(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn xml_table(rows: &[&[(&str, &str)]]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Table>\n");
    for row in rows {
        xml.push_str("  <Table_Contenu>\n");
        for (name, value) in *row {
            xml.push_str(&format!("    <{name}>{value}</{name}>\n"));
        }
        xml.push_str("  </Table_Contenu>\n");
    }
    xml.push_str("</Table>\n");
    xml
}

const HONORAIRES: &[&[(&str, &str)]] = &[
    &[("Date", "2025-10-30"), ("CodePatient", "1042"), ("Acte", "Consultation"), ("Montant", "2000")],
    &[("Date", "30/10/2025"), ("CodePatient", "1043"), ("Acte", "Echographie"), ("Montant", "3500,50")],
    &[("Date", "3/11/2025"), ("CodePatient", "9999"), ("Montant", "1500")],
    &[("CodePatient", "1042"), ("Montant", "800")],
];

#[tokio::test]
async fn test_honoraires_replace_all_is_idempotent() {
    let (dir, pool) = setup().await;
    let source = write_fixture(dir.path(), "honoraires.xml", &xml_table(HONORAIRES));

    let first = honoraires::import_honoraires(&pool, &source, &settings(dir.path()))
        .await
        .unwrap();
    let after_first = count_rows(&pool, "honoraires").await.unwrap();

    let second = honoraires::import_honoraires(&pool, &source, &settings(dir.path()))
        .await
        .unwrap();
    let after_second = count_rows(&pool, "honoraires").await.unwrap();

    assert_eq!(first.total, 4);
    assert_eq!(first.imported, 3);
    assert_eq!(first.skipped, 1);
    assert_eq!(first.skips[0].index, 3);
    assert_eq!(first.skips[0].reason, SkipReason::MissingField("Date".to_string()));
    // ceil(3 / 2) write calls
    assert_eq!(first.write_calls(), 2);

    assert_eq!(after_first, 3);
    assert_eq!(after_second, after_first);
    assert_eq!(second.deleted, 3);
}

#[tokio::test]
async fn test_honoraires_store_canonical_date_alongside_raw() {
    let (dir, pool) = setup().await;
    let source = write_fixture(dir.path(), "honoraires.xml", &xml_table(HONORAIRES));
    honoraires::import_honoraires(&pool, &source, &settings(dir.path()))
        .await
        .unwrap();

    let rows: Vec<(String, Option<String>, f64)> =
        sqlx::query_as("SELECT date, date_iso, amount FROM honoraires ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();

    assert_eq!(rows[0], ("2025-10-30".to_string(), Some("2025-10-30".to_string()), 2000.0));
    assert_eq!(rows[1], ("30/10/2025".to_string(), Some("2025-10-30".to_string()), 3500.5));
    assert_eq!(rows[2].1.as_deref(), Some("2025-11-03"));
}

#[tokio::test]
async fn test_raw_date_lookup_misses_other_format() {
    let (dir, pool) = setup().await;
    let source = write_fixture(dir.path(), "honoraires.xml", &xml_table(HONORAIRES));
    honoraires::import_honoraires(&pool, &source, &settings(dir.path()))
        .await
        .unwrap();

    // Stored as 2025-10-30, looked up as 30/10/2025
    let found = find_honoraires(&pool, "1042", "30/10/2025").await.unwrap();
    assert!(found.is_empty());
    assert_eq!(find_honoraires(&pool, "1042", "2025-10-30").await.unwrap().len(), 1);

    let report = diagnose::run_diagnostics(&pool, Some(("1042", "30/10/2025")))
        .await
        .unwrap();
    let probe = report.probe.unwrap();
    assert_eq!(probe.honoraires_exact, 0);
    assert_eq!(probe.honoraires_canonical, Some(1));
    assert_eq!(probe.stored_dates, vec!["2025-10-30".to_string()]);
    assert_eq!(probe.missed_by_exact_lookup(), 1);
}

#[tokio::test]
async fn test_diagnostics_report_formats_and_orphans() {
    let (dir, pool) = setup().await;
    let patients_xml = xml_table(&[
        &[("N_Departement", "1042"), ("Nom", "Benali")],
        &[("N_Departement", "1043"), ("Nom", "Haddad")],
    ]);
    let patients_source = write_fixture(dir.path(), "patients.xml", &patients_xml);
    let honoraires_source = write_fixture(dir.path(), "honoraires.xml", &xml_table(HONORAIRES));
    patients::import_patients(&pool, &patients_source, &settings(dir.path()))
        .await
        .unwrap();
    honoraires::import_honoraires(&pool, &honoraires_source, &settings(dir.path()))
        .await
        .unwrap();

    let report = diagnose::run_diagnostics(&pool, None).await.unwrap();

    let census = &report.date_columns[0];
    assert_eq!((census.table.as_str(), census.column.as_str()), ("honoraires", "date"));
    assert_eq!(census.total(), 3);
    assert!(census.is_mixed());
    assert_eq!(report.orphaned_codes.len(), 1);
    assert_eq!(report.orphaned_codes[0].patient_code, "9999");
    assert!(report.probe.is_none());
}

#[tokio::test]
async fn test_patients_upsert_by_department_code() {
    let (dir, pool) = setup().await;
    let first = write_fixture(
        dir.path(),
        "patients.xml",
        &xml_table(&[
            &[("N_Departement", "1042"), ("Nom", "Benali"), ("Telephone", "0550 12 34 56")],
            &[("N_Departement", "1043"), ("Nom", "Haddad")],
        ]),
    );
    patients::import_patients(&pool, &first, &settings(dir.path()))
        .await
        .unwrap();

    let second = write_fixture(
        dir.path(),
        "patients_update.xml",
        &xml_table(&[&[("N_Departement", "1042"), ("Nom", "Benali"), ("Telephone", "0661 00 00 00")]]),
    );
    let report = patients::import_patients(&pool, &second, &settings(dir.path()))
        .await
        .unwrap();

    assert_eq!((report.imported, report.updated), (0, 1));
    // Patients absent from the second dump are kept
    assert_eq!(count_rows(&pool, "patients").await.unwrap(), 2);

    let patient = sqlx::query_as::<_, Patient>(
        r#"
        SELECT department_code, last_name, first_name, date_of_birth, phone, address,
               medical_history, surgical_history, allergies
        FROM patients WHERE department_code = 1042
        "#,
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(patient.phone.as_deref(), Some("0661 00 00 00"));
}

#[tokio::test]
async fn test_compte_rendus_upsert_updates_in_place() {
    let (dir, pool) = setup().await;
    let first = write_fixture(
        dir.path(),
        "compte_rendus.json",
        r#"{"data": {"compteRendus": [
            {"id": 1, "code": "ECHO", "title": "Echographie", "content": "Foie normal.",
             "createdAt": "2025-01-01T00:00:00Z"},
            {"id": 2, "code": "ECG", "title": "ECG", "content": "Rythme sinusal."}
        ]}}"#,
    );
    let second = write_fixture(
        dir.path(),
        "compte_rendus_v2.json",
        r#"{"data": {"compteRendus": [
            {"id": 1, "code": "ECHO", "title": "Echographie abdominale", "content": "Foie normal."},
            {"id": 2, "code": "ECG", "title": "ECG", "content": "Rythme sinusal régulier."}
        ]}}"#,
    );

    let report = compte_rendus::import_compte_rendus(&pool, &first, &settings(dir.path()))
        .await
        .unwrap();
    assert_eq!((report.imported, report.updated), (2, 0));

    sqlx::query("UPDATE compte_rendus SET updated_at = '2000-01-01 00:00:00'")
        .execute(&pool)
        .await
        .unwrap();

    let report = compte_rendus::import_compte_rendus(&pool, &second, &settings(dir.path()))
        .await
        .unwrap();
    assert_eq!((report.imported, report.updated), (0, 2));
    assert_eq!(count_rows(&pool, "compte_rendus").await.unwrap(), 2);

    let title: String = sqlx::query_scalar("SELECT title FROM compte_rendus WHERE id = 1")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(title, "Echographie abdominale");

    let stale: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM compte_rendus WHERE updated_at = '2000-01-01 00:00:00'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(stale, 0);
}

#[tokio::test]
async fn test_oversized_batch_keeps_existing_rows() {
    let (dir, pool) = setup().await;
    let source = write_fixture(dir.path(), "honoraires.xml", &xml_table(HONORAIRES));
    honoraires::import_honoraires(&pool, &source, &settings(dir.path()))
        .await
        .unwrap();
    let before = count_rows(&pool, "honoraires").await.unwrap();

    let mut xml = String::from("<Table>\n");
    for i in 0..3000 {
        xml.push_str(&format!(
            "<Table_Contenu><Date>2025-10-30</Date><CodePatient>{}</CodePatient></Table_Contenu>\n",
            i
        ));
    }
    xml.push_str("</Table>\n");
    let large = write_fixture(dir.path(), "honoraires_large.xml", &xml);

    // 11 columns per honoraire: at most 2978 rows per insert
    let oversized = ImportSettings {
        batch_size: 3000,
        ..settings(dir.path())
    };
    let result = honoraires::import_honoraires(&pool, &large, &oversized).await;

    assert!(matches!(result, Err(Error::InvalidInput(_))));
    assert_eq!(before, 3);
    assert_eq!(count_rows(&pool, "honoraires").await.unwrap(), before);
}

#[tokio::test]
async fn test_actes_skip_duplicate_names() {
    let (dir, pool) = setup().await;
    let source = write_fixture(
        dir.path(),
        "actes.xml",
        &xml_table(&[
            &[("Acte", "Consultation"), ("Montant", "2000")],
            &[("Acte", "Echographie"), ("Montant", "3500")],
            &[("Acte", "Consultation"), ("Montant", "2500")],
        ]),
    );

    let report = actes::import_actes(&pool, &source, &settings(dir.path()))
        .await
        .unwrap();

    assert_eq!(report.imported, 2);
    assert!(matches!(report.skips[0].reason, SkipReason::Duplicate(_)));
    assert_eq!(count_rows(&pool, "actes_honoraires").await.unwrap(), 2);
}

#[tokio::test]
async fn test_visits_replace_and_append_modes() {
    let (dir, pool) = setup().await;
    let source = write_fixture(
        dir.path(),
        "visit_examinations.json",
        r#"{"data": {"visitExaminations": [
            {"id": 7, "patientCode": "1042", "visitDate": "2025-10-30", "tension": "12/8"},
            {"id": 8, "patientCode": "1043", "visitDate": "31/10/2025"},
            {"id": 9, "visitDate": "31/10/2025"}
        ]}}"#,
    );

    let report = visits::import_visits(&pool, &source, &settings(dir.path()), WriteMode::Replace)
        .await
        .unwrap();
    assert_eq!((report.imported, report.skipped), (2, 1));

    visits::import_visits(&pool, &source, &settings(dir.path()), WriteMode::Replace)
        .await
        .unwrap();
    assert_eq!(count_rows(&pool, "visit_examinations").await.unwrap(), 2);

    visits::import_visits(&pool, &source, &settings(dir.path()), WriteMode::Append)
        .await
        .unwrap();
    assert_eq!(count_rows(&pool, "visit_examinations").await.unwrap(), 4);

    let payload: String = sqlx::query_scalar(
        "SELECT payload FROM visit_examinations WHERE patient_code = '1042' LIMIT 1",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    let payload: serde_json::Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(payload["tension"], "12/8");
    assert!(payload.get("id").is_none());
}

#[tokio::test]
async fn test_payment_validations_import() {
    let (dir, pool) = setup().await;
    let source = write_fixture(
        dir.path(),
        "payment_validations.json",
        r#"{"data": {"paymentValidations": [
            {"id": 1, "patientCode": "1042", "visitDate": "2025-10-30", "status": "validated",
             "totalAmount": 2000, "validatedBy": "Dr Mansouri"},
            {"id": 2, "visitDate": "2025-10-30"}
        ]}}"#,
    );

    let report = payment_validations::import_payment_validations(
        &pool,
        &source,
        &settings(dir.path()),
        WriteMode::Replace,
    )
    .await
    .unwrap();

    assert_eq!((report.imported, report.skipped), (1, 1));
    assert_eq!(
        report.skips[0].reason,
        SkipReason::MissingField("status".to_string())
    );
}

#[tokio::test]
async fn test_missing_source_is_not_found() {
    let (dir, pool) = setup().await;

    let result = patients::import_patients(&pool, &dir.path().join("absent.xml"), &settings(dir.path())).await;

    assert!(matches!(result, Err(Error::NotFound(_))));
    assert!(last_imports(&pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_xml_aborts_before_writing() {
    let (dir, pool) = setup().await;
    let good = write_fixture(dir.path(), "honoraires.xml", &xml_table(HONORAIRES));
    honoraires::import_honoraires(&pool, &good, &settings(dir.path()))
        .await
        .unwrap();

    let bad = write_fixture(dir.path(), "broken.xml", "<Table><Table_Contenu><Date>");
    let result = honoraires::import_honoraires(&pool, &bad, &settings(dir.path())).await;

    assert!(matches!(result, Err(Error::Parse(_))));
    assert_eq!(count_rows(&pool, "honoraires").await.unwrap(), 3);
}

async fn insert_user(pool: &SqlitePool, guid: &str, email: &str, role: &str, created_at: &str) {
    sqlx::query(
        "INSERT INTO users (guid, username, email, password_hash, role, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(guid)
    .bind(guid)
    .bind(email)
    .bind(format!("hash-{}", guid))
    .bind(role)
    .bind(created_at)
    .execute(pool)
    .await
    .unwrap();
}

async fn insert_assistant(pool: &SqlitePool, first_name: &str, last_name: &str) {
    sqlx::query("INSERT INTO assistant_users (first_name, last_name) VALUES (?, ?)")
        .bind(first_name)
        .bind(last_name)
        .execute(pool)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_assistant_migration_requires_template() {
    let (dir, pool) = setup().await;
    insert_assistant(&pool, "Nadia", "Cherif").await;

    let result = assistants::migrate_assistants(&pool, &settings(dir.path())).await;

    assert!(matches!(result, Err(Error::NotFound(_))));
    assert_eq!(count_rows(&pool, "users").await.unwrap(), 0);
}

#[tokio::test]
async fn test_assistant_migration_is_idempotent() {
    let (dir, pool) = setup().await;
    insert_user(&pool, "newer", "newer@cabinet.local", "assistant", "2025-06-01 00:00:00").await;
    insert_user(&pool, "oldest", "oldest@cabinet.local", "assistant", "2024-01-01 00:00:00").await;
    insert_user(&pool, "doctor", "doctor@cabinet.local", "admin", "2023-01-01 00:00:00").await;
    insert_assistant(&pool, "Nadia", "Cherif").await;
    insert_assistant(&pool, "Hélène", "Ben Saïd").await;

    let first = assistants::migrate_assistants(&pool, &settings(dir.path()))
        .await
        .unwrap();
    assert_eq!(first.imported, 2);

    let (hash, role): (String, String) = sqlx::query_as(
        "SELECT password_hash, role FROM users WHERE email = 'helene.bensaid@assistants.cabinet.local'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(hash, "hash-oldest");
    assert_eq!(role, "assistant");

    let second = assistants::migrate_assistants(&pool, &settings(dir.path()))
        .await
        .unwrap();
    assert_eq!((second.imported, second.skipped), (0, 2));
    assert_eq!(count_rows(&pool, "users").await.unwrap(), 5);
}

#[tokio::test]
async fn test_message_templates_seeded_once() {
    let (dir, pool) = setup().await;

    let first = message_templates::seed_message_templates(&pool, &settings(dir.path()))
        .await
        .unwrap();
    let second = message_templates::seed_message_templates(&pool, &settings(dir.path()))
        .await
        .unwrap();

    assert_eq!(
        first.map(|report| report.imported),
        Some(message_templates::DEFAULT_TEMPLATES.len())
    );
    assert!(second.is_none());
    assert_eq!(
        count_rows(&pool, "message_templates").await.unwrap(),
        message_templates::DEFAULT_TEMPLATES.len() as i64
    );
}

#[tokio::test]
async fn test_verify_reports_counts_and_runs() {
    let (dir, pool) = setup().await;
    let source = write_fixture(dir.path(), "honoraires.xml", &xml_table(HONORAIRES));
    honoraires::import_honoraires(&pool, &source, &settings(dir.path()))
        .await
        .unwrap();

    let report = verify::run_verification(&pool).await.unwrap();

    assert_eq!(report.rows("honoraires"), Some(3));
    assert_eq!(report.rows("patients"), Some(0));
    assert_eq!(report.last_imports.len(), 1);
    assert_eq!(report.last_imports[0].job, "honoraires");
    assert_eq!(report.last_imports[0].count, 3);
}
