//! Assistant user migration
//!
//! Folds legacy `assistant_users` identities into `users`. Each assistant
//! gets a synthetic email and inherits the password hash and role of the
//! role template account (the oldest user holding the template role).
//! Assistants whose synthetic email already exists are skipped, so the
//! migration can be re-run safely.

use super::record_run;
use crate::importer::{Importer, WriteStrategy};
use crate::mapper::{Mapped, SkipReason};
use crate::report::ImportReport;
use crate::sink::{SqliteSink, TableRecord};
use cabinet_common::config::ImportSettings;
use cabinet_common::db::{get_setting, AssistantUser, User};
use cabinet_common::{Error, Result};
use sqlx::query_builder::Separated;
use sqlx::{Sqlite, SqlitePool};
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

pub const JOB: &str = "migrate-assistants";

const DEFAULT_EMAIL_DOMAIN: &str = "assistants.cabinet.local";
const DEFAULT_TEMPLATE_ROLE: &str = "assistant";

impl TableRecord for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &["guid", "username", "email", "password_hash", "role"];

    fn push_binds(&self, row: &mut Separated<'_, '_, Sqlite, &'static str>) {
        row.push_bind(self.guid.clone())
            .push_bind(self.username.clone())
            .push_bind(self.email.clone())
            .push_bind(self.password_hash.clone())
            .push_bind(self.role.clone());
    }
}

/// Synthetic email for an assistant: `first.last@domain`, ASCII only
pub fn synthetic_email(
    first_name: Option<&str>,
    last_name: Option<&str>,
    domain: &str,
) -> Option<String> {
    let local: Vec<String> = [first_name, last_name]
        .into_iter()
        .flatten()
        .map(email_part)
        .filter(|part| !part.is_empty())
        .collect();

    if local.is_empty() {
        None
    } else {
        Some(format!("{}@{}", local.join("."), domain))
    }
}

fn email_part(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .map(fold_accent)
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'â' | 'ä' | 'á' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'î' | 'ï' | 'í' => 'i',
        'ô' | 'ö' | 'ó' => 'o',
        'ù' | 'û' | 'ü' | 'ú' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

/// Maps assistants to users, inheriting from the template account
#[derive(Debug)]
pub struct AssistantMapper {
    template: User,
    domain: String,
    existing_emails: HashSet<String>,
}

impl AssistantMapper {
    pub fn new(
        template: User,
        domain: impl Into<String>,
        existing_emails: HashSet<String>,
    ) -> Self {
        Self {
            template,
            domain: domain.into(),
            existing_emails,
        }
    }

    pub fn map(&mut self, assistant: &AssistantUser) -> Mapped<User> {
        let first_name = assistant.first_name.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let last_name = assistant.last_name.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let email = synthetic_email(first_name, last_name, &self.domain)
            .ok_or_else(|| SkipReason::MissingField("name".to_string()))?;

        if !self.existing_emails.insert(email.clone()) {
            return Err(SkipReason::Duplicate(format!("user {}", email)));
        }

        let username = [first_name, last_name]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");

        Ok(User {
            guid: Uuid::new_v4().to_string(),
            username,
            email,
            password_hash: self.template.password_hash.clone(),
            role: self.template.role.clone(),
        })
    }
}

/// Oldest user holding `role`
pub async fn find_role_template(pool: &SqlitePool, role: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT guid, username, email, password_hash, role
        FROM users
        WHERE role = ?
        ORDER BY created_at, guid
        LIMIT 1
        "#,
    )
    .bind(role)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn migrate_assistants(
    pool: &SqlitePool,
    settings: &ImportSettings,
) -> Result<ImportReport> {
    let role = get_setting(pool, "assistant_template_role")
        .await?
        .unwrap_or_else(|| DEFAULT_TEMPLATE_ROLE.to_string());
    let domain = get_setting(pool, "synthetic_email_domain")
        .await?
        .unwrap_or_else(|| DEFAULT_EMAIL_DOMAIN.to_string());

    let template = find_role_template(pool, &role).await?.ok_or_else(|| {
        Error::NotFound(format!("No template user with role '{}' to inherit credentials from", role))
    })?;
    info!("🔑 Using {} ({}) as {} template", template.username, template.email, role);

    let existing_emails: HashSet<String> = sqlx::query_scalar("SELECT email FROM users")
        .fetch_all(pool)
        .await?
        .into_iter()
        .collect();

    let assistants = sqlx::query_as::<_, AssistantUser>(
        "SELECT id, first_name, last_name, role FROM assistant_users ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    let importer = Importer::new(
        JOB,
        WriteStrategy::BatchedInsert {
            batch_size: settings.batch_size,
        },
    )
    .with_progress_interval(settings.progress_interval);
    let mut mapper = AssistantMapper::new(template, domain, existing_emails);
    let mut sink = SqliteSink::new(pool.clone());
    let report = importer
        .run(&assistants, |assistant| mapper.map(assistant), &mut sink)
        .await?;

    record_run(pool, report).await
}
