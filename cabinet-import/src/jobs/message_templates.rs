//! Default message template seeding
//!
//! Seeds the canned messages offered by the messaging screen. Runs only
//! against an empty `message_templates` table so edited templates are
//! never duplicated or overwritten.

use super::record_run;
use crate::importer::{Importer, WriteStrategy};
use crate::mapper::Mapped;
use crate::report::ImportReport;
use crate::sink::{SqliteSink, TableRecord};
use cabinet_common::config::ImportSettings;
use cabinet_common::db::{count_rows, MessageTemplate};
use cabinet_common::Result;
use sqlx::query_builder::Separated;
use sqlx::{Sqlite, SqlitePool};
use tracing::info;

pub const JOB: &str = "seed-messages";

/// Built-in templates as `(title, content)`
pub const DEFAULT_TEMPLATES: &[(&str, &str)] = &[
    ("Patient en salle d'attente", "Le patient suivant est installé en salle d'attente."),
    ("Patient prêt", "Le patient est prêt pour la consultation."),
    ("Préparer la salle", "Merci de préparer la salle d'examen."),
    ("Dossier demandé", "Merci d'apporter le dossier du patient."),
    ("Appel téléphonique", "Un appel vous attend à l'accueil."),
    ("Urgence", "Urgence : merci de venir immédiatement."),
    ("Pause", "Pause de quinze minutes."),
    ("Fin de consultation", "La consultation est terminée, le patient peut passer au règlement."),
];

impl TableRecord for MessageTemplate {
    const TABLE: &'static str = "message_templates";
    const COLUMNS: &'static [&'static str] = &["title", "content"];

    fn push_binds(&self, row: &mut Separated<'_, '_, Sqlite, &'static str>) {
        row.push_bind(self.title.clone()).push_bind(self.content.clone());
    }
}

fn map_template(template: &(&str, &str)) -> Mapped<MessageTemplate> {
    Ok(MessageTemplate {
        title: template.0.to_string(),
        content: template.1.to_string(),
    })
}

/// Seed [`DEFAULT_TEMPLATES`] unless templates already exist
///
/// Returns `None` when seeding was skipped.
pub async fn seed_message_templates(
    pool: &SqlitePool,
    settings: &ImportSettings,
) -> Result<Option<ImportReport>> {
    let existing = count_rows(pool, MessageTemplate::TABLE).await?;
    if existing > 0 {
        info!("⏭️  {}: {} templates already present, nothing to seed", JOB, existing);
        return Ok(None);
    }

    let importer = Importer::new(
        JOB,
        WriteStrategy::BatchedInsert {
            batch_size: settings.batch_size,
        },
    )
    .with_progress_interval(settings.progress_interval);
    let mut sink = SqliteSink::new(pool.clone());
    let report = importer.run(DEFAULT_TEMPLATES, map_template, &mut sink).await?;

    record_run(pool, report).await.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_titles_are_unique() {
        let titles: HashSet<&str> = DEFAULT_TEMPLATES.iter().map(|(title, _)| *title).collect();
        assert_eq!(titles.len(), DEFAULT_TEMPLATES.len());
    }

    #[test]
    fn test_templates_are_non_empty() {
        for template in DEFAULT_TEMPLATES {
            let mapped = map_template(template).unwrap();
            assert!(!mapped.title.is_empty());
            assert!(!mapped.content.is_empty());
        }
    }
}
