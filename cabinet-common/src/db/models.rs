//! Database models

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Patient {
    /// Legacy numeric identifier, also used as the cross-reference code
    pub department_code: i64,
    pub last_name: String,
    pub first_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub medical_history: Option<String>,
    pub surgical_history: Option<String>,
    pub allergies: Option<String>,
}

/// Billed medical act
///
/// `patient_code` is the denormalized patient department code, not a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Honoraire {
    /// Raw date string, as received
    pub date: String,
    /// Canonical `YYYY-MM-DD`, `None` when the raw format is unrecognized
    pub date_iso: Option<String>,
    pub time: Option<String>,
    pub patient_code: String,
    pub act_name: Option<String>,
    pub amount: f64,
    pub practitioner: Option<String>,
    pub assistant_1: Option<String>,
    pub assistant_1_fee: f64,
    pub assistant_2: Option<String>,
    pub assistant_2_fee: f64,
}

/// Fee catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActeHonoraire {
    pub act_name: String,
    pub amount: f64,
    pub assistant_1_pct: f64,
    pub assistant_2_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct VisitExamination {
    pub patient_code: String,
    pub visit_date: String,
    pub visit_date_iso: Option<String>,
    /// JSON object holding every clinical field of the export
    pub payload: String,
}

/// Report template keyed by a caller-supplied id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CompteRendu {
    pub id: i64,
    pub code: String,
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentValidation {
    pub patient_code: Option<String>,
    pub visit_date: String,
    pub visit_date_iso: Option<String>,
    pub status: String,
    pub total_amount: f64,
    pub validated_by: Option<String>,
    pub validated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub guid: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

/// Legacy assistant identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AssistantUser {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MessageTemplate {
    pub title: String,
    pub content: String,
}
