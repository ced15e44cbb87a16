use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::experiences::repo::ExperienceRecord;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Query parameters accepted by the listing endpoint. Defaults are applied
/// by the service so they can come from configuration.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub difficulty: Option<String>,
    pub offer_received: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
}

/// Body for create and update. Every field is optional: create checks
/// presence itself (so the error message names the missing field), update
/// applies only what is present.
#[derive(Debug, Default, Deserialize)]
pub struct ExperiencePayload {
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub experience_description: Option<String>,
    pub difficulty: Option<String>,
    pub offer_received: Option<bool>,
    pub application_date: Option<String>,
    pub final_decision_date: Option<String>,
}

/// Experience as returned to clients, decorated with the author's username
/// and the derived timeline length. Never stored in this shape.
#[derive(Debug, Serialize)]
pub struct ExperienceView {
    pub id: i32,
    pub job_title: String,
    pub company_name: String,
    pub experience_description: String,
    pub difficulty: String,
    pub offer_received: bool,
    #[serde(with = "iso_date")]
    pub application_date: Date,
    #[serde(with = "iso_date")]
    pub final_decision_date: Date,
    pub application_timeline_days: i64,
    pub user_id: i32,
    pub author_username: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<ExperienceRecord> for ExperienceView {
    fn from(r: ExperienceRecord) -> Self {
        // Recomputed on every read, never persisted.
        let application_timeline_days = (r.final_decision_date - r.application_date).whole_days();
        Self {
            id: r.id,
            job_title: r.job_title,
            company_name: r.company_name,
            experience_description: r.experience_description,
            difficulty: r.difficulty,
            offer_received: r.offer_received,
            application_date: r.application_date,
            final_decision_date: r.final_decision_date,
            application_timeline_days,
            user_id: r.user_id,
            author_username: r.author_username,
            created_at: r.created_at,
        }
    }
}

/// One page of experiences plus pagination bookkeeping.
#[derive(Debug, Serialize)]
pub struct ExperiencePage {
    pub experiences: Vec<ExperienceView>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Serialize)]
pub struct ExperienceResponse {
    pub experience: ExperienceView,
}

#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub message: String,
    pub experience: ExperienceView,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn record() -> ExperienceRecord {
        ExperienceRecord {
            id: 1,
            job_title: "Backend Engineer".into(),
            company_name: "Acme".into(),
            experience_description: "Three rounds, mostly systems design.".into(),
            difficulty: "Medium".into(),
            offer_received: true,
            application_date: date!(2025 - 01 - 01),
            final_decision_date: date!(2025 - 01 - 10),
            user_id: 7,
            created_at: datetime!(2025-02-01 12:00 UTC),
            author_username: "alice".into(),
        }
    }

    #[test]
    fn view_derives_timeline_days() {
        let view = ExperienceView::from(record());
        assert_eq!(view.application_timeline_days, 9);
    }

    #[test]
    fn same_day_decision_is_zero_days() {
        let mut r = record();
        r.final_decision_date = r.application_date;
        assert_eq!(ExperienceView::from(r).application_timeline_days, 0);
    }

    #[test]
    fn view_serializes_iso_dates_and_author() {
        let json = serde_json::to_value(ExperienceView::from(record())).unwrap();
        assert_eq!(json["application_date"], "2025-01-01");
        assert_eq!(json["final_decision_date"], "2025-01-10");
        assert_eq!(json["application_timeline_days"], 9);
        assert_eq!(json["author_username"], "alice");
        assert_eq!(json["created_at"], "2025-02-01T12:00:00Z");
    }

    #[test]
    fn partial_payload_leaves_absent_fields_none() {
        let payload: ExperiencePayload =
            serde_json::from_str(r#"{"application_date": "2025-01-15"}"#).unwrap();
        assert_eq!(payload.application_date.as_deref(), Some("2025-01-15"));
        assert!(payload.job_title.is_none());
        assert!(payload.offer_received.is_none());
    }
}
