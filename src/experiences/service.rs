use time::format_description::FormatItem;
use time::macros::format_description;
use time::Date;
use tracing::info;

use crate::config::VALID_DIFFICULTIES;
use crate::error::ApiError;
use crate::experiences::dto::{ExperiencePage, ExperiencePayload, ExperienceView, ListParams};
use crate::experiences::query::{ExperienceFilter, SortOrder};
use crate::experiences::repo::{self, ExperienceRecord, ExperienceValues};
use crate::state::AppState;

const ISO_DATE: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

fn check_required(payload: &ExperiencePayload) -> Result<(), ApiError> {
    let required = [
        ("job_title", payload.job_title.is_some()),
        ("company_name", payload.company_name.is_some()),
        (
            "experience_description",
            payload.experience_description.is_some(),
        ),
        ("difficulty", payload.difficulty.is_some()),
        ("offer_received", payload.offer_received.is_some()),
        ("application_date", payload.application_date.is_some()),
        ("final_decision_date", payload.final_decision_date.is_some()),
    ];
    for (name, present) in required {
        if !present {
            return Err(ApiError::Validation(format!(
                "Missing required field: {name}"
            )));
        }
    }
    Ok(())
}

fn check_difficulty(value: &str) -> Result<(), ApiError> {
    if !VALID_DIFFICULTIES.contains(&value) {
        return Err(ApiError::Validation(format!(
            "Difficulty must be one of {VALID_DIFFICULTIES:?}"
        )));
    }
    Ok(())
}

fn parse_iso_date(value: &str) -> Result<Date, ApiError> {
    Date::parse(value, ISO_DATE)
        .map_err(|_| ApiError::Validation("Invalid date format. Use YYYY-MM-DD".into()))
}

fn check_date_order(application: Date, decision: Date) -> Result<(), ApiError> {
    if decision < application {
        return Err(ApiError::Validation(
            "Final decision date cannot be before application date".into(),
        ));
    }
    Ok(())
}

/// Full shape validation for a create payload. Update skips this: it only
/// re-validates the fields it touches.
fn validate_create(payload: &ExperiencePayload) -> Result<(), ApiError> {
    check_required(payload)?;
    check_difficulty(payload.difficulty.as_deref().unwrap_or_default())?;

    if payload.job_title.as_deref().unwrap_or_default().chars().count() < 2 {
        return Err(ApiError::Validation(
            "Job title must be at least 2 characters long".into(),
        ));
    }
    if payload
        .company_name
        .as_deref()
        .unwrap_or_default()
        .chars()
        .count()
        < 2
    {
        return Err(ApiError::Validation(
            "Company name must be at least 2 characters long".into(),
        ));
    }
    if payload
        .experience_description
        .as_deref()
        .unwrap_or_default()
        .chars()
        .count()
        < 10
    {
        return Err(ApiError::Validation(
            "Experience description must be at least 10 characters long".into(),
        ));
    }
    Ok(())
}

/// Normalizes the raw query parameters into filter predicates. Empty values
/// count as absent; `offer_received` is parsed case-insensitively.
fn build_filter(params: &ListParams) -> ExperienceFilter {
    ExperienceFilter {
        difficulty: params.difficulty.clone().filter(|v| !v.is_empty()),
        offer_received: params
            .offer_received
            .as_deref()
            .filter(|v| !v.is_empty())
            .map(|v| v.eq_ignore_ascii_case("true")),
        search: params.search.clone().filter(|v| !v.is_empty()),
    }
}

fn total_pages(total: i64, per_page: i64) -> i64 {
    if total == 0 || per_page <= 0 {
        0
    } else {
        (total + per_page - 1) / per_page
    }
}

/// Applies a partial payload over the stored record. Dates arrive already
/// parsed so the caller can report format errors before any merging.
fn merge_patch(
    record: ExperienceRecord,
    patch: ExperiencePayload,
    application_date: Option<Date>,
    final_decision_date: Option<Date>,
) -> ExperienceValues {
    ExperienceValues {
        job_title: patch.job_title.unwrap_or(record.job_title),
        company_name: patch.company_name.unwrap_or(record.company_name),
        experience_description: patch
            .experience_description
            .unwrap_or(record.experience_description),
        difficulty: patch.difficulty.unwrap_or(record.difficulty),
        offer_received: patch.offer_received.unwrap_or(record.offer_received),
        application_date: application_date.unwrap_or(record.application_date),
        final_decision_date: final_decision_date.unwrap_or(record.final_decision_date),
    }
}

pub async fn list(state: &AppState, params: ListParams) -> Result<ExperiencePage, ApiError> {
    let page = params.page.unwrap_or(1);
    let per_page = params.per_page.unwrap_or(state.config.default_page_size);

    if page < 1 {
        return Err(ApiError::Validation("Page must be >= 1".into()));
    }
    if per_page > state.config.max_page_size {
        return Err(ApiError::Validation(format!(
            "Per page must be <= {}",
            state.config.max_page_size
        )));
    }

    let filter = build_filter(&params);
    let sort = SortOrder::from_param(params.sort_by.as_deref());

    let total = repo::count(&state.db, &filter).await?;
    let records = repo::list(&state.db, &filter, sort, per_page, (page - 1) * per_page).await?;

    let pages = total_pages(total, per_page);
    Ok(ExperiencePage {
        experiences: records.into_iter().map(ExperienceView::from).collect(),
        total,
        page,
        per_page,
        pages,
        has_next: page < pages,
        has_prev: page > 1,
    })
}

pub async fn get(state: &AppState, id: i32) -> Result<ExperienceView, ApiError> {
    match repo::fetch_by_id(&state.db, id).await? {
        Some(record) => Ok(record.into()),
        None => Err(ApiError::NotFound("Experience not found".into())),
    }
}

pub async fn create(
    state: &AppState,
    user_id: i32,
    payload: ExperiencePayload,
) -> Result<ExperienceView, ApiError> {
    validate_create(&payload)?;

    let application_date = parse_iso_date(payload.application_date.as_deref().unwrap_or_default())?;
    let final_decision_date =
        parse_iso_date(payload.final_decision_date.as_deref().unwrap_or_default())?;
    check_date_order(application_date, final_decision_date)?;

    let values = ExperienceValues {
        job_title: payload.job_title.unwrap_or_default(),
        company_name: payload.company_name.unwrap_or_default(),
        experience_description: payload.experience_description.unwrap_or_default(),
        difficulty: payload.difficulty.unwrap_or_default(),
        offer_received: payload.offer_received.unwrap_or_default(),
        application_date,
        final_decision_date,
    };
    let record = repo::insert(&state.db, user_id, &values).await?;
    info!(experience_id = record.id, user_id, "experience created");
    Ok(record.into())
}

pub async fn update(
    state: &AppState,
    id: i32,
    user_id: i32,
    patch: ExperiencePayload,
) -> Result<ExperienceView, ApiError> {
    let mut tx = state.db.begin().await?;

    let record = match repo::fetch_by_id_for_update(&mut tx, id).await? {
        Some(record) => record,
        None => return Err(ApiError::NotFound("Experience not found".into())),
    };
    if record.user_id != user_id {
        return Err(ApiError::Forbidden(
            "Forbidden: You can only edit your own experiences".into(),
        ));
    }

    if let Some(difficulty) = patch.difficulty.as_deref() {
        check_difficulty(difficulty)?;
    }
    let application_date = patch
        .application_date
        .as_deref()
        .map(parse_iso_date)
        .transpose()?;
    let final_decision_date = patch
        .final_decision_date
        .as_deref()
        .map(parse_iso_date)
        .transpose()?;

    // The invariant is checked against the merged record: touching one date
    // can invalidate it through the other's stored value.
    let merged = merge_patch(record, patch, application_date, final_decision_date);
    check_date_order(merged.application_date, merged.final_decision_date)?;

    let updated = repo::update(&mut tx, id, &merged).await?;
    tx.commit().await?;

    info!(experience_id = id, user_id, "experience updated");
    Ok(updated.into())
}

pub async fn delete(state: &AppState, id: i32, user_id: i32) -> Result<(), ApiError> {
    let record = match repo::fetch_by_id(&state.db, id).await? {
        Some(record) => record,
        None => return Err(ApiError::NotFound("Experience not found".into())),
    };
    if record.user_id != user_id {
        return Err(ApiError::Forbidden(
            "Forbidden: You can only delete your own experiences".into(),
        ));
    }

    repo::delete(&state.db, id).await?;
    info!(experience_id = id, user_id, "experience deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn full_payload() -> ExperiencePayload {
        ExperiencePayload {
            job_title: Some("Backend Engineer".into()),
            company_name: Some("Acme".into()),
            experience_description: Some("Three rounds, mostly systems design.".into()),
            difficulty: Some("Medium".into()),
            offer_received: Some(true),
            application_date: Some("2025-01-01".into()),
            final_decision_date: Some("2025-01-10".into()),
        }
    }

    fn stored_record() -> ExperienceRecord {
        ExperienceRecord {
            id: 1,
            job_title: "Backend Engineer".into(),
            company_name: "Acme".into(),
            experience_description: "Three rounds, mostly systems design.".into(),
            difficulty: "Medium".into(),
            offer_received: false,
            application_date: date!(2025 - 01 - 01),
            final_decision_date: date!(2025 - 01 - 10),
            user_id: 7,
            created_at: datetime!(2025-02-01 12:00 UTC),
            author_username: "alice".into(),
        }
    }

    #[test]
    fn create_validation_names_the_first_missing_field() {
        let mut payload = full_payload();
        payload.offer_received = None;
        let err = validate_create(&payload).unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: offer_received");

        let err = validate_create(&ExperiencePayload::default()).unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: job_title");
    }

    #[test]
    fn create_validation_rejects_unknown_difficulty() {
        let mut payload = full_payload();
        payload.difficulty = Some("Brutal".into());
        let err = validate_create(&payload).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"Difficulty must be one of ["Easy", "Medium", "Hard"]"#
        );
    }

    #[test]
    fn create_validation_enforces_minimum_lengths() {
        let mut payload = full_payload();
        payload.job_title = Some("x".into());
        assert_eq!(
            validate_create(&payload).unwrap_err().to_string(),
            "Job title must be at least 2 characters long"
        );

        let mut payload = full_payload();
        payload.company_name = Some("x".into());
        assert_eq!(
            validate_create(&payload).unwrap_err().to_string(),
            "Company name must be at least 2 characters long"
        );

        let mut payload = full_payload();
        payload.experience_description = Some("too short".into());
        assert_eq!(
            validate_create(&payload).unwrap_err().to_string(),
            "Experience description must be at least 10 characters long"
        );
    }

    #[test]
    fn date_parsing_accepts_iso_and_rejects_garbage() {
        assert_eq!(parse_iso_date("2025-01-31").unwrap(), date!(2025 - 01 - 31));
        for bad in ["01/31/2025", "2025-13-01", "yesterday", ""] {
            assert_eq!(
                parse_iso_date(bad).unwrap_err().to_string(),
                "Invalid date format. Use YYYY-MM-DD"
            );
        }
    }

    #[test]
    fn decision_before_application_is_rejected() {
        let err = check_date_order(date!(2025 - 01 - 10), date!(2025 - 01 - 01)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Final decision date cannot be before application date"
        );
        assert!(check_date_order(date!(2025 - 01 - 01), date!(2025 - 01 - 01)).is_ok());
    }

    #[test]
    fn filter_drops_empty_params_and_parses_offer_flag() {
        let params = ListParams {
            page: None,
            per_page: None,
            difficulty: Some(String::new()),
            offer_received: Some("TRUE".into()),
            search: Some(String::new()),
            sort_by: None,
        };
        let filter = build_filter(&params);
        assert!(filter.difficulty.is_none());
        assert!(filter.search.is_none());
        assert_eq!(filter.offer_received, Some(true));

        let params = ListParams {
            page: None,
            per_page: None,
            difficulty: Some("Hard".into()),
            offer_received: Some("banana".into()),
            search: Some("rust".into()),
            sort_by: None,
        };
        let filter = build_filter(&params);
        assert_eq!(filter.difficulty.as_deref(), Some("Hard"));
        assert_eq!(filter.offer_received, Some(false));
        assert_eq!(filter.search.as_deref(), Some("rust"));
    }

    #[test]
    fn page_count_is_ceiling_division() {
        assert_eq!(total_pages(12, 5), 3);
        assert_eq!(total_pages(10, 5), 2);
        assert_eq!(total_pages(1, 5), 1);
        assert_eq!(total_pages(0, 5), 0);
    }

    #[test]
    fn patch_merge_keeps_untouched_fields() {
        let patch = ExperiencePayload {
            offer_received: Some(true),
            ..Default::default()
        };
        let merged = merge_patch(stored_record(), patch, None, None);
        assert!(merged.offer_received);
        assert_eq!(merged.job_title, "Backend Engineer");
        assert_eq!(merged.application_date, date!(2025 - 01 - 01));
    }

    #[test]
    fn moving_application_date_past_stored_decision_date_fails() {
        // Stored decision date is 2025-01-10; only the application date moves.
        let patch = ExperiencePayload {
            application_date: Some("2025-01-15".into()),
            ..Default::default()
        };
        let parsed = parse_iso_date(patch.application_date.as_deref().unwrap()).unwrap();
        let merged = merge_patch(stored_record(), patch, Some(parsed), None);
        assert!(check_date_order(merged.application_date, merged.final_decision_date).is_err());
    }
}
