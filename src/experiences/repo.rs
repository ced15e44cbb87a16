use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use time::{Date, OffsetDateTime};

use crate::experiences::query::{ExperienceFilter, SortOrder};

/// Experience row, always joined with its author's username.
#[derive(Debug, Clone, FromRow)]
pub struct ExperienceRecord {
    pub id: i32,
    pub job_title: String,
    pub company_name: String,
    pub experience_description: String,
    pub difficulty: String,
    pub offer_received: bool,
    pub application_date: Date,
    pub final_decision_date: Date,
    pub user_id: i32,
    pub created_at: OffsetDateTime,
    pub author_username: String,
}

/// Field values for a fully validated experience, used for both insert and
/// the merged result of a partial update.
#[derive(Debug, Clone)]
pub struct ExperienceValues {
    pub job_title: String,
    pub company_name: String,
    pub experience_description: String,
    pub difficulty: String,
    pub offer_received: bool,
    pub application_date: Date,
    pub final_decision_date: Date,
}

pub async fn fetch_by_id(db: &PgPool, id: i32) -> sqlx::Result<Option<ExperienceRecord>> {
    sqlx::query_as::<_, ExperienceRecord>(
        r#"
        SELECT e.id, e.job_title, e.company_name, e.experience_description,
               e.difficulty, e.offer_received, e.application_date,
               e.final_decision_date, e.user_id, e.created_at,
               u.username AS author_username
        FROM experiences e
        JOIN users u ON u.id = e.user_id
        WHERE e.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Same as `fetch_by_id` but inside a transaction, locking the row so the
/// merge-validate-write cycle of an update cannot race a concurrent writer.
pub async fn fetch_by_id_for_update(
    tx: &mut Transaction<'_, Postgres>,
    id: i32,
) -> sqlx::Result<Option<ExperienceRecord>> {
    sqlx::query_as::<_, ExperienceRecord>(
        r#"
        SELECT e.id, e.job_title, e.company_name, e.experience_description,
               e.difficulty, e.offer_received, e.application_date,
               e.final_decision_date, e.user_id, e.created_at,
               u.username AS author_username
        FROM experiences e
        JOIN users u ON u.id = e.user_id
        WHERE e.id = $1
        FOR UPDATE OF e
        "#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn insert(
    db: &PgPool,
    user_id: i32,
    values: &ExperienceValues,
) -> sqlx::Result<ExperienceRecord> {
    sqlx::query_as::<_, ExperienceRecord>(
        r#"
        WITH inserted AS (
            INSERT INTO experiences
                (job_title, company_name, experience_description, difficulty,
                 offer_received, application_date, final_decision_date, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
        )
        SELECT e.id, e.job_title, e.company_name, e.experience_description,
               e.difficulty, e.offer_received, e.application_date,
               e.final_decision_date, e.user_id, e.created_at,
               u.username AS author_username
        FROM inserted e
        JOIN users u ON u.id = e.user_id
        "#,
    )
    .bind(&values.job_title)
    .bind(&values.company_name)
    .bind(&values.experience_description)
    .bind(&values.difficulty)
    .bind(values.offer_received)
    .bind(values.application_date)
    .bind(values.final_decision_date)
    .bind(user_id)
    .fetch_one(db)
    .await
}

pub async fn update(
    tx: &mut Transaction<'_, Postgres>,
    id: i32,
    values: &ExperienceValues,
) -> sqlx::Result<ExperienceRecord> {
    sqlx::query_as::<_, ExperienceRecord>(
        r#"
        WITH updated AS (
            UPDATE experiences
            SET job_title = $2, company_name = $3, experience_description = $4,
                difficulty = $5, offer_received = $6, application_date = $7,
                final_decision_date = $8
            WHERE id = $1
            RETURNING *
        )
        SELECT e.id, e.job_title, e.company_name, e.experience_description,
               e.difficulty, e.offer_received, e.application_date,
               e.final_decision_date, e.user_id, e.created_at,
               u.username AS author_username
        FROM updated e
        JOIN users u ON u.id = e.user_id
        "#,
    )
    .bind(id)
    .bind(&values.job_title)
    .bind(&values.company_name)
    .bind(&values.experience_description)
    .bind(&values.difficulty)
    .bind(values.offer_received)
    .bind(values.application_date)
    .bind(values.final_decision_date)
    .fetch_one(&mut **tx)
    .await
}

pub async fn delete(db: &PgPool, id: i32) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM experiences WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}

pub async fn list(
    db: &PgPool,
    filter: &ExperienceFilter,
    sort: SortOrder,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<ExperienceRecord>> {
    let mut qb = QueryBuilder::new(
        "SELECT e.id, e.job_title, e.company_name, e.experience_description, \
         e.difficulty, e.offer_received, e.application_date, \
         e.final_decision_date, e.user_id, e.created_at, \
         u.username AS author_username \
         FROM experiences e JOIN users u ON u.id = e.user_id",
    );
    filter.push_where(&mut qb);
    qb.push(sort.order_by());
    qb.push(" LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    qb.build_query_as::<ExperienceRecord>().fetch_all(db).await
}

pub async fn count(db: &PgPool, filter: &ExperienceFilter) -> sqlx::Result<i64> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM experiences e");
    filter.push_where(&mut qb);
    qb.build_query_scalar::<i64>().fetch_one(db).await
}
