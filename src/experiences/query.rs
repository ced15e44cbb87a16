use sqlx::{Postgres, QueryBuilder};

/// Filter predicates for the experience listing. Construction is pure; the
/// repo pushes the resulting clauses into its builder exactly once, so the
/// same spec drives both the page query and the total count.
#[derive(Debug, Default, Clone)]
pub struct ExperienceFilter {
    pub difficulty: Option<String>,
    pub offer_received: Option<bool>,
    pub search: Option<String>,
}

impl ExperienceFilter {
    /// Appends WHERE clauses for the active predicates. `search` matches any
    /// of job title, company name, or description, case-insensitively.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        let mut prefix = " WHERE ";
        if let Some(difficulty) = &self.difficulty {
            qb.push(prefix)
                .push("e.difficulty = ")
                .push_bind(difficulty.clone());
            prefix = " AND ";
        }
        if let Some(offer) = self.offer_received {
            qb.push(prefix)
                .push("e.offer_received = ")
                .push_bind(offer);
            prefix = " AND ";
        }
        if let Some(search) = &self.search {
            let pattern = format!("%{search}%");
            qb.push(prefix)
                .push("(e.job_title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR e.company_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR e.experience_description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

/// Sort key for the listing. Unknown `sort_by` values fall back to newest
/// first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    DateDesc,
    DateAsc,
    Difficulty,
}

impl SortOrder {
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some("date_asc") => SortOrder::DateAsc,
            Some("difficulty") => SortOrder::Difficulty,
            _ => SortOrder::DateDesc,
        }
    }

    /// ORDER BY fragment. Difficulty ranks Easy, Medium, Hard, then anything
    /// else; ties within one rank are left to the database.
    pub fn order_by(self) -> &'static str {
        match self {
            SortOrder::DateDesc => " ORDER BY e.created_at DESC",
            SortOrder::DateAsc => " ORDER BY e.created_at ASC",
            SortOrder::Difficulty => {
                " ORDER BY CASE e.difficulty \
                 WHEN 'Easy' THEN 1 \
                 WHEN 'Medium' THEN 2 \
                 WHEN 'Hard' THEN 3 \
                 ELSE 4 END"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(filter: &ExperienceFilter) -> String {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM experiences e");
        filter.push_where(&mut qb);
        qb.into_sql()
    }

    #[test]
    fn empty_filter_adds_no_where_clause() {
        let sql = rendered(&ExperienceFilter::default());
        assert_eq!(sql, "SELECT COUNT(*) FROM experiences e");
    }

    #[test]
    fn single_predicate_starts_with_where() {
        let sql = rendered(&ExperienceFilter {
            difficulty: Some("Hard".into()),
            ..Default::default()
        });
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM experiences e WHERE e.difficulty = $1"
        );
    }

    #[test]
    fn combined_predicates_are_anded() {
        let sql = rendered(&ExperienceFilter {
            difficulty: Some("Hard".into()),
            offer_received: Some(true),
            search: Some("rust".into()),
        });
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM experiences e \
             WHERE e.difficulty = $1 AND e.offer_received = $2 \
             AND (e.job_title ILIKE $3 OR e.company_name ILIKE $4 \
             OR e.experience_description ILIKE $5)"
        );
    }

    #[test]
    fn sort_param_parsing_defaults_to_date_desc() {
        assert_eq!(SortOrder::from_param(None), SortOrder::DateDesc);
        assert_eq!(SortOrder::from_param(Some("date_desc")), SortOrder::DateDesc);
        assert_eq!(SortOrder::from_param(Some("date_asc")), SortOrder::DateAsc);
        assert_eq!(
            SortOrder::from_param(Some("difficulty")),
            SortOrder::Difficulty
        );
        assert_eq!(SortOrder::from_param(Some("bogus")), SortOrder::DateDesc);
    }

    #[test]
    fn difficulty_sort_ranks_easy_medium_hard() {
        let clause = SortOrder::Difficulty.order_by();
        let easy = clause.find("'Easy' THEN 1").unwrap();
        let medium = clause.find("'Medium' THEN 2").unwrap();
        let hard = clause.find("'Hard' THEN 3").unwrap();
        assert!(easy < medium && medium < hard);
        assert!(clause.contains("ELSE 4"));
    }
}
