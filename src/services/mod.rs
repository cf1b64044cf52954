//! Query and mutation logic for each resource. Handlers call into these
//! services through [`crate::handlers::AppServices`].

pub mod activity_log;
pub mod customers;
pub mod exports;
pub mod orders;
pub mod products;
pub mod users;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use sea_orm::sea_query::{Expr, Func, IntoColumnRef, LikeExpr, SimpleExpr};

const LIKE_ESCAPE: char = '\\';

/// `%term%` with LIKE wildcards in `term` taken literally.
fn substring_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.trim().to_lowercase().chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Case-insensitive substring match on a column.
pub(crate) fn contains_ci(col: impl IntoColumnRef, term: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(col)))
        .like(LikeExpr::new(substring_pattern(term)).escape(LIKE_ESCAPE))
}

/// Returns the trimmed value, or `None` when it is empty.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Owned variant of [`non_empty`] for request payload fields.
pub(crate) fn clean(value: Option<String>) -> Option<String> {
    non_empty(value.as_deref()).map(str::to_string)
}

/// Start of the given UTC day.
pub(crate) fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Start of the UTC day after `date`; used as an exclusive upper bound so
/// `date_to` covers the whole day.
pub(crate) fn day_end_exclusive(date: NaiveDate) -> DateTime<Utc> {
    let next = date.checked_add_days(Days::new(1)).unwrap_or(date);
    day_start(next)
}

/// Page window clamped to the configured limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    pub fn new(page: Option<u64>, per_page: Option<u64>, default_size: u64, max_size: u64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(default_size).clamp(1, max_size.max(1)),
        }
    }

    /// Zero-based page index as expected by the ORM paginator
    pub fn index(&self) -> u64 {
        self.page - 1
    }
}
