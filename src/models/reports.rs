use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::contributions::Contribution;

/// Raw query parameters of a report request. Everything parses fail-open:
/// unknown tokens fall back to their "all" variant so a report always renders.
#[derive(Clone, Debug, Deserialize)]
pub struct ReportParams {
    #[serde(default = "default_all")]
    pub period: String,
    #[serde(default = "default_all")]
    pub member: String,
    #[serde(default = "default_all")]
    pub project: String,
    /// Re-root the view at a node inside the caller's own downline.
    #[serde(default)]
    pub focus: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
}

fn default_all() -> String {
    "all".to_string()
}

fn default_page() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Summary {
    pub downline_count: u64,
    pub downline_total_cents: i64,
    pub downline_average_cents: f64,
    pub contributor_count: u64,
    pub personal_total_cents: i64,
    /// Always `personal + downline`, never a re-query with a looser scope.
    pub combined_total_cents: i64,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct LevelRow {
    pub level: u32,
    pub count: u64,
    pub total_cents: i64,
    pub contributor_count: u64,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct TopContributor {
    pub user_id: String,
    pub display_name: String,
    pub total_cents: i64,
    pub last_contribution_at: NaiveDateTime,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct DailyPoint {
    pub day: NaiveDate,
    pub total_cents: i64,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ProjectSlice {
    pub project_id: String,
    pub count: u64,
    pub total_cents: i64,
    /// Percentage of the filtered total, not of the unfiltered global total.
    pub share: f64,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ContributionPage {
    pub items: Vec<Contribution>,
    pub total_count: u64,
    pub total_pages: u32,
    pub page: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub root_user_id: String,
    pub summary: Summary,
    pub levels: Vec<LevelRow>,
    pub top_contributors: Vec<TopContributor>,
    pub daily: Vec<DailyPoint>,
    pub projects: Vec<ProjectSlice>,
    pub page: ContributionPage,
}

/// Render integer cents as a 2-decimal string. Rounding happens here and only
/// here; every sum upstream stays in exact cents.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(4500), "45.00");
        assert_eq!(format_cents(123456), "1234.56");
        assert_eq!(format_cents(-250), "-2.50");
    }
}
