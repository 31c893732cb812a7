use chrono::{Duration, NaiveDate, NaiveDateTime};

use super::tree::DownlineTree;
use crate::models::contributions::Contribution;

/// Reporting time window. Parsing is fail-open: an unknown token means `All`,
/// never an error, so a mangled query string still renders a report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Window {
    Days7,
    Days30,
    Days90,
    OneYear,
    All,
}

impl Window {
    pub fn parse(token: &str) -> Window {
        match token {
            "7d" => Window::Days7,
            "30d" => Window::Days30,
            "90d" => Window::Days90,
            "1y" => Window::OneYear,
            _ => Window::All,
        }
    }

    pub fn days(&self) -> Option<u32> {
        match self {
            Window::Days7 => Some(7),
            Window::Days30 => Some(30),
            Window::Days90 => Some(90),
            Window::OneYear => Some(365),
            Window::All => None,
        }
    }

    /// Span of the dense daily axis. `All` has no natural span and uses the
    /// 30-day default.
    pub fn series_days(&self) -> u32 {
        self.days().unwrap_or(30)
    }

    /// Inclusive lower bound at calendar-day granularity: a 7-day window ending
    /// today starts at midnight six days ago. Computed once per compile, not
    /// per row.
    pub fn cutoff(&self, today: NaiveDate) -> Option<NaiveDateTime> {
        self.days().map(|d| {
            (today - Duration::days(i64::from(d) - 1))
                .and_hms_opt(0, 0, 0)
                .expect("midnight is always a valid time")
        })
    }
}

/// Normalized filter request. Built from raw query strings; "all", empty, and
/// unparseable values all collapse to the unfiltered variant.
#[derive(Clone, Debug)]
pub struct FilterSpec {
    pub period: Window,
    pub member: Option<String>,
    pub project: Option<String>,
}

impl FilterSpec {
    pub fn from_params(period: &str, member: &str, project: &str) -> FilterSpec {
        FilterSpec {
            period: Window::parse(period),
            member: normalize_id(member),
            project: normalize_id(project),
        }
    }

    /// The project half of the fail-open policy. The member id is checked
    /// against the tree in `compile`; the project id has to be checked against
    /// the store, so the caller reports the lookup result here and a miss
    /// collapses the conjunct to "all".
    pub fn normalize_project(&mut self, exists: bool) {
        if !exists {
            self.project = None;
        }
    }
}

fn normalize_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Which contributors a predicate admits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scope {
    /// Every descendant of the root, root itself excluded.
    Downline,
    /// One specific downline member.
    Member(String),
    /// The root user only. Used for the personal total.
    RootOnly,
}

/// One compiled predicate per request, handed to every aggregate and to the
/// pagination pass. No consumer re-derives filtering from raw parameters; that
/// uniformity is the whole point of this type.
#[derive(Clone, Debug)]
pub struct Predicate<'t> {
    tree: &'t DownlineTree,
    since: Option<NaiveDateTime>,
    project: Option<String>,
    scope: Scope,
}

/// Compile a filter against a resolved tree. The member target may name the
/// root itself (personal view), a specific downline member, or nothing; an id
/// that resolves to neither fails open to the all-downline scope.
pub fn compile<'t>(spec: &FilterSpec, tree: &'t DownlineTree, today: NaiveDate) -> Predicate<'t> {
    let scope = match &spec.member {
        Some(id) if tree.is_downline_member(id) => Scope::Member(id.clone()),
        Some(id) if id == tree.root_id() => Scope::RootOnly,
        _ => Scope::Downline,
    };

    Predicate {
        tree,
        since: spec.period.cutoff(today),
        project: spec.project.clone(),
        scope,
    }
}

impl<'t> Predicate<'t> {
    pub fn matches(&self, c: &Contribution) -> bool {
        if let Some(since) = self.since {
            if c.created_at < since {
                return false;
            }
        }
        if let Some(project) = &self.project {
            if &c.project_id != project {
                return false;
            }
        }
        match &self.scope {
            Scope::Downline => self.tree.is_downline_member(&c.user_id),
            Scope::Member(id) => &c.user_id == id,
            Scope::RootOnly => c.user_id == self.tree.root_id(),
        }
    }

    /// Same time and project conjuncts, different scope. The summary uses this
    /// to compute the root-only total under the exact filter every other card
    /// saw.
    pub fn scoped(&self, scope: Scope) -> Predicate<'t> {
        Predicate {
            tree: self.tree,
            since: self.since,
            project: self.project.clone(),
            scope,
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn tree(&self) -> &'t DownlineTree {
        self.tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downline::tree::tests::resolve_fixture;

    fn contribution(user: &str, project: &str, cents: i64, day: NaiveDate) -> Contribution {
        Contribution {
            id: format!("{}-{}", user, cents),
            user_id: user.to_string(),
            project_id: project.to_string(),
            amount_in_cents: cents,
            created_at: day.and_hms_opt(12, 0, 0).unwrap(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_window_parse_fail_open() {
        assert_eq!(Window::parse("7d"), Window::Days7);
        assert_eq!(Window::parse("1y"), Window::OneYear);
        assert_eq!(Window::parse("all"), Window::All);
        assert_eq!(Window::parse("fortnight"), Window::All);
        assert_eq!(Window::parse(""), Window::All);
    }

    #[test]
    fn test_window_cutoff_is_day_granular() {
        let today = date(2026, 3, 10);
        let cutoff = Window::Days7.cutoff(today).unwrap();
        assert_eq!(cutoff, date(2026, 3, 4).and_hms_opt(0, 0, 0).unwrap());
        assert!(Window::All.cutoff(today).is_none());
    }

    #[test]
    fn test_spec_normalization() {
        let spec = FilterSpec::from_params("90d", "ALL", "  ");
        assert_eq!(spec.period, Window::Days90);
        assert!(spec.member.is_none());
        assert!(spec.project.is_none());

        let spec = FilterSpec::from_params("junk", "u-1", "p-1");
        assert_eq!(spec.period, Window::All);
        assert_eq!(spec.member.as_deref(), Some("u-1"));
        assert_eq!(spec.project.as_deref(), Some("p-1"));
    }

    #[tokio::test]
    async fn test_member_outside_tree_fails_open() {
        let tree = resolve_fixture(&[("r", "a")], "r").await;
        let today = date(2026, 3, 10);

        let spec = FilterSpec::from_params("all", "stranger", "all");
        assert_eq!(*compile(&spec, &tree, today).scope(), Scope::Downline);

        // the root's own id selects the personal view
        let spec = FilterSpec::from_params("all", "r", "all");
        assert_eq!(*compile(&spec, &tree, today).scope(), Scope::RootOnly);

        let spec = FilterSpec::from_params("all", "a", "all");
        assert_eq!(
            *compile(&spec, &tree, today).scope(),
            Scope::Member("a".to_string())
        );
    }

    #[tokio::test]
    async fn test_unknown_project_id_fails_open() {
        let tree = resolve_fixture(&[("r", "a")], "r").await;
        let today = date(2026, 3, 10);
        let rows = vec![contribution("a", "p1", 1000, date(2026, 3, 8))];

        // the store found no project for the requested id
        let mut spec = FilterSpec::from_params("all", "all", "ghost");
        spec.normalize_project(false);
        assert!(spec.project.is_none());

        let pred = compile(&spec, &tree, today);
        let s = crate::downline::aggregate::summary(&rows, &pred);
        assert_eq!(s.downline_total_cents, 1000);

        // a project id the store did resolve keeps filtering
        let mut spec = FilterSpec::from_params("all", "all", "p2");
        spec.normalize_project(true);
        let pred = compile(&spec, &tree, today);
        let s = crate::downline::aggregate::summary(&rows, &pred);
        assert_eq!(s.downline_total_cents, 0);
    }

    #[tokio::test]
    async fn test_predicate_conjunction() {
        let tree = resolve_fixture(&[("r", "a"), ("a", "c")], "r").await;
        let today = date(2026, 3, 10);
        let spec = FilterSpec::from_params("7d", "all", "p1");
        let pred = compile(&spec, &tree, today);

        // in window, in project, downline member
        assert!(pred.matches(&contribution("a", "p1", 100, date(2026, 3, 8))));
        // root excluded from downline scope
        assert!(!pred.matches(&contribution("r", "p1", 100, date(2026, 3, 8))));
        // wrong project
        assert!(!pred.matches(&contribution("a", "p2", 100, date(2026, 3, 8))));
        // too old
        assert!(!pred.matches(&contribution("a", "p1", 100, date(2026, 2, 1))));
        // outside the tree entirely
        assert!(!pred.matches(&contribution("x", "p1", 100, date(2026, 3, 8))));
    }

    #[tokio::test]
    async fn test_scoped_keeps_other_conjuncts() {
        let tree = resolve_fixture(&[("r", "a")], "r").await;
        let today = date(2026, 3, 10);
        let pred = compile(&FilterSpec::from_params("7d", "all", "p1"), &tree, today);
        let personal = pred.scoped(Scope::RootOnly);

        assert!(personal.matches(&contribution("r", "p1", 100, date(2026, 3, 9))));
        // project and time conjuncts still apply
        assert!(!personal.matches(&contribution("r", "p2", 100, date(2026, 3, 9))));
        assert!(!personal.matches(&contribution("r", "p1", 100, date(2026, 1, 1))));
        // scope swapped: downline member no longer admitted
        assert!(!personal.matches(&contribution("a", "p1", 100, date(2026, 3, 9))));
    }
}
