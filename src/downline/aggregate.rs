use std::collections::{HashMap, HashSet};

use chrono::{Duration, NaiveDate, NaiveDateTime};

use super::filter::{Predicate, Scope, Window};
use crate::models::contributions::Contribution;
use crate::models::reports::{DailyPoint, LevelRow, ProjectSlice, Summary, TopContributor};

pub const TOP_N: usize = 5;

/// Downline totals plus the separately-scoped personal total. The combined
/// total is the sum of the two independently filtered sums; re-querying with a
/// widened scope would double-count a root that is somehow also a member.
pub fn summary(rows: &[Contribution], pred: &Predicate) -> Summary {
    let root_id = pred.tree().root_id();
    let mut count = 0u64;
    let mut total = 0i64;
    let mut contributors: HashSet<&str> = HashSet::new();
    // The downline half never counts the root, even when the request scope is
    // the root itself; the root's rows belong to the personal total.
    for c in rows
        .iter()
        .filter(|c| pred.matches(c) && c.user_id != root_id)
    {
        count += 1;
        total += c.amount_in_cents;
        contributors.insert(&c.user_id);
    }

    let personal = pred.scoped(Scope::RootOnly);
    let personal_total: i64 = rows
        .iter()
        .filter(|c| personal.matches(c))
        .map(|c| c.amount_in_cents)
        .sum();

    Summary {
        downline_count: count,
        downline_total_cents: total,
        downline_average_cents: if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        },
        contributor_count: contributors.len() as u64,
        personal_total_cents: personal_total,
        combined_total_cents: total + personal_total,
    }
}

/// Per-level totals for levels `1..=max_level`. Level-complete: a level that
/// exists in the tree appears even when nothing matched there.
pub fn level_breakdown(rows: &[Contribution], pred: &Predicate) -> Vec<LevelRow> {
    let tree = pred.tree();
    let max_level = tree.max_level() as usize;
    let mut counts = vec![0u64; max_level + 1];
    let mut totals = vec![0i64; max_level + 1];
    let mut contributors: Vec<HashSet<&str>> = vec![HashSet::new(); max_level + 1];

    for c in rows.iter().filter(|c| pred.matches(c)) {
        if let Some(level) = tree.level_of(&c.user_id) {
            let level = level as usize;
            counts[level] += 1;
            totals[level] += c.amount_in_cents;
            contributors[level].insert(&c.user_id);
        }
    }

    (1..=max_level)
        .map(|level| LevelRow {
            level: level as u32,
            count: counts[level],
            total_cents: totals[level],
            contributor_count: contributors[level].len() as u64,
        })
        .collect()
}

/// Top contributors by summed amount. Ties break by most recent contribution,
/// then by user id, so repeated runs order identically.
pub fn top_contributors(rows: &[Contribution], pred: &Predicate) -> Vec<TopContributor> {
    let mut by_user: HashMap<&str, (i64, NaiveDateTime)> = HashMap::new();
    for c in rows.iter().filter(|c| pred.matches(c)) {
        let entry = by_user
            .entry(&c.user_id)
            .or_insert((0, c.created_at));
        entry.0 += c.amount_in_cents;
        entry.1 = entry.1.max(c.created_at);
    }

    let tree = pred.tree();
    let mut ranked: Vec<TopContributor> = by_user
        .into_iter()
        .map(|(user_id, (total, last))| TopContributor {
            display_name: tree
                .node(user_id)
                .map(|n| n.user.display_name.clone())
                .unwrap_or_else(|| user_id.to_string()),
            user_id: user_id.to_string(),
            total_cents: total,
            last_contribution_at: last,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.total_cents
            .cmp(&a.total_cents)
            .then(b.last_contribution_at.cmp(&a.last_contribution_at))
            .then(a.user_id.cmp(&b.user_id))
    });
    ranked.truncate(TOP_N);
    ranked
}

/// Dense daily totals for the axis ending `today`. The axis is generated from
/// the window, never from the rows, so gap days show up as 0 instead of being
/// skipped.
pub fn daily_series(
    rows: &[Contribution],
    pred: &Predicate,
    window: Window,
    today: NaiveDate,
) -> Vec<DailyPoint> {
    let days = window.series_days() as i64;
    let start = today - Duration::days(days - 1);

    let mut totals = vec![0i64; days as usize];
    for c in rows.iter().filter(|c| pred.matches(c)) {
        let offset = (c.created_at.date() - start).num_days();
        if (0..days).contains(&offset) {
            totals[offset as usize] += c.amount_in_cents;
        }
    }

    totals
        .into_iter()
        .enumerate()
        .map(|(i, total_cents)| DailyPoint {
            day: start + Duration::days(i as i64),
            total_cents,
        })
        .collect()
}

/// Per-project totals with share-of-filtered-total percentages. The
/// denominator is this group's own filtered total, not the global one.
pub fn project_distribution(rows: &[Contribution], pred: &Predicate) -> Vec<ProjectSlice> {
    let mut by_project: HashMap<&str, (u64, i64)> = HashMap::new();
    let mut grand_total = 0i64;
    for c in rows.iter().filter(|c| pred.matches(c)) {
        let entry = by_project.entry(&c.project_id).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += c.amount_in_cents;
        grand_total += c.amount_in_cents;
    }

    let mut slices: Vec<ProjectSlice> = by_project
        .into_iter()
        .map(|(project_id, (count, total))| ProjectSlice {
            project_id: project_id.to_string(),
            count,
            total_cents: total,
            share: if grand_total == 0 {
                0.0
            } else {
                total as f64 * 100.0 / grand_total as f64
            },
        })
        .collect();
    slices.sort_by(|a, b| {
        b.total_cents
            .cmp(&a.total_cents)
            .then(a.project_id.cmp(&b.project_id))
    });
    slices
}
