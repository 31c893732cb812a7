use std::collections::HashMap;

use async_trait::async_trait;

use crate::models::users::User;

/// Bounds on a single downline traversal. The parent-pointer graph is expected
/// to be acyclic and shallow; these stop a malformed graph from hanging the
/// request. Exceeding a bound is a structural-integrity fault: logged, traversal
/// truncated, request still served.
#[derive(Clone, Copy, Debug)]
pub struct TraversalLimits {
    pub max_depth: u32,
    pub max_nodes: usize,
}

impl Default for TraversalLimits {
    fn default() -> Self {
        TraversalLimits {
            max_depth: 32,
            max_nodes: 10_000,
        }
    }
}

/// Source of child users for one parent. Implemented by `UserRepository` in
/// production and by in-memory fixtures in tests.
#[async_trait]
pub trait ChildSource: Send + Sync {
    async fn children_of(&self, parent_id: &str) -> Result<Vec<User>, anyhow::Error>;
}

#[derive(Clone, Debug)]
pub struct DownlineNode {
    pub user: User,
    /// Distance in referral edges from the root; root = 0.
    pub level: u32,
    /// Ancestor id list root -> this node, root's own id included.
    pub path: Vec<String>,
    pub children: Vec<String>,
}

/// Materialized downline of one root user, rebuilt per report request.
/// An arena of nodes indexed by id; no node holds a reference to another.
#[derive(Clone, Debug)]
pub struct DownlineTree {
    root_id: String,
    nodes: HashMap<String, DownlineNode>,
    max_level: u32,
}

/// Materialize the full downline of `root`, one level per round. Children whose
/// id already appears on the path from the root (a cycle) or that were already
/// placed under another parent are skipped with a warning instead of looping.
pub async fn resolve<S>(
    root: User,
    source: &S,
    limits: &TraversalLimits,
) -> Result<DownlineTree, anyhow::Error>
where
    S: ChildSource + ?Sized,
{
    let root_id = root.id.clone();
    let mut nodes: HashMap<String, DownlineNode> = HashMap::new();
    nodes.insert(
        root_id.clone(),
        DownlineNode {
            level: 0,
            path: vec![root_id.clone()],
            children: Vec::new(),
            user: root,
        },
    );

    let mut frontier = vec![root_id.clone()];
    let mut max_level = 0u32;
    let mut truncated = false;

    'levels: while !frontier.is_empty() {
        let parent_level = nodes[&frontier[0]].level;
        if parent_level >= limits.max_depth {
            log::warn!(
                "Downline of {} exceeds max depth {}; truncating traversal",
                root_id,
                limits.max_depth
            );
            truncated = true;
            break;
        }

        let mut next = Vec::new();
        for parent_id in frontier {
            let children = source.children_of(&parent_id).await?;
            let (parent_path, child_level) = {
                let parent = &nodes[&parent_id];
                (parent.path.clone(), parent.level + 1)
            };

            for child in children {
                if parent_path.contains(&child.id) {
                    log::warn!(
                        "Cycle in referral graph: {} already on path to {}; dropping edge",
                        child.id,
                        parent_id
                    );
                    continue;
                }
                if nodes.contains_key(&child.id) {
                    log::warn!(
                        "User {} reachable through multiple parents; keeping first placement",
                        child.id
                    );
                    continue;
                }
                if nodes.len() >= limits.max_nodes {
                    log::warn!(
                        "Downline of {} exceeds max node count {}; truncating traversal",
                        root_id,
                        limits.max_nodes
                    );
                    truncated = true;
                    break 'levels;
                }

                let mut path = parent_path.clone();
                path.push(child.id.clone());
                let child_id = child.id.clone();
                nodes.insert(
                    child_id.clone(),
                    DownlineNode {
                        level: child_level,
                        path,
                        children: Vec::new(),
                        user: child,
                    },
                );
                if let Some(parent) = nodes.get_mut(&parent_id) {
                    parent.children.push(child_id.clone());
                }
                max_level = max_level.max(child_level);
                next.push(child_id);
            }
        }
        frontier = next;
    }

    if truncated {
        log::warn!(
            "Downline of {} served partially ({} nodes)",
            root_id,
            nodes.len()
        );
    }

    Ok(DownlineTree {
        root_id,
        nodes,
        max_level,
    })
}

impl DownlineTree {
    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    /// True if `id` is the root or any of its descendants.
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// True if `id` is a descendant of the root (root itself excluded).
    pub fn is_downline_member(&self, id: &str) -> bool {
        id != self.root_id && self.nodes.contains_key(id)
    }

    pub fn level_of(&self, id: &str) -> Option<u32> {
        self.nodes.get(id).map(|n| n.level)
    }

    pub fn node(&self, id: &str) -> Option<&DownlineNode> {
        self.nodes.get(id)
    }

    /// Deepest level with at least one member. 0 for a tree with no downline.
    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    /// Number of downline members, root excluded.
    pub fn member_count(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Ids of every node in the tree, root included. Used for the one broad
    /// contribution fetch per report.
    pub fn all_ids(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    /// Fail-safe focus: the requested id is honored only when it sits inside
    /// this tree; anything else silently resets to the root. Never an error,
    /// so out-of-scope probes learn nothing about which ids exist.
    pub fn focus_or_root<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        match requested {
            Some(id) if self.contains(id) => id,
            _ => &self.root_id,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn fixture_user(id: &str, referred_by: Option<&str>) -> User {
        let ts = chrono::NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        User {
            id: id.to_string(),
            display_name: id.to_uppercase(),
            referred_by: referred_by.map(str::to_string),
            referral_code: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    /// In-memory parent -> children map standing in for the store.
    pub(crate) struct MapSource(pub HashMap<String, Vec<User>>);

    impl MapSource {
        pub(crate) fn from_edges(edges: &[(&str, &str)]) -> Self {
            let mut map: HashMap<String, Vec<User>> = HashMap::new();
            for (parent, child) in edges {
                map.entry(parent.to_string())
                    .or_default()
                    .push(fixture_user(child, Some(parent)));
            }
            MapSource(map)
        }
    }

    #[async_trait]
    impl ChildSource for MapSource {
        async fn children_of(&self, parent_id: &str) -> Result<Vec<User>, anyhow::Error> {
            Ok(self.0.get(parent_id).cloned().unwrap_or_default())
        }
    }

    pub(crate) async fn resolve_fixture(edges: &[(&str, &str)], root: &str) -> DownlineTree {
        let source = MapSource::from_edges(edges);
        resolve(
            fixture_user(root, None),
            &source,
            &TraversalLimits::default(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_levels_and_paths() {
        let tree = resolve_fixture(
            &[("r", "a"), ("r", "b"), ("a", "c"), ("c", "d")],
            "r",
        )
        .await;

        assert_eq!(tree.level_of("r"), Some(0));
        assert_eq!(tree.level_of("a"), Some(1));
        assert_eq!(tree.level_of("b"), Some(1));
        assert_eq!(tree.level_of("c"), Some(2));
        assert_eq!(tree.level_of("d"), Some(3));
        assert_eq!(tree.max_level(), 3);
        assert_eq!(tree.member_count(), 4);

        let mut root_children = tree.node("r").unwrap().children.clone();
        root_children.sort();
        assert_eq!(root_children, vec!["a", "b"]);

        // path length == level + 1, and every path starts at the root
        for id in ["r", "a", "b", "c", "d"] {
            let node = tree.node(id).unwrap();
            assert_eq!(node.path.len() as u32, node.level + 1);
            assert_eq!(node.path[0], "r");
            assert_eq!(node.path.last().unwrap(), id);
        }
    }

    #[tokio::test]
    async fn test_cycle_is_dropped_not_looped() {
        // a refers c, c "refers" r: the c -> r edge closes a cycle
        let tree = resolve_fixture(&[("r", "a"), ("a", "c"), ("c", "r")], "r").await;

        assert_eq!(tree.member_count(), 2);
        assert_eq!(tree.level_of("r"), Some(0));
        assert_eq!(tree.level_of("c"), Some(2));
    }

    #[tokio::test]
    async fn test_depth_bound_truncates() {
        let edges: Vec<(String, String)> = (0..10)
            .map(|i| (format!("u{}", i), format!("u{}", i + 1)))
            .collect();
        let borrowed: Vec<(&str, &str)> = edges
            .iter()
            .map(|(a, b)| (a.as_str(), b.as_str()))
            .collect();
        let source = MapSource::from_edges(&borrowed);
        let limits = TraversalLimits {
            max_depth: 3,
            max_nodes: 10_000,
        };
        let tree = resolve(fixture_user("u0", None), &source, &limits)
            .await
            .unwrap();

        assert_eq!(tree.max_level(), 3);
        assert!(tree.contains("u3"));
        assert!(!tree.contains("u4"));
    }

    #[tokio::test]
    async fn test_node_bound_truncates() {
        let tree = {
            let source = MapSource::from_edges(&[("r", "a"), ("r", "b"), ("r", "c")]);
            resolve(
                fixture_user("r", None),
                &source,
                &TraversalLimits {
                    max_depth: 32,
                    max_nodes: 3,
                },
            )
            .await
            .unwrap()
        };
        // root + two children fit the bound, the third child is dropped
        assert_eq!(tree.member_count(), 2);
    }

    #[tokio::test]
    async fn test_focus_fail_safe() {
        let tree = resolve_fixture(&[("r", "a"), ("a", "c")], "r").await;

        assert_eq!(tree.focus_or_root(Some("c")), "c");
        assert_eq!(tree.focus_or_root(Some("r")), "r");
        assert_eq!(tree.focus_or_root(Some("stranger")), "r");
        assert_eq!(tree.focus_or_root(None), "r");
    }

    #[tokio::test]
    async fn test_membership_excludes_root_from_downline() {
        let tree = resolve_fixture(&[("r", "a")], "r").await;

        assert!(tree.contains("r"));
        assert!(!tree.is_downline_member("r"));
        assert!(tree.is_downline_member("a"));
        assert!(!tree.is_downline_member("nobody"));
    }
}
