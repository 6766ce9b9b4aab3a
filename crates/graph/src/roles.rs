use crate::error::{GraphError, Result};
use crate::types::{Graph, GroupId, Role};
use petgraph::graphmap::UnGraphMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;

const DEFAULT_FILE_PREFIX: &str = "file_name_";
const DEFAULT_CHUNK_PREFIX: &str = "chunk_id_";
const DEFAULT_MEDIA_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "mkv", "avi", "webm", "m4v", "mpg", "mpeg", "wmv", "flv", "mp3", "wav", "flac",
    "aac", "m4a", "ogg", "opus", "jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp",
];

/// Id conventions used by the naming tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamingRules {
    /// Ids starting with this prefix are file-like
    pub file_prefix: String,

    /// Ids starting with this prefix are chunk-like
    pub chunk_prefix: String,

    /// Ids ending in `.<ext>` (any case) are file-like
    pub media_extensions: Vec<String>,
}

impl Default for NamingRules {
    fn default() -> Self {
        Self {
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            chunk_prefix: DEFAULT_CHUNK_PREFIX.to_string(),
            media_extensions: DEFAULT_MEDIA_EXTENSIONS
                .iter()
                .map(|ext| (*ext).to_string())
                .collect(),
        }
    }
}

/// Caller-supplied ground truth for either role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleHints {
    pub file_group: Option<GroupId>,
    pub chunk_group: Option<GroupId>,
}

impl RoleHints {
    pub fn new(file_group: Option<GroupId>, chunk_group: Option<GroupId>) -> Self {
        Self {
            file_group,
            chunk_group,
        }
    }
}

/// How a role was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evidence {
    Hint,
    Name,
    Structure,
    /// Fewer than two groups in the graph
    Degenerate,
}

/// The two distinguished groups; every other group is a feature group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub file_group: GroupId,
    pub chunk_group: GroupId,
    pub file_evidence: Evidence,
    pub chunk_evidence: Evidence,
}

impl RoleAssignment {
    /// Assignment taken verbatim from the caller
    pub fn new(file_group: GroupId, chunk_group: GroupId) -> Self {
        Self {
            file_group,
            chunk_group,
            file_evidence: Evidence::Hint,
            chunk_evidence: Evidence::Hint,
        }
    }

    /// Whether nodes of `file_group` act as files.
    ///
    /// A structural file guess is nominal when the chunk group was identified
    /// by name or hint: the graph follows a naming convention but has no
    /// file-like ids, so that group holds features.
    #[must_use]
    pub fn file_role_active(&self) -> bool {
        !(self.file_evidence == Evidence::Structure
            && matches!(self.chunk_evidence, Evidence::Hint | Evidence::Name))
    }

    /// Role of a group. The chunk role takes precedence when both groups coincide.
    #[must_use]
    pub fn role_of(&self, group: GroupId) -> Role {
        if group == self.chunk_group {
            Role::Chunk
        } else if group == self.file_group && self.file_role_active() {
            Role::File
        } else {
            Role::Feature
        }
    }
}

/// Infers file and chunk groups from hints, id conventions and link structure
#[derive(Debug, Clone)]
pub struct RoleDetector {
    file_prefix: String,
    chunk_prefix: String,
    media: Option<Regex>,
}

impl RoleDetector {
    pub fn new(rules: &NamingRules) -> Result<Self> {
        let extensions: Vec<String> = rules
            .media_extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.'))
            .filter(|ext| !ext.is_empty())
            .map(regex::escape)
            .collect();

        let media = if extensions.is_empty() {
            None
        } else {
            let pattern = format!(r"(?i)\.(?:{})$", extensions.join("|"));
            Some(Regex::new(&pattern).map_err(|e| GraphError::InvalidRules(e.to_string()))?)
        };

        Ok(Self {
            file_prefix: rules.file_prefix.clone(),
            chunk_prefix: rules.chunk_prefix.clone(),
            media,
        })
    }

    pub fn is_file_like(&self, id: &str) -> bool {
        (!self.file_prefix.is_empty() && id.starts_with(&self.file_prefix))
            || self.media.as_ref().is_some_and(|re| re.is_match(id))
    }

    pub fn is_chunk_like(&self, id: &str) -> bool {
        !self.chunk_prefix.is_empty() && id.starts_with(&self.chunk_prefix)
    }

    /// Decide file and chunk groups.
    ///
    /// Tiers: both hints win outright; otherwise a single hint pins its role,
    /// id conventions fill what they can (file-like checked first, chunk-like
    /// only among the other groups), and link structure resolves the rest.
    /// All ties go to the group encountered first among the nodes.
    pub fn detect(&self, graph: &Graph, hints: RoleHints) -> RoleAssignment {
        if let (Some(file_group), Some(chunk_group)) = (hints.file_group, hints.chunk_group) {
            return RoleAssignment::new(file_group, chunk_group);
        }

        let groups = graph.groups();
        let mut file = hints.file_group.map(|g| (g, Evidence::Hint));
        let mut chunk = hints.chunk_group.map(|g| (g, Evidence::Hint));

        if groups.len() < 2 {
            let only = groups.first().copied().unwrap_or(0);
            let (file_group, file_evidence) = file.unwrap_or((only, Evidence::Degenerate));
            let (chunk_group, chunk_evidence) = chunk.unwrap_or((only, Evidence::Degenerate));
            return RoleAssignment {
                file_group,
                chunk_group,
                file_evidence,
                chunk_evidence,
            };
        }

        let ids = graph.ids_by_group();
        let named = |group: &GroupId, pred: &dyn Fn(&str) -> bool| {
            ids.get(group)
                .is_some_and(|members| members.iter().any(|id| pred(id)))
        };

        if file.is_none() {
            let pinned_chunk = chunk.map(|(g, _)| g);
            file = groups
                .iter()
                .filter(|g| Some(**g) != pinned_chunk)
                .find(|g| named(g, &|id: &str| self.is_file_like(id)))
                .map(|g| (*g, Evidence::Name));
        }
        if chunk.is_none() {
            let pinned_file = file.map(|(g, _)| g);
            chunk = groups
                .iter()
                .filter(|g| Some(**g) != pinned_file)
                .find(|g| named(g, &|id: &str| self.is_chunk_like(id)))
                .map(|g| (*g, Evidence::Name));
        }

        if file.is_none() || chunk.is_none() {
            let degree = group_degrees(graph);
            let degree_of = |g: &GroupId| degree.get(g).copied().unwrap_or(0);

            if chunk.is_none() {
                let pinned_file = file.map(|(g, _)| g);
                chunk = groups
                    .iter()
                    .filter(|g| Some(**g) != pinned_file)
                    .min_by_key(|g| Reverse(degree_of(g)))
                    .map(|g| (*g, Evidence::Structure));
            }
            if file.is_none() {
                let pinned_chunk = chunk.map(|(g, _)| g);
                file = groups
                    .iter()
                    .filter(|g| Some(**g) != pinned_chunk)
                    .min_by_key(|g| degree_of(g))
                    .map(|g| (*g, Evidence::Structure));
            }
        }

        // Both roles are resolved here: at least two groups exist and each
        // structural pick excludes at most one of them.
        let first = groups[0];
        let (file_group, file_evidence) = file.unwrap_or((first, Evidence::Degenerate));
        let (chunk_group, chunk_evidence) = chunk.unwrap_or((first, Evidence::Degenerate));

        RoleAssignment {
            file_group,
            chunk_group,
            file_evidence,
            chunk_evidence,
        }
    }
}

impl Default for RoleDetector {
    fn default() -> Self {
        Self::new(&NamingRules::default()).expect("default naming rules compile")
    }
}

/// Number of distinct other groups each group links to.
///
/// Same-group links and links with an unknown endpoint are ignored.
fn group_degrees(graph: &Graph) -> HashMap<GroupId, usize> {
    let group_of = graph.group_index();
    let mut adjacency: UnGraphMap<GroupId, ()> = UnGraphMap::new();

    for link in &graph.links {
        let (Some(&gs), Some(&gt)) = (
            group_of.get(link.source.as_str()),
            group_of.get(link.target.as_str()),
        ) else {
            continue;
        };
        if gs == gt {
            continue;
        }
        adjacency.add_edge(gs, gt, ());
    }

    adjacency
        .nodes()
        .map(|g| (g, adjacency.neighbors(g).count()))
        .collect()
}

/// Detect roles with the default naming rules
pub fn detect_roles(graph: &Graph, hints: RoleHints) -> RoleAssignment {
    RoleDetector::default().detect(graph, hints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Link, Node};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn graph(nodes: &[(&str, GroupId)], links: &[(&str, &str)]) -> Graph {
        Graph::new(
            nodes.iter().map(|(id, g)| Node::new(*id, *g)).collect(),
            links.iter().map(|(s, t)| Link::new(*s, *t)).collect(),
        )
    }

    #[test]
    fn both_hints_are_returned_verbatim() {
        let g = graph(&[("chunk_id_1", 1), ("file_name_a", 0)], &[]);
        let roles = detect_roles(&g, RoleHints::new(Some(42), Some(42)));
        assert_eq!(roles, RoleAssignment::new(42, 42));
    }

    #[test]
    fn naming_identifies_both_roles() {
        let g = graph(
            &[
                ("topic:a", 5),
                ("file_name_x", 0),
                ("chunk_id_1", 3),
                ("chunk_id_2", 3),
            ],
            &[],
        );
        let roles = detect_roles(&g, RoleHints::default());
        assert_eq!((roles.file_group, roles.chunk_group), (0, 3));
        assert_eq!(roles.file_evidence, Evidence::Name);
        assert_eq!(roles.chunk_evidence, Evidence::Name);
        assert!(roles.file_role_active());
    }

    #[test]
    fn media_extension_is_file_like_in_any_case() {
        let detector = RoleDetector::default();
        assert!(detector.is_file_like("interview_01.MP4"));
        assert!(detector.is_file_like("file_name_notes"));
        assert!(!detector.is_file_like("mp4"));
        assert!(!detector.is_file_like("chunk_id_3"));
    }

    #[test]
    fn first_named_group_wins() {
        let g = graph(
            &[
                ("chunk_id_a", 4),
                ("file_name_a", 2),
                ("chunk_id_b", 1),
                ("file_name_b", 9),
            ],
            &[],
        );
        let roles = detect_roles(&g, RoleHints::default());
        assert_eq!((roles.file_group, roles.chunk_group), (2, 4));
    }

    #[test]
    fn file_like_wins_when_one_group_matches_both() {
        let g = graph(
            &[
                ("file_name_a", 0),
                ("chunk_id_a", 0),
                ("chunk_id_b", 1),
                ("feat", 2),
            ],
            &[],
        );
        let roles = detect_roles(&g, RoleHints::default());
        assert_eq!((roles.file_group, roles.chunk_group), (0, 1));
    }

    #[test]
    fn chunk_names_without_file_names_leave_file_group_nominal() {
        let g = graph(
            &[
                ("A", 0),
                ("B", 0),
                ("chunk_id_1", 1),
                ("chunk_id_2", 1),
            ],
            &[("A", "chunk_id_1"), ("B", "chunk_id_2")],
        );
        let roles = detect_roles(&g, RoleHints::default());
        assert_eq!((roles.file_group, roles.chunk_group), (0, 1));
        assert_eq!(roles.chunk_evidence, Evidence::Name);
        assert_eq!(roles.file_evidence, Evidence::Structure);
        assert!(!roles.file_role_active());
        assert_eq!(roles.role_of(0), Role::Feature);
        assert_eq!(roles.role_of(1), Role::Chunk);
    }

    #[test]
    fn file_names_without_chunk_names_use_structure_for_chunks() {
        let g = graph(
            &[
                ("talk.mov", 0),
                ("x", 1),
                ("y", 2),
                ("z", 2),
            ],
            &[("talk.mov", "x"), ("y", "x"), ("z", "x")],
        );
        let roles = detect_roles(&g, RoleHints::default());
        assert_eq!((roles.file_group, roles.chunk_group), (0, 1));
        assert_eq!(roles.chunk_evidence, Evidence::Structure);
        assert!(roles.file_role_active());
    }

    #[test]
    fn structure_picks_hub_as_chunks_and_leaf_as_files() {
        let g = graph(
            &[
                ("f", 1),
                ("c1", 2),
                ("c2", 2),
                ("t1", 10),
                ("t2", 11),
            ],
            &[
                ("f", "c1"),
                ("t1", "c1"),
                ("t2", "c2"),
                ("t1", "t2"),
                ("c1", "c2"),
            ],
        );
        let roles = detect_roles(&g, RoleHints::default());
        assert_eq!((roles.file_group, roles.chunk_group), (1, 2));
        assert_eq!(roles.file_evidence, Evidence::Structure);
        assert_eq!(roles.chunk_evidence, Evidence::Structure);
        assert!(roles.file_role_active());
    }

    #[test]
    fn structure_without_links_uses_encounter_order() {
        let g = graph(&[("a", 8), ("b", 3), ("c", 5)], &[]);
        let roles = detect_roles(&g, RoleHints::default());
        assert_eq!((roles.chunk_group, roles.file_group), (8, 3));
    }

    #[test]
    fn dangling_and_same_group_links_do_not_count() {
        let g = graph(
            &[("a", 0), ("b", 0), ("c", 1), ("d", 2)],
            &[("a", "b"), ("a", "ghost"), ("ghost", "c"), ("d", "c")],
        );
        let roles = detect_roles(&g, RoleHints::default());
        // degrees: 0 -> 0, 1 -> 1, 2 -> 1
        assert_eq!(roles.chunk_group, 1);
        assert_eq!(roles.file_group, 0);
    }

    #[test]
    fn single_hint_pins_its_role() {
        let g = graph(
            &[("file_name_a", 0), ("x", 1), ("chunk_id_1", 2)],
            &[],
        );
        let roles = detect_roles(&g, RoleHints::new(None, Some(1)));
        assert_eq!((roles.file_group, roles.chunk_group), (0, 1));
        assert_eq!(roles.chunk_evidence, Evidence::Hint);
        assert_eq!(roles.file_evidence, Evidence::Name);

        let roles = detect_roles(&g, RoleHints::new(Some(2), None));
        assert_eq!(roles.file_group, 2);
        assert_ne!(roles.chunk_group, 2);
    }

    #[test]
    fn single_group_degenerates_to_all_chunks() {
        let g = graph(&[("a", 4), ("b", 4)], &[("a", "b")]);
        let roles = detect_roles(&g, RoleHints::default());
        assert_eq!((roles.file_group, roles.chunk_group), (4, 4));
        assert_eq!(roles.chunk_evidence, Evidence::Degenerate);
        assert_eq!(roles.role_of(4), Role::Chunk);

        let empty = detect_roles(&Graph::default(), RoleHints::default());
        assert_eq!((empty.file_group, empty.chunk_group), (0, 0));
    }

    #[test]
    fn custom_rules_replace_defaults() {
        let rules = NamingRules {
            file_prefix: "doc:".to_string(),
            chunk_prefix: "seg:".to_string(),
            media_extensions: vec![".PDF".to_string()],
        };
        let detector = RoleDetector::new(&rules).unwrap();
        assert!(detector.is_file_like("report.pdf"));
        assert!(detector.is_file_like("doc:1"));
        assert!(!detector.is_file_like("clip.mp4"));
        assert!(detector.is_chunk_like("seg:9"));
        assert!(!detector.is_chunk_like("chunk_id_9"));
    }

    fn arb_graph() -> impl Strategy<Value = Graph> {
        (
            prop::collection::vec(0i64..5, 2..24),
            prop::collection::vec((0usize..30, 0usize..30), 0..40),
        )
            .prop_map(|(groups, pairs)| {
                let nodes: Vec<Node> = groups
                    .iter()
                    .enumerate()
                    .map(|(i, g)| Node::new(format!("n{i}"), *g))
                    .collect();
                let links = pairs
                    .into_iter()
                    .map(|(s, t)| Link::new(format!("n{s}"), format!("n{t}")))
                    .collect();
                Graph::new(nodes, links)
            })
    }

    proptest! {
        #[test]
        fn proptest_hints_always_win(g in arb_graph(), file in -3i64..8, chunk in -3i64..8) {
            let roles = detect_roles(&g, RoleHints::new(Some(file), Some(chunk)));
            prop_assert_eq!((roles.file_group, roles.chunk_group), (file, chunk));
        }

        #[test]
        fn proptest_distinct_roles_with_two_groups(g in arb_graph()) {
            prop_assume!(g.groups().len() >= 2);
            let roles = detect_roles(&g, RoleHints::default());
            prop_assert_ne!(roles.file_group, roles.chunk_group);
        }
    }
}
