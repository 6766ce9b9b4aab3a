use chunk_graph::{BuildStats, Evidence, GroupId, RoleAssignment};
use serde::{Deserialize, Serialize};

/// Summary of one graph load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStats {
    /// Nodes in the uploaded graph
    pub nodes: usize,

    /// Links in the uploaded graph
    pub links: usize,

    /// Distinct node groups
    pub groups: usize,

    pub file_group: GroupId,
    pub chunk_group: GroupId,
    pub file_evidence: Evidence,
    pub chunk_evidence: Evidence,

    /// False when the file group is nominal and its nodes count as features
    pub file_role_active: bool,

    pub features: usize,
    pub chunks: usize,
    pub files: usize,

    /// Features reaching at least one chunk
    pub indexed_features: usize,

    pub dangling_links: usize,
    pub direct_links: usize,
    pub bridged_pairs: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,
}

impl LoadStats {
    pub fn new(
        groups: usize,
        roles: &RoleAssignment,
        build: &BuildStats,
        features: usize,
        chunks: usize,
        indexed_features: usize,
    ) -> Self {
        Self {
            nodes: build.nodes,
            links: build.links,
            groups,
            file_group: roles.file_group,
            chunk_group: roles.chunk_group,
            file_evidence: roles.file_evidence,
            chunk_evidence: roles.chunk_evidence,
            file_role_active: roles.file_role_active(),
            features,
            chunks,
            files: build.files,
            indexed_features,
            dangling_links: build.dangling_links,
            direct_links: build.direct_links,
            bridged_pairs: build.bridged_pairs,
            time_ms: 0,
        }
    }
}
