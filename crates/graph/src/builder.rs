use crate::roles::RoleAssignment;
use crate::types::{Graph, Role};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Diagnostics collected while building a [`FeatureIndex`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    pub nodes: usize,
    pub links: usize,

    /// Links with an endpoint missing from the node list
    pub dangling_links: usize,

    /// Feature-chunk links seen
    pub direct_links: usize,

    /// Feature-chunk pairs reached only through a file
    pub bridged_pairs: usize,

    pub files: usize,
}

/// Feature -> reachable chunks, built once per loaded graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureIndex {
    /// Only features reaching at least one chunk have an entry
    pub(crate) feature_to_chunks: HashMap<String, HashSet<String>>,

    /// Feature ids in node input order
    pub(crate) feature_ids: Vec<String>,

    /// Chunk ids in node input order
    pub(crate) chunk_ids: Vec<String>,

    pub(crate) stats: BuildStats,
}

impl FeatureIndex {
    /// Build the index for `graph` under `roles`.
    ///
    /// A feature reaches a chunk through a direct link or through any file it
    /// shares a link with. Dangling links are skipped and counted.
    pub fn build(graph: &Graph, roles: &RoleAssignment) -> Self {
        let mut stats = BuildStats {
            nodes: graph.node_count(),
            links: graph.link_count(),
            ..BuildStats::default()
        };

        let mut role_of: HashMap<&str, Role> = HashMap::with_capacity(graph.nodes.len());
        let mut feature_ids = Vec::new();
        let mut chunk_ids = Vec::new();

        for node in &graph.nodes {
            let role = roles.role_of(node.group);
            role_of.insert(node.id.as_str(), role);
            match role {
                Role::Feature => feature_ids.push(node.id.clone()),
                Role::Chunk => chunk_ids.push(node.id.clone()),
                Role::File => stats.files += 1,
            }
        }

        let mut feature_to_chunks: HashMap<String, HashSet<String>> = HashMap::new();
        let mut feature_files: HashMap<&str, HashSet<&str>> = HashMap::new();
        let mut file_chunks: HashMap<&str, HashSet<&str>> = HashMap::new();

        for link in &graph.links {
            let source = link.source.as_str();
            let target = link.target.as_str();
            let (Some(&rs), Some(&rt)) = (role_of.get(source), role_of.get(target)) else {
                stats.dangling_links += 1;
                log::debug!("Skipping dangling link {source} -> {target}");
                continue;
            };

            match (rs, rt) {
                (Role::Feature, Role::Chunk) => {
                    stats.direct_links += 1;
                    insert_reach(&mut feature_to_chunks, source, target);
                }
                (Role::Chunk, Role::Feature) => {
                    stats.direct_links += 1;
                    insert_reach(&mut feature_to_chunks, target, source);
                }
                (Role::Feature, Role::File) => {
                    feature_files.entry(source).or_default().insert(target);
                }
                (Role::File, Role::Feature) => {
                    feature_files.entry(target).or_default().insert(source);
                }
                (Role::File, Role::Chunk) => {
                    file_chunks.entry(source).or_default().insert(target);
                }
                (Role::Chunk, Role::File) => {
                    file_chunks.entry(target).or_default().insert(source);
                }
                _ => {}
            }
        }

        for (feature, files) in &feature_files {
            for file in files {
                let Some(chunks) = file_chunks.get(file) else {
                    continue;
                };
                for chunk in chunks {
                    if insert_reach(&mut feature_to_chunks, feature, chunk) {
                        stats.bridged_pairs += 1;
                    }
                }
            }
        }

        log::debug!(
            "Feature index: {} features ({} reaching chunks), {} chunks, {} files, {} dangling links",
            feature_ids.len(),
            feature_to_chunks.len(),
            chunk_ids.len(),
            stats.files,
            stats.dangling_links
        );

        Self {
            feature_to_chunks,
            feature_ids,
            chunk_ids,
            stats,
        }
    }

    /// Feature ids in node input order
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    /// Chunk ids in node input order
    pub fn chunk_ids(&self) -> &[String] {
        &self.chunk_ids
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_ids.len()
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    /// Chunks reachable from one feature; `None` when it reaches none
    pub fn chunks_of(&self, feature: &str) -> Option<&HashSet<String>> {
        self.feature_to_chunks.get(feature)
    }

    /// Number of features with at least one reachable chunk
    pub fn indexed_feature_count(&self) -> usize {
        self.feature_to_chunks.len()
    }
}

/// Returns true when the pair was new
fn insert_reach(map: &mut HashMap<String, HashSet<String>>, feature: &str, chunk: &str) -> bool {
    if let Some(chunks) = map.get_mut(feature) {
        if chunks.contains(chunk) {
            return false;
        }
        return chunks.insert(chunk.to_string());
    }
    map.entry(feature.to_string())
        .or_default()
        .insert(chunk.to_string())
}
