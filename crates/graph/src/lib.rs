//! # Chunk Graph
//!
//! Role classification and feature -> chunk reachability over grouped graphs.
//!
//! ## Pipeline
//!
//! ```text
//! Graph { nodes (id, group), links (source, target) }
//!     │
//!     ├──> Role Detector
//!     │      ├─ explicit hints
//!     │      ├─ id conventions (file_name_*, media extensions, chunk_id_*)
//!     │      └─ group adjacency (petgraph): hub = chunks, leaf = files
//!     │
//!     ├──> Feature Index Builder
//!     │      ├─ direct feature - chunk links
//!     │      └─ feature - file - chunk bridges
//!     │
//!     └──> Query
//!            ├─ ALL: intersection, smallest set first
//!            └─ ANY: union
//! ```
//!
//! ## Example
//!
//! ```rust
//! use chunk_graph::{detect_roles, FeatureIndex, Graph, QueryMode, RoleHints};
//!
//! let graph = Graph::from_json(r#"{
//!     "nodes": [
//!         {"id": "speaker:ann", "group": 2},
//!         {"id": "file_name_a", "group": 0},
//!         {"id": "chunk_id_1", "group": 1}
//!     ],
//!     "links": [
//!         {"source": "speaker:ann", "target": "file_name_a"},
//!         {"source": "file_name_a", "target": "chunk_id_1"}
//!     ]
//! }"#).unwrap();
//!
//! let roles = detect_roles(&graph, RoleHints::default());
//! let index = FeatureIndex::build(&graph, &roles);
//! assert_eq!(index.compute_chunks(&["speaker:ann"], QueryMode::All), vec!["chunk_id_1"]);
//! ```

mod builder;
mod error;
mod graph;
mod roles;
mod types;

pub use builder::{BuildStats, FeatureIndex};
pub use error::{GraphError, Result};
pub use graph::QueryMode;
pub use roles::{detect_roles, Evidence, NamingRules, RoleAssignment, RoleDetector, RoleHints};
pub use types::{Graph, GroupId, Link, Node, Role};
