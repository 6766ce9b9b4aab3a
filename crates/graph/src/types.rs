use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::Result;

/// Opaque group tag carried by every node
pub type GroupId = i64;

/// Node in an uploaded graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier, referenced by links
    pub id: String,

    /// Externally assigned classification tag
    pub group: GroupId,
}

impl Node {
    pub fn new(id: impl Into<String>, group: GroupId) -> Self {
        Self {
            id: id.into(),
            group,
        }
    }
}

/// Undirected link between two node ids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub source: String,
    pub target: String,

    /// Link weight; carried through but never used for reachability
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl Link {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            value: None,
        }
    }
}

/// Uploaded graph: nodes plus undirected links
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,

    #[serde(default)]
    pub links: Vec<Link>,
}

impl Graph {
    pub fn new(nodes: Vec<Node>, links: Vec<Link>) -> Self {
        Self { nodes, links }
    }

    /// Parse graph JSON (`{"nodes":[...],"links":[...]}`)
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Node id -> group lookup
    #[must_use]
    pub fn group_index(&self) -> HashMap<&str, GroupId> {
        self.nodes
            .iter()
            .map(|node| (node.id.as_str(), node.group))
            .collect()
    }

    /// Distinct groups in the order they first appear among the nodes.
    ///
    /// Every tie-break in role detection refers to this order.
    #[must_use]
    pub fn groups(&self) -> Vec<GroupId> {
        let mut seen = HashSet::new();
        self.nodes
            .iter()
            .filter(|node| seen.insert(node.group))
            .map(|node| node.group)
            .collect()
    }

    /// Member ids per group, in node order
    #[must_use]
    pub fn ids_by_group(&self) -> HashMap<GroupId, Vec<&str>> {
        let mut out: HashMap<GroupId, Vec<&str>> = HashMap::new();
        for node in &self.nodes {
            out.entry(node.group).or_default().push(node.id.as_str());
        }
        out
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}

/// Role of a node, derived from its group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    File,
    Chunk,
    Feature,
}
