use crate::builder::FeatureIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// How per-feature chunk sets are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryMode {
    /// Chunks reachable from every selected feature
    #[default]
    All,
    /// Chunks reachable from at least one selected feature
    Any,
}

impl QueryMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Any => "ANY",
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "any" => Ok(Self::Any),
            other => Err(format!("unknown query mode '{other}' (expected ALL or ANY)")),
        }
    }
}

impl FeatureIndex {
    /// Chunks reachable from the selected features, sorted ascending.
    ///
    /// Unknown feature ids contribute an empty set. An empty selection yields
    /// an empty result in either mode.
    pub fn compute_chunks<S: AsRef<str>>(&self, selected: &[S], mode: QueryMode) -> Vec<String> {
        if selected.is_empty() {
            return Vec::new();
        }

        let empty = HashSet::new();
        let mut sets: Vec<&HashSet<String>> = selected
            .iter()
            .map(|id| self.chunks_of(id.as_ref()).unwrap_or(&empty))
            .collect();

        let combined: HashSet<&str> = match mode {
            QueryMode::All => {
                // Smallest set first bounds the work by its size
                sets.sort_by_key(|set| set.len());
                let (seed, rest) = sets.split_first().map_or((&empty, &[][..]), |(s, r)| (*s, r));
                let mut acc: HashSet<&str> = seed.iter().map(String::as_str).collect();
                for set in rest {
                    if acc.is_empty() {
                        break;
                    }
                    acc.retain(|chunk| set.contains(*chunk));
                }
                acc
            }
            QueryMode::Any => sets
                .iter()
                .flat_map(|set| set.iter().map(String::as_str))
                .collect(),
        };

        let mut out: Vec<String> = combined.into_iter().map(str::to_string).collect();
        out.sort_unstable();

        log::debug!(
            "Query {mode} over {} features -> {} chunks",
            selected.len(),
            out.len()
        );
        out
    }

    /// Feature ids containing `needle`, case-insensitive, in input order
    pub fn filter_features(&self, needle: &str) -> Vec<&str> {
        let needle = needle.trim().to_lowercase();
        self.feature_ids
            .iter()
            .map(String::as_str)
            .filter(|id| needle.is_empty() || id.to_lowercase().contains(&needle))
            .collect()
    }
}
