use crate::{EngineError, LoadStats, Result};
use chunk_graph::{
    FeatureIndex, Graph, NamingRules, QueryMode, RoleAssignment, RoleDetector, RoleHints,
};
use chunk_protocol::{Request, Response};
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;

/// Receives `(percent, message)` updates during long operations
pub type ProgressFn<'a> = dyn FnMut(u8, &str) + 'a;

/// Immutable result of one load; queries run against it
#[derive(Debug)]
pub struct LoadedGraph {
    roles: RoleAssignment,
    index: FeatureIndex,
    stats: LoadStats,
}

impl LoadedGraph {
    pub fn roles(&self) -> &RoleAssignment {
        &self.roles
    }

    pub fn index(&self) -> &FeatureIndex {
        &self.index
    }

    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    pub fn feature_ids(&self) -> &[String] {
        self.index.feature_ids()
    }

    pub fn query<S: AsRef<str>>(&self, selected: &[S], mode: QueryMode) -> Vec<String> {
        self.index.compute_chunks(selected, mode)
    }

    /// `ready` message announcing this graph
    pub fn ready_response(&self) -> Response {
        Response::Ready {
            feature_ids: self.index.feature_ids().to_vec(),
            chunk_count: self.index.chunk_count(),
            file_group: self.roles.file_group,
            chunk_group: self.roles.chunk_group,
        }
    }
}

/// Owns the single active graph. A load swaps in a fully built
/// [`LoadedGraph`]; a failed load leaves the previous one in place.
#[derive(Debug)]
pub struct Engine {
    detector: RoleDetector,
    current: Option<Arc<LoadedGraph>>,
}

impl Engine {
    pub fn new(rules: &NamingRules) -> Result<Self> {
        Ok(Self {
            detector: RoleDetector::new(rules)?,
            current: None,
        })
    }

    /// Currently published graph, if any
    pub fn current(&self) -> Option<Arc<LoadedGraph>> {
        self.current.clone()
    }

    pub fn load_text(&mut self, text: &str, hints: RoleHints) -> Result<Arc<LoadedGraph>> {
        self.load_text_with_progress(text, hints, &mut |_, _| {})
    }

    pub fn load_text_with_progress(
        &mut self,
        text: &str,
        hints: RoleHints,
        progress: &mut ProgressFn<'_>,
    ) -> Result<Arc<LoadedGraph>> {
        progress(5, "Parsing graph…");
        let graph = Graph::from_json(text)?;
        Ok(self.load_graph_with_progress(&graph, hints, progress))
    }

    pub fn load_graph(&mut self, graph: &Graph, hints: RoleHints) -> Arc<LoadedGraph> {
        self.load_graph_with_progress(graph, hints, &mut |_, _| {})
    }

    fn load_graph_with_progress(
        &mut self,
        graph: &Graph,
        hints: RoleHints,
        progress: &mut ProgressFn<'_>,
    ) -> Arc<LoadedGraph> {
        let started = Instant::now();

        progress(25, "Detecting file and chunk groups…");
        let groups = graph.groups().len();
        let roles = self.detector.detect(graph, hints);
        if groups < 2 {
            warn!("Graph has {groups} distinct group(s); every node is treated as a chunk");
        }

        progress(50, "Building feature index…");
        let index = FeatureIndex::build(graph, &roles);

        let mut stats = LoadStats::new(
            groups,
            &roles,
            index.stats(),
            index.feature_ids().len(),
            index.chunk_count(),
            index.indexed_feature_count(),
        );
        stats.time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            "Loaded graph: {} nodes, {} links, {} groups; file group {} ({:?}{}), chunk group {} ({:?}); {} features, {} chunks, {} dangling links",
            stats.nodes,
            stats.links,
            stats.groups,
            stats.file_group,
            stats.file_evidence,
            if stats.file_role_active { "" } else { ", nominal" },
            stats.chunk_group,
            stats.chunk_evidence,
            stats.features,
            stats.chunks,
            stats.dangling_links
        );

        let loaded = Arc::new(LoadedGraph {
            roles,
            index,
            stats,
        });
        self.current = Some(loaded.clone());
        progress(100, "Ready");
        loaded
    }

    pub fn query<S: AsRef<str>>(&self, selected: &[S], mode: QueryMode) -> Result<Vec<String>> {
        let loaded = self.current.as_ref().ok_or(EngineError::NotLoaded)?;
        Ok(loaded.query(selected, mode))
    }

    /// Answer one request with its terminal response; errors become `error`
    /// responses and never escape.
    pub fn handle(&mut self, request: Request, progress: &mut ProgressFn<'_>) -> Response {
        let kind = request.kind();
        let outcome = match request {
            Request::InitFromText {
                text,
                file_group_hint,
                chunk_group_hint,
            } => self
                .load_text_with_progress(
                    &text,
                    RoleHints::new(file_group_hint, chunk_group_hint),
                    progress,
                )
                .map(|loaded| loaded.ready_response()),
            Request::Compute { selected, mode } => {
                progress(10, "Computing…");
                self.query(selected.as_slice(), mode)
                    .map(|chunks| Response::Result { chunks })
            }
        };

        outcome.unwrap_or_else(|err| {
            warn!("{kind} failed: {err}");
            Response::error(err.code(), err.to_string())
        })
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            detector: RoleDetector::default(),
            current: None,
        }
    }
}
