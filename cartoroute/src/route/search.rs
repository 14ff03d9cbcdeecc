//! Best-first search over a lazily expanded road graph.
//!
//! Nodes live in a flat arena and refer to their predecessor by index, so
//! the backtrack chain is a tree of plain integers. The frontier is a binary
//! min-heap on `cost + straight-line distance to goal`; entries made stale by
//! a later relaxation are skipped when popped rather than removed.
//!
//! Ties on the estimate go to the lowest vertex id, which keeps the chosen
//! path stable between runs.
//!
//! The straight-line heuristic is only admissible when edge costs are at
//! least the Euclidean length of the edge. Costs from the data source are
//! used as stored, so on other data the result is a good path rather than a
//! provably shortest one. A closed node is never reopened.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use ordered_float::OrderedFloat;
use tracing::{debug, warn};

use super::{Edge, PlanError, SpatialGateway, Vertex, VertexId};

/// Work done by one search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Nodes moved to the closed set.
    pub expanded: usize,
    /// Outgoing-edge queries issued to the gateway.
    pub edge_queries: usize,
    /// Largest number of open nodes at any time.
    pub peak_frontier: usize,
}

/// Path found by a search, start to goal inclusive.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FoundPath {
    pub vertices: Vec<Vertex>,
    pub cost: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Open,
    Closed,
}

#[derive(Debug)]
struct SearchNode {
    vertex: Vertex,
    cost: f64,
    predecessor: Option<usize>,
    state: NodeState,
}

/// Heap entry: estimate, vertex id, cost when pushed, arena index.
type FrontierEntry = Reverse<(OrderedFloat<f64>, VertexId, OrderedFloat<f64>, usize)>;

struct Search<'g, G: ?Sized> {
    gateway: &'g G,
    goal: Vertex,
    nodes: Vec<SearchNode>,
    index: HashMap<VertexId, usize>,
    frontier: BinaryHeap<FrontierEntry>,
    open: usize,
    stats: SearchStats,
}

/// Search from `start` to `goal`.
///
/// Returns `Ok(None)` when the frontier runs dry before the goal is reached.
pub(crate) fn find<G>(
    gateway: &G,
    start: Vertex,
    goal: Vertex,
) -> Result<(Option<FoundPath>, SearchStats), PlanError>
where
    G: SpatialGateway + ?Sized,
{
    let mut search = Search {
        gateway,
        goal,
        nodes: Vec::new(),
        index: HashMap::new(),
        frontier: BinaryHeap::new(),
        open: 0,
        stats: SearchStats::default(),
    };

    let start_idx = search.insert(start);
    search.nodes[start_idx].cost = 0.0;
    search.push(start_idx);

    let found = search.run()?;
    debug!(
        start = start.id,
        goal = goal.id,
        found = found.is_some(),
        expanded = search.stats.expanded,
        edge_queries = search.stats.edge_queries,
        peak_frontier = search.stats.peak_frontier,
        "Route search finished"
    );
    Ok((found, search.stats))
}

impl<G: SpatialGateway + ?Sized> Search<'_, G> {
    fn run(&mut self) -> Result<Option<FoundPath>, PlanError> {
        while let Some(Reverse((_, _, pushed_cost, idx))) = self.frontier.pop() {
            let node = &self.nodes[idx];
            if node.state == NodeState::Closed || node.cost != pushed_cost.0 {
                continue;
            }

            if node.vertex.id == self.goal.id {
                return Ok(Some(self.reconstruct(idx)));
            }

            let vertex = node.vertex.id;
            self.nodes[idx].state = NodeState::Closed;
            self.open -= 1;
            self.stats.expanded += 1;

            let edges = self
                .gateway
                .outgoing_edges(vertex)
                .map_err(|source| PlanError::Expand { vertex, source })?;
            self.stats.edge_queries += 1;

            for edge in edges {
                self.relax(idx, edge);
            }
        }

        Ok(None)
    }

    fn relax(&mut self, current: usize, edge: Edge) {
        if edge.cost.is_nan() || edge.cost < 0.0 {
            warn!(
                source = self.nodes[current].vertex.id,
                target = edge.target.id,
                cost = edge.cost,
                "Skipping edge with invalid cost"
            );
            return;
        }

        let neighbor = match self.index.get(&edge.target.id) {
            Some(&idx) if self.nodes[idx].state == NodeState::Closed => return,
            Some(&idx) => idx,
            None => self.insert(edge.target),
        };

        let through = self.nodes[current].cost + edge.cost;
        if through < self.nodes[neighbor].cost {
            self.nodes[neighbor].cost = through;
            self.nodes[neighbor].predecessor = Some(current);
            self.push(neighbor);
        }
    }

    /// Add an open node with infinite cost.
    fn insert(&mut self, vertex: Vertex) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(SearchNode {
            vertex,
            cost: f64::INFINITY,
            predecessor: None,
            state: NodeState::Open,
        });
        self.index.insert(vertex.id, idx);
        self.open += 1;
        self.stats.peak_frontier = self.stats.peak_frontier.max(self.open);
        idx
    }

    fn push(&mut self, idx: usize) {
        let node = &self.nodes[idx];
        let estimate = node.cost + node.vertex.point.distance_to(&self.goal.point);
        self.frontier.push(Reverse((
            OrderedFloat(estimate),
            node.vertex.id,
            OrderedFloat(node.cost),
            idx,
        )));
    }

    fn reconstruct(&self, goal: usize) -> FoundPath {
        let mut vertices = Vec::new();
        let mut cursor = Some(goal);
        while let Some(idx) = cursor {
            vertices.push(self.nodes[idx].vertex);
            cursor = self.nodes[idx].predecessor;
        }
        vertices.reverse();

        FoundPath {
            vertices,
            cost: self.nodes[goal].cost,
        }
    }
}
