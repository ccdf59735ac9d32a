//! Coverability tree construction.
//!
//! Nodes live in an arena indexed by [`NodeId`]; parents are referenced by
//! index. Exploration is depth first over an explicit frame stack: the
//! children of a node are created in ascending transition order and each new
//! child is explored completely before its next sibling is created.
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use crate::analysis::cancel::CancellationToken;
use crate::analysis::error::{AnalysisError, ResourceLimit};
use crate::analysis::omega::OmegaAccelerator;
use crate::analysis::registry::{Registration, StateId, StateRegistry};
use crate::config::AnalysisConfig;
use crate::net::ids::{TransitionId, define_id};
use crate::net::index_vec::{Idx, IndexVec};
use crate::net::{EnabledSet, EnablementEvaluator, FiringEngine, IncidenceModel, Marking};
use crate::util::mem_watcher::MemoryWatcher;

define_id!(NodeId, "N");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeStatus {
    Unexpanded,
    /// Received ω before the duplicate check; left once the node is classified.
    Accelerated,
    Duplicate,
    Deadlock,
    Expanded,
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub id: NodeId,
    /// Registry state this node's marking maps to; duplicates share the
    /// state of the earlier equal node.
    pub state: StateId,
    pub marking: Marking,
    pub parent: Option<NodeId>,
    pub from_transition: Option<TransitionId>,
    pub depth: usize,
    pub children: Vec<NodeId>,
    /// Filled in when the node is expanded; `None` for duplicates.
    pub enabled: Option<EnabledSet>,
    pub status: NodeStatus,
    pub accelerated: bool,
}

impl TreeNode {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_deadlock(&self) -> bool {
        self.status == NodeStatus::Deadlock
    }

    pub fn is_duplicate(&self) -> bool {
        self.status == NodeStatus::Duplicate
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TreeStats {
    pub nodes: usize,
    pub distinct_states: usize,
    pub duplicates: usize,
    pub deadlocks: usize,
    pub max_depth: usize,
    pub omega_nodes: usize,
}

/// Node ids from `from` up to and including the root.
fn lineage(
    nodes: &IndexVec<NodeId, TreeNode>,
    from: NodeId,
) -> impl Iterator<Item = NodeId> + '_ {
    std::iter::successors(Some(from), move |id| nodes[*id].parent)
}

#[derive(Debug, Clone)]
pub struct CoverabilityTree {
    nodes: IndexVec<NodeId, TreeNode>,
    registry: StateRegistry,
    omega_found: bool,
    deadlock: Option<NodeId>,
    deadlock_path: Option<Vec<Marking>>,
}

impl CoverabilityTree {
    pub fn root(&self) -> &TreeNode {
        &self.nodes[NodeId::new(0)]
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    /// All nodes in creation order.
    pub fn nodes(&self) -> &[TreeNode] {
        self.nodes.as_slice()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Distinct markings in discovery order, the initial marking first.
    pub fn markings(&self) -> &[Marking] {
        self.registry.markings()
    }

    pub fn registry(&self) -> &StateRegistry {
        &self.registry
    }

    /// `true` iff no ω was inserted anywhere during exploration.
    pub fn is_bounded(&self) -> bool {
        !self.omega_found
    }

    pub fn is_safe(&self) -> bool {
        self.is_bounded()
            && self
                .nodes
                .iter()
                .all(|node| node.marking.max_finite() <= 1)
    }

    pub fn has_deadlock(&self) -> bool {
        self.deadlock.is_some()
    }

    /// The shallowest deadlock node; the first one found on ties.
    pub fn deadlock_node(&self) -> Option<NodeId> {
        self.deadlock
    }

    /// Root-to-deadlock markings of [`Self::deadlock_node`].
    pub fn shortest_path_to_deadlock(&self) -> Option<&[Marking]> {
        self.deadlock_path.as_deref()
    }

    /// Node ids from the root down to `id`.
    pub fn path_to(&self, id: NodeId) -> Vec<NodeId> {
        if !self.nodes.contains_index(id) {
            return Vec::new();
        }
        let mut path: Vec<NodeId> = lineage(&self.nodes, id).collect();
        path.reverse();
        path
    }

    /// Transitions fired from the root to reach `id`.
    pub fn firing_sequence(&self, id: NodeId) -> Vec<TransitionId> {
        self.path_to(id)
            .into_iter()
            .filter_map(|node| self.nodes[node].from_transition)
            .collect()
    }

    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats {
            nodes: self.nodes.len(),
            distinct_states: self.registry.len(),
            ..TreeStats::default()
        };
        for node in self.nodes.iter() {
            stats.max_depth = stats.max_depth.max(node.depth);
            match node.status {
                NodeStatus::Duplicate => stats.duplicates += 1,
                NodeStatus::Deadlock => stats.deadlocks += 1,
                _ => {}
            }
            if node.marking.has_omega() {
                stats.omega_nodes += 1;
            }
        }
        stats
    }

    /// Text listing of every expanded node and its children, deepest
    /// subtrees first:
    ///
    /// ```text
    /// Reachable states from S0 [1, 0]:
    /// T0 => S1 [0, 1]
    /// ```
    pub fn render_log(&self) -> String {
        let mut log = String::new();
        let mut stack = vec![(self.root().id, false)];
        while let Some((id, children_done)) = stack.pop() {
            let node = &self.nodes[id];
            if node.children.is_empty() {
                continue;
            }
            if !children_done {
                stack.push((id, true));
                stack.extend(node.children.iter().rev().map(|child| (*child, false)));
                continue;
            }
            if !log.is_empty() {
                log.push('\n');
            }
            log.push_str(&format!(
                "Reachable states from {} {}:\n",
                node.state, node.marking
            ));
            for child in node.children.iter().map(|child| &self.nodes[*child]) {
                let transition = child
                    .from_transition
                    .map(|t| t.to_string())
                    .unwrap_or_default();
                log.push_str(&format!(
                    "{} => {} {}\n",
                    transition, child.state, child.marking
                ));
            }
        }
        log
    }

    pub fn to_dot(&self) -> String {
        fn escape(s: &str) -> String {
            s.replace('\\', "\\\\").replace('"', "\\\"")
        }

        let mut graph = DiGraph::<NodeId, TransitionId>::with_capacity(self.nodes.len(), self.nodes.len());
        for node in self.nodes.iter() {
            graph.add_node(node.id);
        }
        for node in self.nodes.iter() {
            if let (Some(parent), Some(transition)) = (node.parent, node.from_transition) {
                graph.add_edge(
                    NodeIndex::new(parent.index()),
                    NodeIndex::new(node.id.index()),
                    transition,
                );
            }
        }

        let mut edge_attr = |_, edge: petgraph::graph::EdgeReference<TransitionId>| -> String {
            format!("label=\"{}\"", edge.weight())
        };

        let mut node_attr = |_, (_idx, id): (NodeIndex, &NodeId)| -> String {
            let node = &self.nodes[*id];
            let label = format!("{}\\n{}", node.state, escape(&node.marking.to_string()));
            match node.status {
                NodeStatus::Deadlock => format!("label=\"{}\", color=red", label),
                NodeStatus::Duplicate => format!("label=\"{}\", style=dashed", label),
                _ => format!("label=\"{}\"", label),
            }
        };

        format!(
            "{:?}",
            Dot::with_attr_getters(
                &graph,
                &[Config::EdgeNoLabel, Config::NodeNoLabel],
                &mut edge_attr,
                &mut node_attr
            )
        )
    }
}

/// Builds a [`CoverabilityTree`] from an [`IncidenceModel`].
///
/// ```rust
/// use pn_cover::analysis::CoverabilityTreeBuilder;
/// use pn_cover::net::{IncidenceModel, Net, Place, Transition};
///
/// let mut net = Net::empty();
/// let p0 = net.add_place(Place::new("p0", 1));
/// let t0 = net.add_transition(Transition::new("t0"));
/// net.add_input_arc(p0, t0, 1);
/// net.add_output_arc(t0, p0, 2);
///
/// let model = IncidenceModel::from_net(&net).unwrap();
/// let tree = CoverabilityTreeBuilder::new(&model).build().unwrap();
/// assert!(!tree.is_bounded());
/// ```
#[derive(Clone)]
pub struct CoverabilityTreeBuilder<'a> {
    model: &'a IncidenceModel,
    max_nodes: Option<usize>,
    max_depth: Option<usize>,
    memory_limit_mb: Option<u64>,
    memory_check_interval: usize,
    cancellation: CancellationToken,
}

impl<'a> CoverabilityTreeBuilder<'a> {
    pub fn new(model: &'a IncidenceModel) -> Self {
        Self::with_config(model, &AnalysisConfig::default())
    }

    pub fn with_config(model: &'a IncidenceModel, config: &AnalysisConfig) -> Self {
        Self {
            model,
            max_nodes: config.max_nodes,
            max_depth: config.max_depth,
            memory_limit_mb: config.memory_limit_mb,
            memory_check_interval: config.memory_check_interval,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn max_nodes(mut self, limit: Option<usize>) -> Self {
        self.max_nodes = limit;
        self
    }

    pub fn max_depth(mut self, limit: Option<usize>) -> Self {
        self.max_depth = limit;
        self
    }

    pub fn memory_limit(mut self, limit_mb: Option<u64>, check_interval: usize) -> Self {
        self.memory_limit_mb = limit_mb;
        self.memory_check_interval = check_interval;
        self
    }

    pub fn cancellation(mut self, token: &CancellationToken) -> Self {
        self.cancellation = token.clone();
        self
    }

    pub fn build(&self) -> Result<CoverabilityTree, AnalysisError> {
        let mut exploration = Exploration::new(self);
        let result = exploration.run();
        if let Some(watcher) = &exploration.memory {
            watcher.log_summary();
        }
        result?;
        Ok(exploration.finish())
    }
}

struct Frame {
    node: NodeId,
    enabled: Vec<TransitionId>,
    next: usize,
}

/// Mutable state of one `build` call.
struct Exploration<'b, 'a> {
    builder: &'b CoverabilityTreeBuilder<'a>,
    evaluator: EnablementEvaluator<'a>,
    engine: FiringEngine<'a>,
    accelerator: OmegaAccelerator<'a>,
    nodes: IndexVec<NodeId, TreeNode>,
    registry: StateRegistry,
    memory: Option<MemoryWatcher>,
    omega_found: bool,
    deadlock: Option<NodeId>,
}

impl<'b, 'a> Exploration<'b, 'a> {
    fn new(builder: &'b CoverabilityTreeBuilder<'a>) -> Self {
        let model = builder.model;
        Self {
            builder,
            evaluator: EnablementEvaluator::new(model),
            engine: FiringEngine::new(model),
            accelerator: OmegaAccelerator::new(model),
            nodes: IndexVec::new(),
            registry: StateRegistry::new(),
            memory: builder
                .memory_limit_mb
                .map(|limit| MemoryWatcher::new(limit, builder.memory_check_interval)),
            omega_found: false,
            deadlock: None,
        }
    }

    fn run(&mut self) -> Result<(), AnalysisError> {
        let initial = self.builder.model.initial_marking().clone();
        log::debug!(
            "building coverability tree: {} places, {} transitions, root {}",
            self.builder.model.place_count(),
            self.builder.model.transition_count(),
            initial
        );
        let state = self.registry.register(&initial).state();
        let root = self.nodes.push(TreeNode {
            id: NodeId::new(0),
            state,
            marking: initial,
            parent: None,
            from_transition: None,
            depth: 0,
            children: Vec::new(),
            enabled: None,
            status: NodeStatus::Unexpanded,
            accelerated: false,
        });

        let mut stack: Vec<Frame> = self.open(root).into_iter().collect();
        while let Some(frame) = stack.last_mut() {
            let Some(&transition) = frame.enabled.get(frame.next) else {
                stack.pop();
                continue;
            };
            frame.next += 1;
            let parent = frame.node;

            self.checkpoint()?;
            let child = self.spawn(parent, transition)?;
            if self.nodes[child].status != NodeStatus::Duplicate {
                stack.extend(self.open(child));
            }
        }
        Ok(())
    }

    /// Cancellation and resource ceilings, checked before every new node.
    fn checkpoint(&mut self) -> Result<(), AnalysisError> {
        let explored = self.nodes.len();
        if self.builder.cancellation.is_cancelled() {
            log::info!("coverability analysis cancelled after {} nodes", explored);
            return Err(AnalysisError::Cancelled { explored });
        }
        if let Some(limit) = self.builder.max_nodes {
            if explored >= limit {
                return Err(AnalysisError::StateSpaceTooLarge {
                    explored,
                    limit: ResourceLimit::Nodes(limit),
                });
            }
        }
        if let Some(watcher) = self.memory.as_mut() {
            watcher
                .poll(explored)
                .map_err(|exceeded| AnalysisError::StateSpaceTooLarge {
                    explored,
                    limit: ResourceLimit::MemoryMb(exceeded.limit_mb),
                })?;
        }
        Ok(())
    }

    /// Fires `transition` from `parent`, accelerates the result and records it.
    fn spawn(&mut self, parent: NodeId, transition: TransitionId) -> Result<NodeId, AnalysisError> {
        let depth = self.nodes[parent].depth + 1;
        if let Some(limit) = self.builder.max_depth {
            if depth > limit {
                return Err(AnalysisError::StateSpaceTooDeep { depth, limit });
            }
        }

        let fired = self.engine.fire(transition, &self.nodes[parent].marking)?;
        let nodes = &self.nodes;
        let acceleration = self.accelerator.accelerate(
            &fired,
            lineage(nodes, parent).map(|ancestor| &nodes[ancestor].marking),
        );
        let accelerated = acceleration.accelerated();
        if accelerated {
            self.omega_found = true;
            log::debug!(
                "{} after {} at depth {}: ω inserted at {:?}",
                acceleration.marking,
                transition,
                depth,
                acceleration.inserted
            );
        }

        let registration = self.registry.register(&acceleration.marking);
        let status = match registration {
            Registration::Known(_) => NodeStatus::Duplicate,
            Registration::New(_) if accelerated => NodeStatus::Accelerated,
            Registration::New(_) => NodeStatus::Unexpanded,
        };
        let id = self.nodes.next_index();
        self.nodes.push(TreeNode {
            id,
            state: registration.state(),
            marking: acceleration.marking,
            parent: Some(parent),
            from_transition: Some(transition),
            depth,
            children: Vec::new(),
            enabled: None,
            status,
            accelerated,
        });
        self.nodes[parent].children.push(id);
        Ok(id)
    }

    /// Computes the enabled set of a new node. Returns the frame to explore,
    /// or `None` if the node is a deadlock.
    fn open(&mut self, id: NodeId) -> Option<Frame> {
        let enabled = self.evaluator.enabled(&self.nodes[id].marking);
        let transitions: Vec<TransitionId> = enabled.iter().collect();
        let node = &mut self.nodes[id];
        node.enabled = Some(enabled);

        if transitions.is_empty() {
            node.status = NodeStatus::Deadlock;
            self.record_deadlock(id);
            return None;
        }
        node.status = NodeStatus::Expanded;
        Some(Frame {
            node: id,
            enabled: transitions,
            next: 0,
        })
    }

    fn record_deadlock(&mut self, id: NodeId) {
        let depth = self.nodes[id].depth;
        log::debug!(
            "deadlock at {} (state {}, depth {}): {}",
            id,
            self.nodes[id].state,
            depth,
            self.nodes[id].marking
        );
        let shorter = self
            .deadlock
            .is_none_or(|best| depth < self.nodes[best].depth);
        if shorter {
            self.deadlock = Some(id);
        }
    }

    fn finish(self) -> CoverabilityTree {
        let deadlock_path = self.deadlock.map(|leaf| {
            let mut path: Vec<Marking> = lineage(&self.nodes, leaf)
                .map(|id| self.nodes[id].marking.clone())
                .collect();
            path.reverse();
            path
        });
        let tree = CoverabilityTree {
            nodes: self.nodes,
            registry: self.registry,
            omega_found: self.omega_found,
            deadlock: self.deadlock,
            deadlock_path,
        };
        let stats = tree.stats();
        log::info!(
            "coverability tree: {} nodes, {} states, {} duplicates, {} deadlocks, max depth {}, bounded={}",
            stats.nodes,
            stats.distinct_states,
            stats.duplicates,
            stats.deadlocks,
            stats.max_depth,
            tree.is_bounded()
        );
        tree
    }
}
