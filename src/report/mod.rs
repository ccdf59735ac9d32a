use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::analysis::{
    AnalysisError, AnalysisOutcome, BoundnessResult, ClassificationResult, TreeStats,
};
use crate::net::{Marking, Net};

#[derive(Debug, Clone, Serialize)]
pub struct DeadlockTrace {
    /// Transitions fired from the initial marking, as `T<k>(name)`.
    pub transitions: Vec<String>,
    /// Root-to-deadlock markings, one more than `transitions`.
    pub markings: Vec<Marking>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StateSpaceInfo {
    pub tree_nodes: usize,
    pub distinct_states: usize,
    pub duplicate_nodes: usize,
    pub deadlock_nodes: usize,
    pub max_depth: usize,
    pub omega_nodes: usize,
}

impl From<TreeStats> for StateSpaceInfo {
    fn from(stats: TreeStats) -> Self {
        Self {
            tree_nodes: stats.nodes,
            distinct_states: stats.distinct_states,
            duplicate_nodes: stats.duplicates,
            deadlock_nodes: stats.deadlocks,
            max_depth: stats.max_depth,
            omega_nodes: stats.omega_nodes,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub net_name: String,
    pub places: Vec<String>,
    pub analysis_time: Duration,
    pub classification: Option<ClassificationResult>,
    pub boundness: Option<BoundnessResult>,
    pub reachable_markings: Vec<Marking>,
    pub deadlock_trace: Option<DeadlockTrace>,
    pub state_space_info: Option<StateSpaceInfo>,
    pub tree_log: Option<String>,
    pub error: Option<String>,
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Coverability analysis report")?;
        writeln!(f, "Net: {}", self.net_name)?;
        writeln!(f, "Places: [{}]", self.places.join(", "))?;
        writeln!(f, "Analysis time: {:?}", self.analysis_time)?;

        if let Some(classification) = &self.classification {
            writeln!(f, "\nBehavior:")?;
            writeln!(f, "  bounded: {}", classification.bounded)?;
            writeln!(f, "  safe: {}", classification.safe)?;
            writeln!(f, "  deadlock: {}", classification.has_deadlock)?;
            if let Some(boundness) = &self.boundness {
                writeln!(f, "  boundedness: {}", boundness)?;
            }

            writeln!(f, "\nStructure:")?;
            writeln!(f, "  state machine: {}", classification.state_machine)?;
            writeln!(f, "  marked graph: {}", classification.marked_graph)?;
            writeln!(f, "  free choice: {}", classification.free_choice)?;
            writeln!(
                f,
                "  extended free choice: {}",
                classification.extended_free_choice
            )?;
            writeln!(f, "  simple: {}", classification.simple)?;
            writeln!(f, "  extended simple: {}", classification.extended_simple)?;
        }

        if let Some(trace) = &self.deadlock_trace {
            writeln!(f, "\nShortest path to deadlock:")?;
            for (step, marking) in trace.markings.iter().enumerate() {
                match step.checked_sub(1).and_then(|i| trace.transitions.get(i)) {
                    Some(transition) => writeln!(f, "  --{}--> {}", transition, marking)?,
                    None => writeln!(f, "  {}", marking)?,
                }
            }
        }

        if !self.reachable_markings.is_empty() {
            writeln!(f, "\nReachable markings ({}):", self.reachable_markings.len())?;
            for (i, marking) in self.reachable_markings.iter().enumerate() {
                writeln!(f, "  S{}: {}", i, marking)?;
            }
        }

        if let Some(info) = &self.state_space_info {
            writeln!(f, "\nState space:")?;
            writeln!(f, "  tree nodes: {}", info.tree_nodes)?;
            writeln!(f, "  distinct states: {}", info.distinct_states)?;
            writeln!(f, "  duplicate nodes: {}", info.duplicate_nodes)?;
            writeln!(f, "  deadlock nodes: {}", info.deadlock_nodes)?;
            writeln!(f, "  max depth: {}", info.max_depth)?;
            writeln!(f, "  nodes with ω: {}", info.omega_nodes)?;
        }

        if let Some(log) = &self.tree_log {
            writeln!(f, "\n{}", log)?;
        }

        if let Some(error) = &self.error {
            writeln!(f, "\nError: {}", error)?;
        }

        Ok(())
    }
}

impl AnalysisReport {
    fn empty(net: &Net, analysis_time: Duration) -> Self {
        Self {
            net_name: net.name.clone(),
            places: net.places.iter().map(|place| place.name.clone()).collect(),
            analysis_time,
            classification: None,
            boundness: None,
            reachable_markings: Vec::new(),
            deadlock_trace: None,
            state_space_info: None,
            tree_log: None,
            error: None,
        }
    }

    pub fn from_outcome(
        net: &Net,
        outcome: &AnalysisOutcome,
        analysis_time: Duration,
        include_tree_log: bool,
    ) -> Self {
        let tree = &outcome.tree;
        let deadlock_trace = tree.deadlock_node().map(|leaf| DeadlockTrace {
            transitions: tree
                .firing_sequence(leaf)
                .into_iter()
                .map(|t| match net.transitions.get(t) {
                    Some(transition) => format!("{}({})", t, transition.name),
                    None => t.to_string(),
                })
                .collect(),
            markings: tree
                .shortest_path_to_deadlock()
                .map(<[Marking]>::to_vec)
                .unwrap_or_default(),
        });

        Self {
            classification: Some(outcome.classification.clone()),
            boundness: Some(outcome.boundness.clone()),
            reachable_markings: tree.markings().to_vec(),
            deadlock_trace,
            state_space_info: Some(tree.stats().into()),
            tree_log: include_tree_log.then(|| tree.render_log()),
            ..Self::empty(net, analysis_time)
        }
    }

    pub fn from_error(net: &Net, error: &AnalysisError, analysis_time: Duration) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::empty(net, analysis_time)
        }
    }

    pub fn save_to_file(&self, path: &str) -> std::io::Result<()> {
        use std::fs::File;
        use std::io::Write;

        let mut file = File::create(path)?;
        writeln!(file, "{}", self)?;

        let json_path = format!("{}.json", path);
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(json_path, json.as_bytes())?;

        Ok(())
    }
}
