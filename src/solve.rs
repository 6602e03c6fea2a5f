//! Stage graph resolution
//!
//! Turns a root [`Stage`] into manifest text:
//!
//! 1. Walk the dependency edges from the root, keeping one node per stage
//!    name and rejecting two different stages that share a name, however
//!    deep the difference sits.
//! 2. Order the nodes with a depth-first post-order so every dependency is
//!    declared before the stages that read from it. Ties follow discovery
//!    order from the root, which makes the output byte-for-byte repeatable.
//! 3. Emit the syntax header followed by each stage block.

use crate::error::SolveError;
use crate::stage::Stage;
use std::collections::HashMap;
use tracing::debug;

/// Frontend directive written on the first manifest line
pub const DEFAULT_SYNTAX: &str = "docker/dockerfile:1.4";

/// Knobs for manifest emission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveOptions {
    /// Value of the `#syntax=` header
    pub syntax: String,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            syntax: DEFAULT_SYNTAX.to_string(),
        }
    }
}

/// Resolve `root` and everything it depends on into manifest text
pub fn solve(root: &Stage) -> Result<String, SolveError> {
    solve_with(root, &SolveOptions::default())
}

/// Like [`solve`], with an explicit syntax header
pub fn solve_with(root: &Stage, options: &SolveOptions) -> Result<String, SolveError> {
    let graph = StageGraph::discover(root)?;
    let ordered = graph.ordered()?;

    let mut blocks = Vec::with_capacity(ordered.len() + 1);
    blocks.push(format!("#syntax={}", options.syntax));
    blocks.extend(ordered.iter().map(|stage| stage.serialize()));
    Ok(blocks.join("\n\n"))
}

/// The stages reachable from a root, one node per stage name
#[derive(Debug)]
pub struct StageGraph<'a> {
    /// Nodes in discovery order; index 0 is the root
    stages: Vec<&'a Stage>,
    /// `edges[i]` lists the nodes stage `i` depends on
    edges: Vec<Vec<usize>>,
}

impl<'a> StageGraph<'a> {
    /// Collect every stage reachable from `root`.
    ///
    /// Dependencies are visited in the order they were linked, so discovery
    /// is canonical for a given root.
    pub fn discover(root: &'a Stage) -> Result<Self, SolveError> {
        let mut index: HashMap<&'a str, usize> = HashMap::new();
        let mut stages: Vec<&'a Stage> = Vec::new();
        let mut stack = vec![root];

        while let Some(stage) = stack.pop() {
            if let Some(&seen) = index.get(stage.name()) {
                if !stages[seen].same_definition(stage) {
                    return Err(SolveError::NameCollision {
                        name: stage.name().to_string(),
                    });
                }
                // A copy with its own dependency chain may still reach a
                // diverging version of a dependency
                if !stages[seen].shares_dependencies(stage) {
                    stack.extend(stage.dependencies().into_iter().rev());
                }
                continue;
            }

            index.insert(stage.name(), stages.len());
            stages.push(stage);
            stack.extend(stage.dependencies().into_iter().rev());
        }

        let edges = stages
            .iter()
            .map(|stage| {
                let mut targets: Vec<usize> = Vec::new();
                for dep in stage.dependencies() {
                    if let Some(&i) = index.get(dep.name()) {
                        if !targets.contains(&i) {
                            targets.push(i);
                        }
                    }
                }
                targets
            })
            .collect();

        debug!(
            "Discovered {} stage(s) reachable from {}",
            stages.len(),
            root.name()
        );

        Ok(Self { stages, edges })
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stages in discovery order
    pub fn stages(&self) -> &[&'a Stage] {
        &self.stages
    }

    /// Stages ordered so that dependencies precede their dependents
    pub fn ordered(&self) -> Result<Vec<&'a Stage>, SolveError> {
        let order = topological_order(&self.edges).map_err(|i| SolveError::Cycle {
            stage: self.stages[i].name().to_string(),
        })?;

        debug!(
            "Stage order: {}",
            order
                .iter()
                .map(|&i| self.stages[i].name())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(order.into_iter().map(|i| self.stages[i]).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// Depth-first post-order over `edges`, starting from node 0 and then any
/// node still unplaced, in index order.
///
/// Returns the index of a node on a cycle if one is found.
fn topological_order(edges: &[Vec<usize>]) -> Result<Vec<usize>, usize> {
    let mut marks = vec![Mark::Unvisited; edges.len()];
    let mut order = Vec::with_capacity(edges.len());

    for start in 0..edges.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }

        marks[start] = Mark::Visiting;
        // (node, index of the next edge to follow)
        let mut stack = vec![(start, 0usize)];

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            let next = edges[node].get(frame.1).copied();
            frame.1 += 1;

            match next {
                Some(dep) => match marks[dep] {
                    Mark::Unvisited => {
                        marks[dep] = Mark::Visiting;
                        stack.push((dep, 0));
                    }
                    Mark::Visiting => return Err(dep),
                    Mark::Done => {}
                },
                None => {
                    marks[node] = Mark::Done;
                    order.push(node);
                    stack.pop();
                }
            }
        }
    }

    Ok(order)
}
