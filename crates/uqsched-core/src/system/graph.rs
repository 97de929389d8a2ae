//! Directed acyclic task graphs.

use std::collections::VecDeque;

use nalgebra::DMatrix;
use rand::Rng;

use crate::error::{Error, Result};

/// Maximum distance (in task indices) between a generated task and its parents.
const PARENT_WINDOW: usize = 5;

/// Precedence constraints between tasks.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    parents: Vec<Vec<usize>>,
    children: Vec<Vec<usize>>,
}

impl TaskGraph {
    /// Build a graph of `tasks` tasks from `(parent, child)` edges.
    pub fn new(tasks: usize, edges: &[(usize, usize)]) -> Result<Self> {
        let mut parents = vec![Vec::new(); tasks];
        let mut children = vec![Vec::new(); tasks];
        for &(from, to) in edges {
            if from >= tasks || to >= tasks {
                return Err(Error::config(format!(
                    "edge ({from}, {to}) references a task outside 0..{tasks}"
                )));
            }
            if from == to {
                return Err(Error::config(format!("task {from} depends on itself")));
            }
            if !children[from].contains(&to) {
                children[from].push(to);
                parents[to].push(from);
            }
        }
        let graph = Self { parents, children };
        if graph.topological_order().len() != tasks {
            return Err(Error::config("task graph contains a cycle"));
        }
        Ok(graph)
    }

    /// Generate a connected random graph.
    ///
    /// Every task except the first gets one or two parents among the
    /// preceding few tasks, so edges always point forward.
    pub fn random<R: Rng>(tasks: usize, rng: &mut R) -> Self {
        let mut edges = Vec::new();
        for child in 1..tasks {
            let window = child.min(PARENT_WINDOW);
            let count = rng.random_range(1..=window.min(2));
            let mut chosen: Vec<usize> = Vec::with_capacity(count);
            while chosen.len() < count {
                let parent = child - rng.random_range(1..=window);
                if !chosen.contains(&parent) {
                    chosen.push(parent);
                }
            }
            edges.extend(chosen.into_iter().map(|parent| (parent, child)));
        }
        let mut parents = vec![Vec::new(); tasks];
        let mut children = vec![Vec::new(); tasks];
        for (from, to) in edges {
            children[from].push(to);
            parents[to].push(from);
        }
        Self { parents, children }
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn parents(&self, task: usize) -> &[usize] {
        &self.parents[task]
    }

    pub fn children(&self, task: usize) -> &[usize] {
        &self.children[task]
    }

    /// Tasks in an order where every parent precedes its children.
    ///
    /// Shorter than [`TaskGraph::len`] only if the graph has a cycle.
    pub fn topological_order(&self) -> Vec<usize> {
        let mut pending: Vec<usize> = self.parents.iter().map(Vec::len).collect();
        let mut queue: VecDeque<usize> = (0..self.len()).filter(|&t| pending[t] == 0).collect();
        let mut order = Vec::with_capacity(self.len());
        while let Some(task) = queue.pop_front() {
            order.push(task);
            for &child in &self.children[task] {
                pending[child] -= 1;
                if pending[child] == 0 {
                    queue.push_back(child);
                }
            }
        }
        order
    }

    /// Undirected hop distances between the given tasks.
    ///
    /// Unreachable pairs are `f64::INFINITY`.
    pub fn distances(&self, tasks: &[usize]) -> DMatrix<f64> {
        let mut out = DMatrix::from_element(tasks.len(), tasks.len(), f64::INFINITY);
        let mut hops = vec![usize::MAX; self.len()];
        let mut queue = VecDeque::new();
        for (row, &source) in tasks.iter().enumerate() {
            hops.fill(usize::MAX);
            hops[source] = 0;
            queue.clear();
            queue.push_back(source);
            while let Some(task) = queue.pop_front() {
                let next = hops[task] + 1;
                for &neighbor in self.parents[task].iter().chain(&self.children[task]) {
                    if hops[neighbor] == usize::MAX {
                        hops[neighbor] = next;
                        queue.push_back(neighbor);
                    }
                }
            }
            for (col, &target) in tasks.iter().enumerate() {
                if hops[target] != usize::MAX {
                    out[(row, col)] = hops[target] as f64;
                }
            }
        }
        out
    }
}
