//! Static list scheduling and timing recomputation.
//!
//! The mapping of tasks to cores and the execution order on each core are
//! decided once from nominal execution times. Under uncertainty only the
//! timing changes: [`Schedule::recompute`] replays the same decisions with
//! perturbed durations.

use super::graph::TaskGraph;
use super::platform::Platform;

/// Task-to-core mapping, per-core order, and timing.
#[derive(Debug, Clone)]
pub struct Schedule {
    /// Core of each task.
    pub mapping: Vec<usize>,
    /// Tasks in the order they were placed; consistent with precedence and
    /// with the order on every core.
    pub sequence: Vec<usize>,
    pub start: Vec<f64>,
    pub finish: Vec<f64>,
    cores: usize,
}

impl Schedule {
    /// Earliest-finish-time list scheduling.
    ///
    /// Ready tasks are taken by decreasing bottom level (longest path to an
    /// exit task with core-averaged times); ties go to the lower index. Each
    /// task goes to the core where it would finish first.
    pub fn list(graph: &TaskGraph, platform: &Platform) -> Self {
        let n = graph.len();
        let cores = platform.cores();

        let mut priority = vec![0.0; n];
        for &task in graph.topological_order().iter().rev() {
            let tail = graph
                .children(task)
                .iter()
                .map(|&c| priority[c])
                .fold(0.0, f64::max);
            priority[task] = platform.mean_time(task) + tail;
        }

        let mut pending: Vec<usize> = (0..n).map(|t| graph.parents(t).len()).collect();
        let mut ready: Vec<usize> = (0..n).filter(|&t| pending[t] == 0).collect();
        let mut available = vec![0.0; cores];
        let mut mapping = vec![0; n];
        let mut sequence = Vec::with_capacity(n);
        let mut start = vec![0.0; n];
        let mut finish = vec![0.0; n];

        while let Some(slot) = (0..ready.len()).max_by(|&i, &j| {
            let (a, b) = (ready[i], ready[j]);
            priority[a].total_cmp(&priority[b]).then_with(|| b.cmp(&a))
        }) {
            let task = ready.swap_remove(slot);

            let released = graph
                .parents(task)
                .iter()
                .map(|&p| finish[p])
                .fold(0.0, f64::max);
            let mut best = (0, f64::INFINITY, 0.0);
            for core in 0..cores {
                let begin = released.max(available[core]);
                let end = begin + platform.time(task, core);
                if end < best.1 {
                    best = (core, end, begin);
                }
            }
            let (core, end, begin) = best;
            mapping[task] = core;
            start[task] = begin;
            finish[task] = end;
            available[core] = end;
            sequence.push(task);

            for &child in graph.children(task) {
                pending[child] -= 1;
                if pending[child] == 0 {
                    ready.push(child);
                }
            }
        }

        Self {
            mapping,
            sequence,
            start,
            finish,
            cores,
        }
    }

    pub fn cores(&self) -> usize {
        self.cores
    }

    /// Execution time of every task on its mapped core.
    pub fn durations(&self, platform: &Platform) -> Vec<f64> {
        self.mapping
            .iter()
            .enumerate()
            .map(|(task, &core)| platform.time(task, core))
            .collect()
    }

    /// Replay the schedule with new durations.
    pub fn recompute(&self, graph: &TaskGraph, durations: &[f64]) -> Self {
        let mut out = self.clone();
        out.recompute_in_place(graph, durations);
        out
    }

    /// Replay the schedule with new durations, reusing this schedule's buffers.
    pub fn recompute_in_place(&mut self, graph: &TaskGraph, durations: &[f64]) {
        let mut available = vec![0.0; self.cores];
        for &task in &self.sequence {
            let released = graph
                .parents(task)
                .iter()
                .map(|&p| self.finish[p])
                .fold(0.0, f64::max);
            let core = self.mapping[task];
            let begin = released.max(available[core]);
            self.start[task] = begin;
            self.finish[task] = begin + durations[task];
            available[core] = self.finish[task];
        }
    }

    /// Time at which the last task finishes (end-to-end delay).
    pub fn span(&self) -> f64 {
        self.finish.iter().copied().fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn two_core_platform(times: &[f64]) -> Platform {
        Platform::new(
            times.iter().map(|&t| vec![t, t]).collect(),
            times.iter().map(|_| vec![1.0, 1.0]).collect(),
            vec![0.0, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn test_independent_tasks_spread_over_cores() {
        let graph = TaskGraph::new(2, &[]).unwrap();
        let schedule = Schedule::list(&graph, &two_core_platform(&[1.0, 1.0]));
        assert_ne!(schedule.mapping[0], schedule.mapping[1]);
        assert_eq!(schedule.span(), 1.0);
    }

    #[test]
    fn test_chain_is_serialized() {
        let graph = TaskGraph::new(3, &[(0, 1), (1, 2)]).unwrap();
        let schedule = Schedule::list(&graph, &two_core_platform(&[1.0, 2.0, 3.0]));
        assert_eq!(schedule.start, vec![0.0, 1.0, 3.0]);
        assert_eq!(schedule.span(), 6.0);
    }

    #[test]
    fn test_precedence_holds() {
        let mut rng = StdRng::seed_from_u64(11);
        let graph = TaskGraph::random(25, &mut rng);
        let platform = Platform::random(3, 25, &mut rng);
        let schedule = Schedule::list(&graph, &platform);
        assert_eq!(schedule.sequence.len(), 25);
        for task in 0..25 {
            for &p in graph.parents(task) {
                assert!(schedule.start[task] >= schedule.finish[p]);
            }
        }
    }

    #[test]
    fn test_recompute_with_nominal_durations_is_identity() {
        let mut rng = StdRng::seed_from_u64(2);
        let graph = TaskGraph::random(15, &mut rng);
        let platform = Platform::random(2, 15, &mut rng);
        let schedule = Schedule::list(&graph, &platform);
        let again = schedule.recompute(&graph, &schedule.durations(&platform));
        assert_eq!(again.start, schedule.start);
        assert_eq!(again.finish, schedule.finish);
    }

    #[test]
    fn test_recompute_longer_durations_never_shrink_span() {
        let mut rng = StdRng::seed_from_u64(4);
        let graph = TaskGraph::random(15, &mut rng);
        let platform = Platform::random(2, 15, &mut rng);
        let schedule = Schedule::list(&graph, &platform);
        let longer: Vec<f64> = schedule
            .durations(&platform)
            .iter()
            .map(|d| d * 1.2)
            .collect();
        let slower = schedule.recompute(&graph, &longer);
        assert!(slower.span() >= schedule.span());
        assert_eq!(slower.mapping, schedule.mapping);
    }
}
