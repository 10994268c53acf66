use std::time::Duration;

use itertools::Itertools;

use crate::engine::EngineKind;

/// Fully determines one throughput scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfiguration {
    pub engine: EngineKind,
    pub task_count: u64,
    pub delay: Duration,
    /// Worker count for the bounded pool, carrier count for lightweight units.
    pub concurrency: usize,
    pub timeout: Duration,
    pub drain_timeout: Duration,
    /// Only used by the bounded pool.
    pub worker_stack_size: usize,
    /// The most workers or carriers an engine may create.
    pub concurrency_limit: usize,
}

/// Settings shared by every configuration a [ScenarioMatrix] expands to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub delay: Duration,
    pub workers: usize,
    pub carriers: usize,
    pub timeout: Duration,
    pub drain_timeout: Duration,
    pub worker_stack_size: usize,
    pub concurrency_limit: usize,
}

/// The engines × task counts to run a workload over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioMatrix {
    pub engines: Vec<EngineKind>,
    pub task_counts: Vec<u64>,
}

impl ScenarioMatrix {
    /// One configuration per engine and task count.
    ///
    /// Grouped by task count, so the engines for the same workload run one after another. Repeated
    /// engines or task counts only appear once.
    pub fn expand(&self, settings: &EngineSettings) -> Vec<EngineConfiguration> {
        let engines = self.engines.iter().copied().unique().collect::<Vec<_>>();

        self.task_counts
            .iter()
            .copied()
            .unique()
            .cartesian_product(engines)
            .map(|(task_count, engine)| EngineConfiguration {
                engine,
                task_count,
                delay: settings.delay,
                concurrency: match engine {
                    EngineKind::BoundedPool => settings.workers,
                    EngineKind::Lightweight => settings.carriers,
                },
                timeout: settings.timeout,
                drain_timeout: settings.drain_timeout,
                worker_stack_size: settings.worker_stack_size,
                concurrency_limit: settings.concurrency_limit,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn settings() -> EngineSettings {
        EngineSettings {
            delay: Duration::from_millis(10),
            workers: 64,
            carriers: 4,
            timeout: Duration::from_secs(120),
            drain_timeout: Duration::from_secs(5),
            worker_stack_size: 2 * 1024 * 1024,
            concurrency_limit: 10_000,
        }
    }

    #[test]
    fn expands_counts_then_engines() {
        let matrix = ScenarioMatrix {
            engines: vec![EngineKind::BoundedPool, EngineKind::Lightweight],
            task_counts: vec![1_000, 10_000],
        };

        let expanded = matrix
            .expand(&settings())
            .into_iter()
            .map(|c| (c.task_count, c.engine, c.concurrency))
            .collect::<Vec<_>>();

        assert_eq!(
            vec![
                (1_000, EngineKind::BoundedPool, 64),
                (1_000, EngineKind::Lightweight, 4),
                (10_000, EngineKind::BoundedPool, 64),
                (10_000, EngineKind::Lightweight, 4),
            ],
            expanded
        );
    }

    #[test]
    fn repeated_entries_are_dropped() {
        let matrix = ScenarioMatrix {
            engines: vec![EngineKind::Lightweight, EngineKind::Lightweight],
            task_counts: vec![5, 5, 0],
        };

        let expanded = matrix.expand(&settings());
        assert_eq!(2, expanded.len());
        assert_eq!(5, expanded[0].task_count);
        assert_eq!(0, expanded[1].task_count);
    }

    #[test]
    fn empty_matrix_expands_to_nothing() {
        let matrix = ScenarioMatrix {
            engines: vec![],
            task_counts: vec![1_000],
        };
        assert!(matrix.expand(&settings()).is_empty());
    }
}
