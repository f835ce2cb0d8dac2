//! Run orchestrator: fan benchmark invocations out over a bounded pool of
//! workers, then fan each module's outputs back into one log.
//!
//! Invocations never share state: each writes its own temp file. Merging
//! starts only after every invocation has finished, and is ordered by the
//! slot each invocation was created for, not by completion time.

pub mod invoke;
pub mod merge;
pub mod pool;

pub use invoke::{Invocation, discover, execute};
pub use merge::{Slot, merge_slots};
pub use pool::run_bounded;

use crate::Result;
use crate::config::ValidatedConfig;
use anyhow::Context;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Outcome for one module.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleRun {
    pub name: String,
    pub out: PathBuf,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub modules: Vec<ModuleRun>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.modules.iter().map(|m| m.succeeded).sum()
    }

    pub fn failed(&self) -> usize {
        self.modules.iter().map(|m| m.failed).sum()
    }
}

/// Build the invocation list: per module, per benchmark (split mode, in
/// discovery order), per iteration.
pub fn plan(cfg: &ValidatedConfig) -> Vec<Invocation> {
    let mut tasks = Vec::new();
    for (idx, module) in cfg.modules.iter().enumerate() {
        let benches: Vec<Option<String>> = if cfg.split {
            match discover(&cfg.harness, &module.dir, &cfg.bench, &cfg.bench_re) {
                Ok(names) => {
                    if names.is_empty() {
                        warn!(module = %module.name, pattern = %cfg.bench, "no benchmarks matched");
                    }
                    names.into_iter().map(Some).collect()
                }
                Err(e) => {
                    error!(module = %module.name, error = %format!("{e:#}"), "benchmark discovery failed");
                    Vec::new()
                }
            }
        } else {
            vec![None]
        };
        for bench in benches {
            for iteration in 0..cfg.repeat {
                tasks.push(Invocation::new(idx, &module.out, bench.clone(), iteration));
            }
        }
    }
    tasks
}

/// Run every invocation, then merge each module's successful outputs into
/// its `out` path. Individual failures are logged and leave a gap; they
/// never stop sibling invocations.
pub fn run_all(cfg: &ValidatedConfig) -> Result<RunSummary> {
    for module in &cfg.modules {
        if let Some(dir) = module.out.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create directory {}", dir.display()))?;
        }
    }

    let tasks = plan(cfg);
    info!(invocations = tasks.len(), jobs = cfg.jobs, "starting benchmark runs");

    let outcomes: Vec<bool> = run_bounded(cfg.jobs, &tasks, |inv| {
        let module = &cfg.modules[inv.module];
        let pattern = inv.pattern(&cfg.bench);
        match execute(&cfg.harness, &module.dir, &pattern, &inv.temp_path) {
            Ok(()) => {
                info!(module = %module.name, bench = ?inv.bench, iteration = inv.iteration, "run finished");
                true
            }
            Err(e) => {
                error!(
                    module = %module.name,
                    bench = ?inv.bench,
                    iteration = inv.iteration,
                    error = %format!("{e:#}"),
                    "run failed"
                );
                false
            }
        }
    });

    let mut slots: Vec<Vec<Slot>> = vec![Vec::new(); cfg.modules.len()];
    for (inv, ok) in tasks.iter().zip(outcomes) {
        slots[inv.module].push(Slot {
            temp_path: inv.temp_path.clone(),
            ok,
        });
    }

    // Output files are disjoint, so modules merge in parallel.
    let indices: Vec<usize> = (0..cfg.modules.len()).collect();
    let merged = run_bounded(cfg.jobs, &indices, |&idx| {
        merge_slots(&cfg.modules[idx].out, &slots[idx])
    });

    let mut summary = RunSummary::default();
    for ((module, slots), merged) in cfg.modules.iter().zip(&slots).zip(merged) {
        let succeeded = match merged {
            Ok(n) => n,
            Err(e) => {
                error!(module = %module.name, error = %format!("{e:#}"), "merge failed");
                0
            }
        };
        info!(
            module = %module.name,
            out = %module.out.display(),
            succeeded,
            failed = slots.len() - succeeded,
            "merged"
        );
        summary.modules.push(ModuleRun {
            name: module.name.clone(),
            out: module.out.clone(),
            succeeded,
            failed: slots.len() - succeeded,
        });
    }
    Ok(summary)
}
