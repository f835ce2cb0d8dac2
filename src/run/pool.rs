use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

/// Run `work` over every task on at most `jobs` OS threads and return the
/// results in task order, whatever order they finished in.
///
/// Workers pull the next task index from a shared counter; results travel
/// back over a channel tagged with that index.
pub fn run_bounded<T, R, F>(jobs: usize, tasks: &[T], work: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let workers = jobs.max(1).min(tasks.len());
    if workers <= 1 {
        return tasks.iter().map(&work).collect();
    }

    let next = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<(usize, R)>();
    let mut done: Vec<(usize, R)> = thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let (next, work) = (&next, &work);
            scope.spawn(move || {
                loop {
                    let idx = next.fetch_add(1, Ordering::Relaxed);
                    let Some(task) = tasks.get(idx) else {
                        break;
                    };
                    if tx.send((idx, work(task))).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);
        rx.iter().collect()
    });

    done.sort_by_key(|(idx, _)| *idx);
    done.into_iter().map(|(_, r)| r).collect()
}
