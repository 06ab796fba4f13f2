use std::thread;

/// Bounded pool that maps a slice in parallel and returns results in
/// input order.
///
/// Workers pull indices from a shared queue and send `(index, result)` back;
/// the caller reassembles by index. Threads are scoped to one `map` call, so
/// borrowed inputs need no `'static` bound.
#[derive(Clone, Copy, Debug)]
pub struct OrderedWorkerPool {
    workers: usize,
}

impl OrderedWorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// One worker, no threads spawned.
    pub fn sequential() -> Self {
        Self::new(1)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(usize, &T) -> R + Sync,
    {
        let threads = self.workers.min(items.len());
        if threads <= 1 {
            return items.iter().enumerate().map(|(i, item)| f(i, item)).collect();
        }

        let (job_tx, job_rx) = crossbeam_channel::bounded::<usize>(items.len());
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<(usize, R)>();
        for i in 0..items.len() {
            // Capacity equals the job count, so this never blocks
            let _ = job_tx.send(i);
        }
        drop(job_tx);

        let f = &f;
        thread::scope(|s| {
            for _ in 0..threads {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                s.spawn(move || {
                    for i in job_rx {
                        if result_tx.send((i, f(i, &items[i]))).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_tx);

        let mut slots: Vec<Option<R>> = (0..items.len()).map(|_| None).collect();
        for (i, result) in result_rx {
            slots[i] = Some(result);
        }
        slots.into_iter().flatten().collect()
    }
}

impl Default for OrderedWorkerPool {
    fn default() -> Self {
        let workers = thread::available_parallelism().map_or(1, |n| n.get());
        Self::new(workers)
    }
}
