//! A simple bounded map/reduce worker pool.
//!
//! A fixed pool of mapper tasks consumes work items from a bounded input
//! queue, applies the map function, and forwards results over a bounded
//! queue to a single reducer task. Backpressure is enforced by blocking
//! `push` when the input queue is full. Output order is not guaranteed.
//!
//! Shutdown is deterministic: `close` stops accepting work, waits for
//! every mapper to drain and exit, then waits for the reducer to consume
//! the remaining results, and finally returns the reducer's value.
//!
//! This is the only concurrency abstraction in the toolkit; it is kept
//! deliberately small.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// A running map/reduce pool accepting items of type `I`, whose reducer
/// produces a `T` on completion.
pub struct MapReduce<I, T> {
    work_tx: mpsc::Sender<I>,
    mappers: Vec<JoinHandle<()>>,
    reducer: JoinHandle<T>,
}

impl<I, T> MapReduce<I, T>
where
    I: Send + 'static,
    T: Send + 'static,
{
    /// Start `workers` mapper tasks and one reducer task.
    ///
    /// `map_fn` is applied to every pushed item; its results are handed
    /// to `reduce_fn`'s receiver in completion order. The receiver closes
    /// once every mapper has exited.
    pub fn start<O, M, MF, R, RF>(
        workers: usize,
        work_capacity: usize,
        reduce_capacity: usize,
        map_fn: M,
        reduce_fn: R,
    ) -> Self
    where
        O: Send + 'static,
        M: Fn(I) -> MF + Clone + Send + Sync + 'static,
        MF: Future<Output = O> + Send + 'static,
        R: FnOnce(mpsc::Receiver<O>) -> RF + Send + 'static,
        RF: Future<Output = T> + Send + 'static,
    {
        let (work_tx, work_rx) = mpsc::channel::<I>(work_capacity.max(1));
        let (out_tx, out_rx) = mpsc::channel::<O>(reduce_capacity.max(1));

        let work_rx = Arc::new(Mutex::new(work_rx));

        let mappers = (0..workers.max(1))
            .map(|_| {
                let work_rx = Arc::clone(&work_rx);
                let out_tx = out_tx.clone();
                let map_fn = map_fn.clone();

                tokio::spawn(async move {
                    loop {
                        // The lock is only held while waiting for an item,
                        // so mapping itself runs in parallel.
                        let item = work_rx.lock().await.recv().await;
                        let Some(item) = item else { break };

                        if out_tx.send(map_fn(item).await).await.is_err() {
                            break;
                        }
                    }
                })
            })
            .collect();

        // The mappers hold the only remaining result senders; when the
        // last mapper exits, the reducer's receiver closes.
        drop(out_tx);

        let reducer = tokio::spawn(reduce_fn(out_rx));

        Self {
            work_tx,
            mappers,
            reducer,
        }
    }

    /// Queue an item, suspending while the input queue is full. Returns
    /// false when the pool is no longer accepting work.
    pub async fn push(&self, item: I) -> bool {
        self.work_tx.send(item).await.is_ok()
    }

    /// Stop accepting work, wait for mappers and reducer to drain, and
    /// return the reducer's value.
    pub async fn close(self) -> T {
        drop(self.work_tx);

        for mapper in self.mappers {
            let _ = mapper.await;
        }

        self.reducer.await.expect("map/reduce reducer task panicked")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    #[tokio::test]
    async fn every_item_is_mapped_and_reduced_once() {
        let mr = MapReduce::start(
            4,
            10,
            20,
            |n: u32| async move {
                // Stagger completion so results interleave arbitrarily.
                tokio::time::sleep(Duration::from_millis((n % 7) as u64)).await;
                n * 2
            },
            |mut results: mpsc::Receiver<u32>| async move {
                let mut seen = Vec::new();
                while let Some(n) = results.recv().await {
                    seen.push(n);
                }
                seen
            },
        );

        for n in 0..100u32 {
            assert!(mr.push(n).await);
        }
        let seen = mr.close().await;

        assert_eq!(seen.len(), 100);
        let unique: HashSet<u32> = seen.iter().copied().collect();
        assert_eq!(unique.len(), 100);
        assert!(unique.iter().all(|n| n % 2 == 0));
    }

    #[tokio::test]
    async fn close_waits_for_in_flight_work() {
        let mr = MapReduce::start(
            2,
            100,
            10,
            |n: u32| async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                n
            },
            |mut results: mpsc::Receiver<u32>| async move {
                let mut count = 0;
                while results.recv().await.is_some() {
                    count += 1;
                }
                count
            },
        );

        for n in 0..20u32 {
            mr.push(n).await;
        }

        // Everything pushed before close must be reduced by the time
        // close returns.
        assert_eq!(mr.close().await, 20);
    }

    #[tokio::test]
    async fn errors_flow_through_as_values() {
        let mr = MapReduce::start(
            3,
            10,
            15,
            |n: u32| async move {
                if n % 3 == 0 {
                    Err(format!("item {} failed", n))
                } else {
                    Ok(n)
                }
            },
            |mut results: mpsc::Receiver<Result<u32, String>>| async move {
                let (mut ok, mut err) = (0, 0);
                while let Some(result) = results.recv().await {
                    match result {
                        Ok(_) => ok += 1,
                        Err(_) => err += 1,
                    }
                }
                (ok, err)
            },
        );

        for n in 0..30u32 {
            mr.push(n).await;
        }
        assert_eq!(mr.close().await, (20, 10));
    }

    #[tokio::test]
    async fn single_worker_preserves_nothing_but_still_drains() {
        let mr = MapReduce::start(
            1,
            1,
            1,
            |n: u32| async move { n },
            |mut results: mpsc::Receiver<u32>| async move {
                let mut total = 0u32;
                while let Some(n) = results.recv().await {
                    total += n;
                }
                total
            },
        );

        for n in 1..=10u32 {
            mr.push(n).await;
        }
        assert_eq!(mr.close().await, 55);
    }
}
