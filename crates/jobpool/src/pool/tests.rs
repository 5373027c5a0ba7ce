use crate::{
    CancellationToken, DoubleError, Doubler, Error, PoolConfig, Transform, TransformError,
    WorkerPool, dispatch, dispatch_blocking, from_fn,
};
use core::time::Duration;
use futures::StreamExt;
use std::sync::{Arc, Mutex};

const TIMEOUT: Duration = Duration::from_secs(10);

fn fast(num_workers: usize) -> PoolConfig {
    PoolConfig::with_workers(num_workers).job_delay(Duration::ZERO)
}

fn sorted<T: Ord>(mut values: Vec<T>) -> Vec<T> {
    values.sort_unstable();
    values
}

/// Drains a pool with a zero delay and returns the sorted successes.
async fn run_doubler(jobs: Vec<i64>, num_workers: usize) -> Vec<i64> {
    let pool = WorkerPool::new(fast(num_workers), Doubler).unwrap();
    let outcomes: Vec<_> = tokio::time::timeout(TIMEOUT, pool.dispatch(jobs).collect())
        .await
        .expect("result stream never ended");
    sorted(outcomes.into_iter().map(Result::unwrap).collect())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn five_jobs_three_workers() {
    let mut results = dispatch(1..=5, 3).unwrap();

    let mut values = Vec::new();
    while let Some(outcome) = results.next().await {
        values.push(outcome.unwrap());
    }
    assert_eq!(sorted(values), vec![2, 4, 6, 8, 10]);

    let report = results.completion().await.unwrap();
    assert_eq!(report.workers, 3);
    assert_eq!(report.processed, 5);
    assert_eq!(report.failed, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn more_workers_than_jobs() {
    let results = tokio::time::timeout(TIMEOUT, async {
        let stream = dispatch([7], 3).unwrap();
        stream.map(Result::unwrap).collect::<Vec<_>>().await
    })
    .await
    .expect("idle workers deadlocked the pool");

    assert_eq!(results, vec![14]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn hundred_jobs_ten_workers() {
    let results = run_doubler((1..=100).collect(), 10).await;
    assert_eq!(results.len(), 100);
    assert_eq!(results, (1..=100_i64).map(|j| j * 2).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn empty_batch_ends_immediately() {
    let pool = WorkerPool::new(fast(4), Doubler).unwrap();
    let mut results = pool.dispatch(Vec::new());

    let first = tokio::time::timeout(TIMEOUT, results.next())
        .await
        .expect("empty stream never closed");
    assert!(first.is_none());

    let report = results.completion().await.unwrap();
    assert_eq!(report.total(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn output_multiset_is_independent_of_worker_count() {
    let jobs: Vec<i64> = (-50..50).rev().collect();
    let expected: Vec<i64> = sorted(jobs.iter().map(|j| j * 2).collect());

    for num_workers in [1, 2, 3, 7, 16, 200] {
        assert_eq!(run_doubler(jobs.clone(), num_workers).await, expected);
    }
    // Same input twice, same multiset.
    assert_eq!(
        run_doubler(jobs.clone(), 5).await,
        run_doubler(jobs, 5).await
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_worker_processes_in_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = {
        let seen = Arc::clone(&seen);
        from_fn(move |job: &u32| -> Result<u32, DoubleError> {
            seen.lock().unwrap().push(*job);
            Ok(*job)
        })
    };

    let pool = WorkerPool::new(fast(1), recorder).unwrap();
    let results: Vec<_> = pool.dispatch(0..20).map(Result::unwrap).collect().await;

    assert_eq!(results, (0..20).collect::<Vec<u32>>());
    assert_eq!(*seen.lock().unwrap(), (0..20).collect::<Vec<u32>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn zero_workers_is_rejected() {
    assert!(matches!(
        dispatch([1, 2, 3], 0),
        Err(Error::InvalidConfig { .. })
    ));
    assert!(WorkerPool::new(fast(0), Doubler).is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failing_jobs_are_tagged_and_isolated() {
    let pool = WorkerPool::new(fast(2), Doubler).unwrap();
    let mut results = pool.dispatch([1, i64::MAX, 3, i64::MIN, 5]);

    let mut ok = Vec::new();
    let mut failed = Vec::new();
    while let Some(outcome) = results.next().await {
        match outcome {
            Ok(value) => ok.push(value),
            Err(TransformError { job, cause }) => {
                assert_eq!(cause, DoubleError::Overflow(job));
                failed.push(job);
            }
        }
    }

    assert_eq!(sorted(ok), vec![2, 6, 10]);
    assert_eq!(sorted(failed), vec![i64::MIN, i64::MAX]);

    let report = results.completion().await.unwrap();
    assert_eq!(report.processed, 3);
    assert_eq!(report.failed, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn undersized_queues_still_complete() {
    let config = fast(4).job_queue_capacity(1).result_queue_capacity(1);
    let pool = WorkerPool::new(config, Doubler).unwrap();

    let results: Vec<_> = tokio::time::timeout(TIMEOUT, pool.dispatch(0..500).collect())
        .await
        .expect("backpressure deadlocked the pool");

    assert_eq!(results.len(), 500);
    assert_eq!(
        sorted(results.into_iter().map(Result::unwrap).collect()),
        (0..500_i64).map(|j| j * 2).collect::<Vec<_>>()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pool_is_reusable() {
    let pool = WorkerPool::new(fast(3), Doubler).unwrap();

    for batch in [vec![1_i64, 2], vec![], vec![10, 20, 30]] {
        let expected = sorted(batch.iter().map(|j| j * 2).collect());
        let results: Vec<_> = pool.dispatch(batch).map(Result::unwrap).collect().await;
        assert_eq!(sorted(results), expected);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_stops_workers_between_jobs() {
    let config = PoolConfig::with_workers(2).job_delay(Duration::from_millis(20));
    let pool = WorkerPool::new(config, Doubler).unwrap();
    let mut results = pool.dispatch(0..1_000);

    assert!(results.next().await.is_some());
    results.cancel();
    assert!(results.is_cancelled());

    let mut drained = 1;
    while tokio::time::timeout(TIMEOUT, results.next())
        .await
        .expect("cancelled pool never closed its stream")
        .is_some()
    {
        drained += 1;
    }

    assert!(drained < 1_000);
    assert_eq!(results.completion().await, Err(Error::Cancelled));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parent_token_cancels_the_batch() {
    let shutdown = CancellationToken::new();
    let config = PoolConfig::with_workers(2).job_delay(Duration::from_millis(20));
    let pool = WorkerPool::new(config, Doubler).unwrap();

    let results = pool.dispatch_with_token(0..1_000, shutdown.child_token());
    shutdown.cancel();

    let outcomes: Vec<_> = tokio::time::timeout(TIMEOUT, results.collect())
        .await
        .expect("cancelled pool never closed its stream");
    assert!(outcomes.len() < 1_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn dropping_results_early_fails_the_batch() {
    let config = fast(2).result_queue_capacity(1);
    let pool = WorkerPool::new(config, Doubler).unwrap();
    let mut results = pool.dispatch(0..1_000);

    assert!(results.next().await.is_some());

    let err = tokio::time::timeout(TIMEOUT, results.completion())
        .await
        .expect("workers blocked on a dropped result stream")
        .unwrap_err();
    let Error::ChannelError { context } = err else {
        panic!("expected a channel error, got {err:?}");
    };
    assert!(context.starts_with("result stream dropped after"), "{context}");
    assert!(context.ends_with("of 1000 jobs"), "{context}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn report_counts_only_delivered_outcomes() {
    let config = fast(2).result_queue_capacity(1);
    let pool = WorkerPool::new(config.clone(), Doubler).unwrap();

    // A fully drained batch counts every job.
    let mut results = pool.dispatch(0..50);
    let mut delivered = 0;
    while results.next().await.is_some() {
        delivered += 1;
    }
    assert_eq!(results.completion().await.unwrap().total(), delivered);
    assert_eq!(delivered, 50);

    // Dropped early: at most the item read plus what fit in the queue.
    let mut results = pool.dispatch(0..1_000);
    assert!(results.next().await.is_some());
    let err = results.completion().await.unwrap_err();
    let Error::ChannelError { context } = err else {
        panic!("expected a channel error, got {err:?}");
    };
    let accepted: usize = context
        .trim_start_matches("result stream dropped after ")
        .split(' ')
        .next()
        .and_then(|n| n.parse().ok())
        .expect("count in error context");
    // One read by us, one buffered, one per worker racing the drop.
    assert!(accepted <= 1 + 1 + config.num_workers, "{accepted}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn panicking_worker_is_reported() {
    let fragile = from_fn(|job: &i64| -> Result<i64, DoubleError> {
        assert_ne!(*job, 3, "job 3 is cursed");
        Doubler.apply(job)
    });
    let pool = WorkerPool::new(fast(2), fragile).unwrap();
    let mut results = pool.dispatch(1..=5);

    let mut values = Vec::new();
    while let Some(outcome) = tokio::time::timeout(TIMEOUT, results.next())
        .await
        .expect("panicked worker left the stream open")
    {
        values.push(outcome.unwrap());
    }

    // The surviving worker drains everything except the job lost to the panic.
    assert_eq!(sorted(values), vec![2, 4, 8, 10]);
    assert!(matches!(
        results.completion().await,
        Err(Error::WorkerPanicked { .. })
    ));
}

#[test]
fn threaded_five_jobs_three_workers() {
    let mut results = dispatch_blocking(1..=5, &fast(3), Doubler).unwrap();

    let values: Vec<_> = results.by_ref().map(Result::unwrap).collect();
    assert_eq!(sorted(values), vec![2, 4, 6, 8, 10]);

    let report = results.completion().unwrap();
    assert_eq!(report.processed, 5);
}

#[test]
fn threaded_workers_run_in_parallel() {
    const WORKERS: usize = 4;
    // Every job waits until all `WORKERS` jobs are in flight at once, which
    // can only happen if each one landed on a different, concurrently running
    // worker.
    let rendezvous = Arc::new(std::sync::Barrier::new(WORKERS));
    let transform = {
        let rendezvous = Arc::clone(&rendezvous);
        from_fn(move |job: &i64| {
            rendezvous.wait();
            Doubler.apply(job)
        })
    };

    let results = dispatch_blocking(1..=4, &fast(WORKERS), transform).unwrap();
    let values: Vec<_> = results.map(Result::unwrap).collect();
    assert_eq!(sorted(values), vec![2, 4, 6, 8]);
}

#[test]
fn threaded_edge_cases() {
    let empty: Vec<_> = dispatch_blocking(Vec::new(), &fast(3), Doubler)
        .unwrap()
        .collect();
    assert!(empty.is_empty());

    let lonely: Vec<_> = dispatch_blocking([7], &fast(3), Doubler).unwrap().collect();
    assert_eq!(lonely, vec![Ok(14)]);

    assert!(matches!(
        dispatch_blocking([1], &fast(0), Doubler),
        Err(Error::InvalidConfig { .. })
    ));
}

#[test]
fn threaded_failures_and_small_queues() {
    let config = fast(3).job_queue_capacity(1).result_queue_capacity(1);
    let pool = WorkerPool::new(config, Doubler).unwrap();

    let jobs: Vec<i64> = (0..200).chain([i64::MAX]).collect();
    let mut results = pool.dispatch_blocking(jobs).unwrap();

    let (ok, failed): (Vec<_>, Vec<_>) = results.by_ref().partition(Result::is_ok);
    assert_eq!(ok.len(), 200);
    assert_eq!(
        failed,
        vec![Err(TransformError::new(
            i64::MAX,
            DoubleError::Overflow(i64::MAX)
        ))]
    );

    let report = results.completion().unwrap();
    assert_eq!((report.processed, report.failed), (200, 1));
}

#[test]
fn threaded_cancel() {
    let config = PoolConfig::with_workers(2).job_delay(Duration::from_millis(10));
    let mut results = dispatch_blocking(0..1_000, &config, Doubler).unwrap();

    assert!(results.next().is_some());
    results.cancel();

    let drained = results.by_ref().count();
    assert!(drained < 1_000);
    assert_eq!(results.completion(), Err(Error::Cancelled));
}

#[test]
fn threaded_dropping_results_early_fails_the_batch() {
    let config = fast(2).result_queue_capacity(1);
    let mut results = dispatch_blocking(0..1_000, &config, Doubler).unwrap();

    assert!(results.next().is_some());

    let Err(Error::ChannelError { context }) = results.completion() else {
        panic!("expected a channel error");
    };
    assert!(context.starts_with("result stream dropped after"), "{context}");
}
