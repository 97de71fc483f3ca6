//! Fork-join sweep over amplitude groups

use super::geometry::IndexWidth;
use crate::error::{Result, SimulatorError};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::fmt;

/// Narrow unsigned integer used as the free-bit counter
pub trait Counter: Copy + Send + Sync + 'static {
    /// Convert a counter value known to fit
    fn from_u64(value: u64) -> Option<Self>;

    /// Call `f` for every value in `0..upper`, fanned out over the current rayon pool
    fn for_each_parallel<F: Fn(u64) + Send + Sync>(upper: Self, f: &F);

    /// Call `f` for every value in `0..upper`, in order
    fn for_each_serial<F: Fn(u64)>(upper: Self, f: &F);
}

macro_rules! impl_counter {
    ($($t:ty),*) => {$(
        impl Counter for $t {
            #[inline]
            fn from_u64(value: u64) -> Option<Self> {
                <$t>::try_from(value).ok()
            }

            fn for_each_parallel<F: Fn(u64) + Send + Sync>(upper: Self, f: &F) {
                (0..upper).into_par_iter().for_each(|c| f(u64::from(c)));
            }

            fn for_each_serial<F: Fn(u64)>(upper: Self, f: &F) {
                (0..upper).for_each(|c| f(u64::from(c)));
            }
        }
    )*};
}

impl_counter!(u8, u16, u32);

/// Runs a per-group callback over every counter value of a sweep
///
/// With a pool the bulk of the sweep is split across its workers; without
/// one it runs on the calling thread. In both cases the last counter value
/// is executed on its own after the bulk completes, and the call blocks
/// until every group is done.
pub struct ParallelExecutor {
    pool: Option<ThreadPool>,
}

impl ParallelExecutor {
    /// Executor that never leaves the calling thread
    pub fn serial() -> Self {
        Self { pool: None }
    }

    /// Executor with its own pool of `num_threads` workers
    ///
    /// `0` uses the rayon default worker count. Falls back to serial
    /// execution when the pool cannot be created.
    pub fn threaded(num_threads: usize) -> Self {
        let num_threads = if num_threads == 0 {
            rayon::current_num_threads().max(1)
        } else {
            num_threads
        };

        match rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("qfuse-worker-{}", i))
            .build()
        {
            Ok(pool) => Self { pool: Some(pool) },
            Err(err) => {
                tracing::warn!(%err, num_threads, "thread pool unavailable, sweeping serially");
                Self::serial()
            },
        }
    }

    /// Number of threads a sweep runs on
    pub fn num_threads(&self) -> usize {
        self.pool.as_ref().map_or(1, |pool| pool.current_num_threads())
    }

    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    /// Run `f` for every counter value in `0..=upper_bound`, using a counter of `width`
    ///
    /// Returns the number of callbacks made.
    pub fn sweep<F>(&self, width: IndexWidth, upper_bound: u64, f: F) -> Result<u64>
    where
        F: Fn(u64) + Send + Sync,
    {
        match width {
            IndexWidth::U8 => self.sweep_with::<u8, F>(upper_bound, f),
            IndexWidth::U16 => self.sweep_with::<u16, F>(upper_bound, f),
            IndexWidth::U32 => self.sweep_with::<u32, F>(upper_bound, f),
        }
    }

    fn sweep_with<C, F>(&self, upper_bound: u64, f: F) -> Result<u64>
    where
        C: Counter,
        F: Fn(u64) + Send + Sync,
    {
        let upper = C::from_u64(upper_bound).ok_or(SimulatorError::Capacity {
            what: "sweep upper bound",
            requested: upper_bound as usize,
            limit: u32::MAX as usize,
        })?;

        match &self.pool {
            Some(pool) => pool.install(|| C::for_each_parallel(upper, &f)),
            None => C::for_each_serial(upper, &f),
        }
        f(upper_bound);

        Ok(upper_bound + 1)
    }
}

impl fmt::Debug for ParallelExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelExecutor")
            .field("num_threads", &self.num_threads())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn test_serial_visits_every_value_in_order() {
        let executor = ParallelExecutor::serial();
        let seen = Mutex::new(Vec::new());
        let visited = executor
            .sweep(IndexWidth::U8, 9, |c| seen.lock().push(c))
            .unwrap();

        assert_eq!(visited, 10);
        assert_eq!(*seen.lock(), (0..=9).collect::<Vec<_>>());
    }

    #[test]
    fn test_threaded_visits_full_u8_range() {
        let executor = ParallelExecutor::threaded(4);
        let seen = Mutex::new(HashSet::new());
        let count = AtomicU64::new(0);
        let visited = executor
            .sweep(IndexWidth::U8, u64::from(u8::MAX), |c| {
                count.fetch_add(1, Ordering::Relaxed);
                seen.lock().insert(c);
            })
            .unwrap();

        assert_eq!(visited, 256);
        assert_eq!(count.load(Ordering::Relaxed), 256);
        assert_eq!(seen.lock().len(), 256);
    }

    #[test]
    fn test_single_group() {
        let executor = ParallelExecutor::threaded(2);
        let count = AtomicU64::new(0);
        let visited = executor
            .sweep(IndexWidth::U8, 0, |c| {
                assert_eq!(c, 0);
                count.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();
        assert_eq!(visited, 1);
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_thread_count() {
        assert_eq!(ParallelExecutor::serial().num_threads(), 1);
        assert!(!ParallelExecutor::serial().is_parallel());
        assert_eq!(ParallelExecutor::threaded(3).num_threads(), 3);
        assert!(ParallelExecutor::threaded(0).num_threads() >= 1);
    }

    #[test]
    fn test_upper_bound_must_fit_width() {
        let executor = ParallelExecutor::serial();
        assert!(executor.sweep(IndexWidth::U8, 256, |_| {}).is_err());
    }
}
