//! Connects a queued callback to the promise handed out when it was enqueued.

use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::task::{LocalSpawn, LocalSpawnExt, noop_waker_ref};

use crate::promise::Resolve;
use crate::{Job, Rejection, Settle};

/// A callback bound to its promise, waiting to be invoked with the owner.
pub(crate) type Entry<O> = Box<dyn FnOnce(&O)>;

/// Wraps `job` into an entry that, when invoked with the owner, runs the callback and forwards
/// whatever it settles with to `resolve`.
///
/// A ready value settles the promise before the entry returns. A future is either spawned onto
/// `spawner` or, without one, polled once on the spot and, if still pending, handed to the
/// promise for its awaiter to drive. Either way the entry returns without waiting for the future
/// to complete.
///
/// Panics from the callback or its future reject the promise instead of unwinding into the
/// caller, so one failing entry never stops the entries queued after it.
pub(crate) fn pipe_resolver<O, T>(
    job: Job<O, T>,
    resolve: Resolve<T>,
    spawner: Option<Rc<dyn LocalSpawn>>,
) -> Entry<O>
where
    O: 'static,
    T: 'static,
{
    Box::new(move |owner: &O| {
        let settle = match panic::catch_unwind(AssertUnwindSafe(|| job.invoke(owner))) {
            Ok(settle) => settle,
            Err(payload) => {
                resolve.reject(Rejection::from_panic(payload));
                return;
            }
        };

        match settle {
            Settle::Ready(value) => resolve.resolve(value),
            Settle::Deferred(future) => {
                let guarded = AssertUnwindSafe(future)
                    .catch_unwind()
                    .map(|result| result.map_err(Rejection::from_panic));

                let Some(spawner) = spawner else {
                    let mut future = guarded.boxed_local();

                    // Run up to the first suspension point now, so a future that needs nothing
                    // else settles (or fails) even if its promise is never awaited.
                    match future.poll_unpin(&mut Context::from_waker(noop_waker_ref())) {
                        Poll::Ready(settled) => resolve.settle(settled),
                        Poll::Pending => resolve.defer(future),
                    }
                    return;
                };

                if let Err(error) = spawner.status_local() {
                    resolve.reject(Rejection::Spawn(error));
                    return;
                }

                // If spawning still fails, the task (and the resolve handle inside it) is
                // dropped and the promise reports the callback as abandoned.
                if let Err(error) = spawner.spawn_local(async move {
                    resolve.settle(guarded.await);
                }) {
                    tracing::warn!(%error, "spawner rejected a function queue callback future");
                }
            }
        }
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;

    use futures::channel::oneshot;
    use futures::executor::{LocalPool, block_on};

    use super::*;
    use crate::promise;
    use crate::test_utils::capture_logs;

    async fn mark_completed(completed: Rc<Cell<bool>>) {
        completed.set(true);
    }

    async fn explode(message: &'static str) -> u32 {
        panic!("{message}");
    }

    #[test]
    fn ready_value_settles_when_entry_runs() {
        let (resolve, mut promise) = promise::pair();
        let entry = pipe_resolver(Job::<u32, u32>::new(|owner| owner + 1), resolve, None);

        assert!((&mut promise).now_or_never().is_none());

        entry(&1);

        assert_eq!((&mut promise).now_or_never().unwrap().unwrap(), 2);
    }

    #[test]
    fn panicking_callback_rejects_promise() {
        let (resolve, promise) = promise::pair::<u32>();
        let entry = pipe_resolver(
            Job::<(), u32>::new(|()| panic!("callback exploded")),
            resolve,
            None,
        );

        entry(&());

        assert!(matches!(
            block_on(promise),
            Err(Rejection::Panicked { message }) if message == "callback exploded"
        ));
    }

    #[test]
    fn future_without_spawner_is_driven_by_promise() {
        let (resolve, promise) = promise::pair();
        let entry = pipe_resolver(
            Job::<u32, u32>::deferred(|owner| {
                let owner = *owner;
                async move { owner * 3 }
            }),
            resolve,
            None,
        );

        entry(&5);

        assert_eq!(block_on(promise).unwrap(), 15);
    }

    #[test]
    fn future_without_spawner_starts_before_awaited() {
        let started = Rc::new(Cell::new(false));
        let (release, gate) = oneshot::channel::<u32>();

        let (resolve, promise) = promise::pair();
        let entry = pipe_resolver(
            Job::<(), u32>::deferred({
                let started = Rc::clone(&started);
                move |()| {
                    started.set(true);
                    async move { gate.await.unwrap_or_default() }
                }
            }),
            resolve,
            None,
        );

        entry(&());
        assert!(started.get());

        release.send(4).unwrap();
        assert_eq!(block_on(promise).unwrap(), 4);
    }

    #[test]
    fn completed_future_without_spawner_needs_no_awaiter() {
        let completed = Rc::new(Cell::new(false));

        let (resolve, promise) = promise::pair::<()>();
        drop(promise);

        let entry = pipe_resolver(
            Job::<(), ()>::deferred({
                let completed = Rc::clone(&completed);
                move |()| mark_completed(completed)
            }),
            resolve,
            None,
        );

        entry(&());

        assert!(completed.get());
    }

    #[test]
    fn future_with_spawner_runs_without_awaiter() {
        let mut pool = LocalPool::new();
        let spawner: Rc<dyn LocalSpawn> = Rc::new(pool.spawner());
        let completed = Rc::new(Cell::new(false));

        let (resolve, promise) = promise::pair::<()>();
        drop(promise);

        let entry = pipe_resolver(
            Job::<(), ()>::deferred({
                let completed = Rc::clone(&completed);
                move |()| mark_completed(completed)
            }),
            resolve,
            Some(spawner),
        );

        entry(&());
        assert!(!completed.get());

        pool.run_until_stalled();
        assert!(completed.get());
    }

    #[test]
    fn panicking_future_rejects_promise() {
        let mut pool = LocalPool::new();
        let spawner: Rc<dyn LocalSpawn> = Rc::new(pool.spawner());

        let (resolve, promise) = promise::pair::<u32>();
        let entry = pipe_resolver(
            Job::<(), u32>::deferred(|()| explode("future exploded")),
            resolve,
            Some(spawner),
        );

        entry(&());

        assert!(matches!(
            pool.run_until(promise),
            Err(Rejection::Panicked { message }) if message == "future exploded"
        ));
    }

    #[test]
    fn panicking_future_without_awaiter_is_reported() {
        let (resolve, promise) = promise::pair::<u32>();
        drop(promise);

        let entry = pipe_resolver(
            Job::<(), u32>::deferred(|()| explode("nobody awaits this")),
            resolve,
            None,
        );

        let ((), logs) = capture_logs(|| entry(&()));

        assert!(logs.contains("WARN"));
        assert!(logs.contains("unhandled rejection"));
        assert!(logs.contains("nobody awaits this"));
    }
}
