use std::fmt;
use std::future::Future;

use futures::FutureExt;
use futures::future::LocalBoxFuture;

/// The outcome of invoking a queued callback: either a value that is available right away or a
/// future that will eventually produce it.
///
/// Both forms settle the callback's [`Promise`][crate::Promise] with the same value, so callers
/// awaiting the promise cannot tell them apart.
#[non_exhaustive]
pub enum Settle<T> {
    /// The callback produced its value synchronously.
    Ready(T),

    /// The callback produced a future that must be awaited to obtain the value.
    Deferred(LocalBoxFuture<'static, T>),
}

impl<T> Settle<T> {
    /// Settles with a value that is already available.
    #[must_use]
    pub fn ready(value: T) -> Self {
        Self::Ready(value)
    }

    /// Settles with the output of `future`.
    #[must_use]
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = T> + 'static,
    {
        Self::Deferred(future.boxed_local())
    }
}

impl<T> fmt::Debug for Settle<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(_) => f.write_str("Settle::Ready(..)"),
            Self::Deferred(_) => f.write_str("Settle::Deferred(..)"),
        }
    }
}

/// A callback that can be placed in a [`FunctionQueue`][crate::FunctionQueue] owned by `O`.
///
/// The callback receives the owner by reference when it is invoked and settles the promise
/// returned at enqueue time with a value of type `T`.
///
/// Most callers never name this type, using [`FunctionQueue::enqueue()`][1] or
/// [`FunctionQueue::enqueue_async()`][2] instead. It exists for callers that carry callbacks
/// around as type-erased values and hand them to [`FunctionQueue::try_enqueue()`][3].
///
/// [1]: crate::FunctionQueue::enqueue
/// [2]: crate::FunctionQueue::enqueue_async
/// [3]: crate::FunctionQueue::try_enqueue
pub struct Job<O, T> {
    callback: Box<dyn FnOnce(&O) -> Settle<T>>,
}

impl<O, T> Job<O, T>
where
    O: 'static,
    T: 'static,
{
    /// Creates a job whose callback returns its value synchronously.
    ///
    /// # Example
    ///
    /// ```rust
    /// use function_queue::Job;
    ///
    /// let job = Job::<String, usize>::new(|owner| owner.len());
    /// ```
    #[must_use]
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce(&O) -> T + 'static,
    {
        Self::from_settle(move |owner| Settle::Ready(callback(owner)))
    }

    /// Creates a job whose callback returns a future; the promise settles with its output.
    ///
    /// The future must not borrow from the owner. Clone whatever it needs out of the owner
    /// before returning it.
    #[must_use]
    pub fn deferred<F, Fut>(callback: F) -> Self
    where
        F: FnOnce(&O) -> Fut + 'static,
        Fut: Future<Output = T> + 'static,
    {
        Self::from_settle(move |owner| Settle::deferred(callback(owner)))
    }

    /// Creates a job whose callback decides at invocation time whether to settle synchronously
    /// or asynchronously.
    #[must_use]
    pub fn from_settle<F>(callback: F) -> Self
    where
        F: FnOnce(&O) -> Settle<T> + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    pub(crate) fn invoke(self, owner: &O) -> Settle<T> {
        (self.callback)(owner)
    }
}

impl<O, T> fmt::Debug for Job<O, T> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use futures::executor::block_on;
    use static_assertions::assert_not_impl_any;

    use super::*;

    assert_not_impl_any!(Job<(), ()>: Send, Sync);
    assert_not_impl_any!(Settle<()>: Send, Sync);

    #[test]
    fn new_job_settles_ready() {
        let job = Job::<u32, u32>::new(|owner| owner * 2);

        match job.invoke(&21) {
            Settle::Ready(value) => assert_eq!(value, 42),
            Settle::Deferred(_) => panic!("expected a ready value"),
        }
    }

    #[test]
    fn deferred_job_settles_with_future_output() {
        let job = Job::<u32, u32>::deferred(|owner| {
            let owner = *owner;
            async move { owner + 1 }
        });

        match job.invoke(&41) {
            Settle::Ready(_) => panic!("expected a deferred value"),
            Settle::Deferred(future) => assert_eq!(block_on(future), 42),
        }
    }

    #[test]
    fn from_settle_job_chooses_form() {
        let job = Job::<bool, &str>::from_settle(|ready| {
            if *ready {
                Settle::ready("now")
            } else {
                Settle::deferred(async { "later" })
            }
        });

        assert!(matches!(job.invoke(&true), Settle::Ready("now")));
    }
}
