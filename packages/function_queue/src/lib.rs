#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Defer callbacks until an object is ready, flush them once, then run everything immediately.
//!
//! Objects with a lifecycle gate ("do not run plugin hooks until setup finishes") often need to
//! accept work before they are able to perform it. A [`FunctionQueue`] collects such work as
//! callbacks. When the object is ready it flushes the queue, which invokes every collected
//! callback in the order it was enqueued and latches the queue into the executed state. From
//! that point on, newly enqueued callbacks run immediately instead of being queued.
//!
//! Every enqueue operation returns a [`Promise`] that settles with the callback's result.
//! Callbacks may return a plain value or a future (see [`Settle`]); the promise looks the same
//! to the caller either way. A callback that panics rejects its own promise with a
//! [`Rejection`] and does not disturb the other callbacks.
//!
//! The queue is meant to be embedded in the object it serves. That object is the *owner* and is
//! passed by reference to every callback. Implement [`DeferredExecution`] on the owner to expose
//! the queue's operations directly on it.
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//!
//! use function_queue::{DeferredExecution, FunctionQueue};
//! use futures::executor::block_on;
//!
//! #[derive(Default)]
//! struct Editor {
//!     plugins: RefCell<Vec<String>>,
//!     ready: FunctionQueue<Editor>,
//! }
//!
//! impl DeferredExecution for Editor {
//!     fn function_queue(&self) -> &FunctionQueue<Self> {
//!         &self.ready
//!     }
//! }
//!
//! let editor = Editor::default();
//!
//! // Setup has not finished yet, so this waits.
//! let registered = editor.enqueue(|editor| {
//!     editor.plugins.borrow_mut().push("spellcheck".to_string());
//!     editor.plugins.borrow().len()
//! });
//! assert!(editor.plugins.borrow().is_empty());
//!
//! // Setup is done: run everything that was waiting.
//! editor.execute();
//! assert_eq!(block_on(registered).unwrap(), 1);
//!
//! // From now on, callbacks run right away.
//! drop(editor.enqueue(|editor| editor.plugins.borrow_mut().push("git".to_string())));
//! assert_eq!(*editor.plugins.borrow(), ["spellcheck", "git"]);
//! ```
//!
//! # Asynchronous callbacks
//!
//! The queue never waits for a future returned by a callback: callbacks are started in order,
//! but their futures may complete in any order. Configure a spawner with
//! [`FunctionQueueBuilder::spawner()`] to drive those futures on an executor. Without one, each
//! future is polled once when its callback runs and is then driven by whoever awaits the
//! corresponding promise; a future still unfinished when its promise is dropped is cancelled.
//!
//! # Logging
//!
//! The crate emits [`tracing`] events: `trace` for individual callbacks, `debug` for flush
//! passes and `warn` for failures that no promise is left to report.

mod builder;
mod capability;
mod error;
mod latch;
mod promise;
mod queue;
mod resolver;
mod settle;

#[cfg(test)]
mod test_utils;

pub use builder::*;
pub use capability::*;
pub use error::*;
pub use promise::{Promise, Settled};
pub use queue::*;
pub use settle::*;
