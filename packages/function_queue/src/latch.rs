/// One-way execution state of a [`FunctionQueue`][crate::FunctionQueue].
///
/// A queue starts out `Pending` and transitions to `Executed` exactly once, at the end of its
/// first flush. There is no way back.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub(crate) enum Latch {
    /// Callbacks are collected in the queue store.
    #[default]
    Pending,

    /// Callbacks run as soon as they are enqueued.
    Executed,
}

impl Latch {
    #[must_use]
    pub(crate) fn is_executed(self) -> bool {
        matches!(self, Self::Executed)
    }
}
