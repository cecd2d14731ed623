//! Continuation handed to middleware.

use std::fmt;

use crate::error::DispatchResult;
use crate::handler::BoxFuture;

type Continuation = Box<dyn FnOnce() -> BoxFuture<'static, DispatchResult> + Send>;

/// The rest of the update's processing.
///
/// Middleware receives a `Next` like any other argument. Calling
/// [`Next::run`] continues with the wrapped route; dropping it stops the
/// update silently.
///
/// ```rust,ignore
/// router.middleware(|bot: Bot, next: Next| async move {
///     if bot.user_id() == Some(BANNED) {
///         return Ok(());
///     }
///     next.run().await
/// });
/// ```
pub struct Next {
    inner: Continuation,
}

impl Next {
    pub(crate) fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> BoxFuture<'static, DispatchResult> + Send + 'static,
    {
        Self { inner: Box::new(f) }
    }

    /// Continues processing.
    pub async fn run(self) -> DispatchResult {
        (self.inner)().await
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Next")
    }
}
