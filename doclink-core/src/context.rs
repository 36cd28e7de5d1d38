//! Cancellation and deadline propagation for collection operations.
//!
//! Every collection operation takes a [`Context`]. When the context's token is cancelled
//! or its deadline elapses, the in-flight store future is dropped and the operation
//! returns [`DocumentStoreError::Cancelled`] or [`DocumentStoreError::DeadlineExceeded`].
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use doclink::context::Context;
//!
//! let ctx = Context::new().with_timeout(Duration::from_secs(5));
//! let user: User = users.find_one(&ctx, Filter::eq("name", "Alice")).await?;
//! ```

use std::{future::Future, time::Duration};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// A cancellation token paired with an optional deadline.
///
/// Cloning a context shares its token, so cancelling any clone cancels them all.
/// Use [`Context::child`] to derive a context that can be cancelled independently of its parent.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// Creates a context that is never cancelled and has no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a context bound to an externally owned cancellation token.
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Returns a context whose deadline is `timeout` from now, or the existing
    /// deadline if that one is earlier.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Returns a context that expires at `deadline`, or at the existing deadline if earlier.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    /// Derives a context that is cancelled with this one but can also be cancelled on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Cancels this context and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Fails fast if the context is already cancelled or expired.
    pub fn check(&self) -> DocumentStoreResult<()> {
        if self.token.is_cancelled() {
            return Err(DocumentStoreError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Err(DocumentStoreError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Drives `fut` to completion unless the context is cancelled or expires first.
    ///
    /// `fut` is dropped as soon as either fires; cancellation takes priority over a
    /// simultaneously completed result.
    pub async fn run<F, T>(&self, fut: F) -> DocumentStoreResult<T>
    where
        F: Future<Output = DocumentStoreResult<T>>,
    {
        self.check()?;

        let expired = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(DocumentStoreError::Cancelled),
            _ = expired => Err(DocumentStoreError::DeadlineExceeded),
            result = fut => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_completes() {
        let ctx = Context::new();
        assert_eq!(ctx.run(async { Ok(7) }).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_run_passes_errors_through() {
        let ctx = Context::new();
        let err = ctx
            .run(async { Err::<(), _>(DocumentStoreError::NotFound("users".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_run_fails_when_already_cancelled() {
        let ctx = Context::new();
        ctx.cancel();

        let err = ctx.run(async { Ok(()) }).await.unwrap_err();
        assert!(matches!(err, DocumentStoreError::Cancelled));
    }

    #[tokio::test]
    async fn test_deadline_aborts_pending_future() {
        let ctx = Context::new().with_timeout(Duration::from_millis(10));
        let err = ctx
            .run(futures::future::pending::<DocumentStoreResult<()>>())
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentStoreError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_cancel_aborts_pending_future() {
        let ctx = Context::new();
        let canceller = ctx.clone();

        let (result, _) = tokio::join!(
            ctx.run(futures::future::pending::<DocumentStoreResult<()>>()),
            async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                canceller.cancel();
            },
        );
        assert!(matches!(result, Err(DocumentStoreError::Cancelled)));
    }

    #[test]
    fn test_child_cancellation() {
        let parent = Context::new();
        let child = parent.child();

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());

        let other = parent.child();
        parent.cancel();
        assert!(other.is_cancelled());
    }

    #[tokio::test]
    async fn test_deadline_keeps_earliest() {
        let ctx = Context::new().with_timeout(Duration::from_secs(1));
        let first = ctx.deadline().unwrap();

        let ctx = ctx.with_timeout(Duration::from_secs(60));
        assert_eq!(ctx.deadline(), Some(first));
    }
}
