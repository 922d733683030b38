use crate::error::AccessError;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Lifetime of one console screen.
///
/// Requests started through a scope run on their own task. Cancelling the
/// scope (or dropping it) stops their results from being delivered, but
/// the request itself runs to completion so session clean-up on an
/// AuthFailure always happens.
#[derive(Debug, Default)]
pub struct ScreenScope {
    token: CancellationToken,
}

impl ScreenScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope that is cancelled together with `self`.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Run `request` for this screen. `None` means the screen went away
    /// before the result arrived.
    pub async fn run<T, F>(&self, request: F) -> Option<Result<T, AccessError>>
    where
        F: Future<Output = Result<T, AccessError>> + Send + 'static,
        T: Send + 'static,
    {
        if self.token.is_cancelled() {
            return None;
        }

        let handle = tokio::spawn(request);

        tokio::select! {
            _ = self.token.cancelled() => {
                tracing::debug!("Screen closed, dropping late response");
                None
            }
            joined = handle => Some(joined.unwrap_or_else(|e| {
                Err(AccessError::Transport(format!("request task failed: {}", e)))
            })),
        }
    }
}

impl Drop for ScreenScope {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
