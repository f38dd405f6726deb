use std::sync::atomic::{AtomicUsize, Ordering};

/// Navigation to the login entry point, owned by the front-end.
///
/// Invoked by the gateway when a 401 ends an authenticated session.
pub trait LoginRedirect: Send + Sync {
    fn redirect_to_login(&self);
}

/// Does nothing. For callers that handle `ApiError::Unauthorized` themselves.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRedirect;

impl LoginRedirect for NoRedirect {
    fn redirect_to_login(&self) {}
}

/// Counts redirects instead of navigating.
#[derive(Debug, Default)]
pub struct RecordingRedirect {
    count: AtomicUsize,
}

impl RecordingRedirect {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl LoginRedirect for RecordingRedirect {
    fn redirect_to_login(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}
