//! Hook into the embedding application's navigation

use tracing::info;

/// Consumer-provided navigation to the login view.
///
/// Called once each time the session ends (logout, failed refresh, or a
/// request still unauthorized after its retry). Implementations should only
/// schedule the navigation and return.
pub trait LoginNavigator: Send + Sync {
    fn redirect_to_login(&self);
}

impl<F> LoginNavigator for F
where
    F: Fn() + Send + Sync,
{
    fn redirect_to_login(&self) {
        self()
    }
}

/// Navigator for headless embedding: only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnlyNavigator;

impl LoginNavigator for LogOnlyNavigator {
    fn redirect_to_login(&self) {
        info!("Session ended, login required");
    }
}
