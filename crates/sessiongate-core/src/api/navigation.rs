use tracing::info;

/// Sends the application back to its login entry point.
///
/// The gateway calls this after it has cleared a session the backend
/// rejected. Front ends decide what "navigate" means for them.
pub trait Navigator: Send + Sync {
    fn redirect_to_login(&self, route: &str);
}

/// Navigator that only records the redirect in the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn redirect_to_login(&self, route: &str) {
        info!(route, "Session rejected, redirecting to login");
    }
}
