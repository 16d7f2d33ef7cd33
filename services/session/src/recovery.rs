//! Recovery state of one authenticated request

/// Where an authenticated request stands in its 401 recovery.
///
/// The only path out of `NoRefreshAttempted` on a 401 goes through a single
/// refresh into `Retried`; a 401 seen in `Retried` has no successor, which is
/// what bounds every request to one refresh and one retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Recovery {
    NoRefreshAttempted,
    Refreshing,
    Retried,
}

impl Recovery {
    /// State after the server answered 401, `None` when the retry is spent
    pub(crate) fn on_unauthorized(self) -> Option<Self> {
        match self {
            Recovery::NoRefreshAttempted => Some(Recovery::Refreshing),
            Recovery::Refreshing | Recovery::Retried => None,
        }
    }

    /// State once the refresh produced a new token
    pub(crate) fn on_refreshed(self) -> Self {
        match self {
            Recovery::Refreshing => Recovery::Retried,
            other => other,
        }
    }
}
