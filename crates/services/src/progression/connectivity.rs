use std::sync::Arc;

use tracing::{info, warn};

use crate::error::ApiError;
use crate::github::GithubApi;

use super::presenter::{ConnectionStatus, Presenter};

/// Periodic reachability check against the rate-limit endpoint. Only the
/// indicator changes; the session is never touched.
pub struct ConnectivityProbe {
    api: GithubApi,
    presenter: Arc<dyn Presenter>,
    last: Option<ConnectionStatus>,
}

impl ConnectivityProbe {
    #[must_use]
    pub fn new(api: GithubApi, presenter: Arc<dyn Presenter>) -> Self {
        Self {
            api,
            presenter,
            last: None,
        }
    }

    #[must_use]
    pub fn last_status(&self) -> Option<ConnectionStatus> {
        self.last
    }

    /// Probe once and push the status to the presenter when it changed.
    pub async fn probe(&mut self) -> ConnectionStatus {
        let status = match self.api.rate_limit().await {
            Ok(()) => ConnectionStatus::Online,
            Err(ApiError::Status { status, .. }) => ConnectionStatus::Degraded(Some(status)),
            Err(ApiError::NotFound(_) | ApiError::Malformed(_)) => {
                ConnectionStatus::Degraded(None)
            }
            Err(err) => {
                warn!(error = %err, "connectivity probe failed");
                ConnectionStatus::Unreachable
            }
        };

        if self.last != Some(status) {
            info!(?status, "connection status changed");
            self.presenter.show_connection_status(status);
            self.last = Some(status);
        }
        status
    }
}
