//! Error handling in the controller
use thiserror::Error;

/// Fatal startup failures
///
/// The reconciler itself never fails; the runtime still needs an error type for it.
#[derive(Error, Debug)]
pub enum Error {
    /// Logging options did not validate
    #[error("invalid logging configuration: {0}")]
    Logging(#[from] kref_logs::Error),

    /// No Kubernetes client could be inferred from the environment
    #[error("unable to create client: {0}")]
    Client(#[source] kube::Error),

    /// Pods cannot be listed, so the controller would never see any
    #[error("unable to list pods: {0}")]
    Controller(#[source] kube::Error),
}

impl Error {
    /// The message the `setup` logger reports this failure under
    #[must_use]
    pub fn setup_message(&self) -> &'static str {
        match self {
            Self::Logging(_) | Self::Client(_) => "unable to start manager",
            Self::Controller(_) => "unable to create controller",
        }
    }
}
