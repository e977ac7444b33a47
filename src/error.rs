//! Error taxonomy for the container, lifecycle runtime, and worker supervisor.

use std::fmt;

use crate::key::Identity;

/// All errors returned by the public API. See `spec.md` §6 "Error taxonomy"
/// and §7 "Error Handling Design".
#[derive(Debug, Clone)]
pub enum DiError {
    /// No binding exists for the requested identity.
    NotFound(Identity),
    /// More than one unnamed candidate exists for an unnamed resolution.
    Ambiguous(Identity),
    /// A resolution re-entered an identity already on its own chain.
    /// Carries the full chain, e.g. `A -> B -> A`, for diagnostics.
    Cycle(Vec<Identity>),
    /// A second registration was attempted for an identity already bound.
    DuplicateRegistration(Identity),
    /// A field marked for injection could not be written.
    NotSettable(Identity),
    /// The lifecycle dependency DAG contains a cycle.
    LifecycleCycle(Vec<Identity>),
    /// A start hook did not complete within its configured timeout.
    StartTimeout(Identity),
    /// A stop hook did not complete within its configured timeout.
    StopTimeout(Identity),
    /// A worker's circuit breaker tripped after exceeding `MaxRestarts`.
    CircuitTripped { worker: String },
    /// A critical worker tripped; the application is shutting down.
    CriticalWorkerFailed { worker: String },
    /// `WorkerManager::register` was called after `start()`.
    ManagerAlreadyRunning,
    /// An eager service failed to build during `Container::build()`.
    BuildFailed {
        service: Identity,
        source: Box<DiError>,
    },
    /// A start or stop hook was attached to a Transient or Instance binding.
    InvalidHookPlacement(Identity),
    /// A provider function returned an application-level error.
    Provider(Identity, String),
}

pub type DiResult<T> = Result<T, DiError>;

impl fmt::Display for DiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiError::NotFound(id) => write!(f, "no binding found for {id}"),
            DiError::Ambiguous(id) => {
                write!(f, "ambiguous resolution for {id}: multiple unnamed candidates")
            }
            DiError::Cycle(chain) => write!(f, "circular dependency: {}", format_chain(chain)),
            DiError::DuplicateRegistration(id) => {
                write!(f, "duplicate registration for {id}")
            }
            DiError::NotSettable(id) => write!(f, "field injection target not settable: {id}"),
            DiError::LifecycleCycle(chain) => {
                write!(f, "lifecycle dependency cycle: {}", format_chain(chain))
            }
            DiError::StartTimeout(id) => write!(f, "start hook for {id} timed out"),
            DiError::StopTimeout(id) => write!(f, "stop hook for {id} timed out"),
            DiError::CircuitTripped { worker } => {
                write!(f, "worker '{worker}' tripped its circuit breaker")
            }
            DiError::CriticalWorkerFailed { worker } => {
                write!(f, "critical worker '{worker}' failed, shutting down")
            }
            DiError::ManagerAlreadyRunning => {
                write!(f, "worker manager is already running")
            }
            DiError::BuildFailed { service, source } => {
                write!(f, "build failed for {service}: {source}")
            }
            DiError::InvalidHookPlacement(id) => {
                write!(f, "start/stop hooks are only valid on Singleton/Eager bindings: {id}")
            }
            DiError::Provider(id, msg) => write!(f, "provider for {id} failed: {msg}"),
        }
    }
}

impl std::error::Error for DiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiError::BuildFailed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

fn format_chain(chain: &[Identity]) -> String {
    chain
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl DiError {
    /// Wraps this error as a [`DiError::BuildFailed`] naming `service`,
    /// matching spec.md scenario 3 ("`Build()` returns error naming `Cfg`").
    pub fn into_build_failed(self, service: Identity) -> DiError {
        DiError::BuildFailed {
            service,
            source: Box::new(self),
        }
    }
}
