//! A type-indexed dependency injection container paired with a lifecycle
//! runtime and worker supervisor, for long-lived network services that need
//! deterministic startup/shutdown ordering and self-healing background
//! workers.
//!
//! - [`Container`] / [`Registration`] — registration and resolution
//!   (singleton, eager, transient, and instance bindings; named bindings;
//!   field-tag injection via `#[derive(Inject)]`).
//! - [`LifecycleRuntime`] — starts and stops registered services in
//!   dependency order.
//! - [`supervisor`] / [`manager`] — panic-recovering, backed-off, circuit-
//!   broken worker supervision.
//! - [`app`] — ties all three together behind one `run(ctx)` call.
//!
//! ```
//! use std::sync::Arc;
//! use ironframe::{Container, Inject, Lifestyle};
//!
//! struct Greeter;
//! impl Inject for Greeter {}
//!
//! let container = Container::new();
//! container
//!     .register::<Greeter>()
//!     .provider(|_| Ok(Greeter))
//!     .lifestyle(Lifestyle::Singleton)
//!     .finish()
//!     .unwrap();
//! container.build().unwrap();
//! let greeter: Arc<Greeter> = container.resolve().unwrap();
//! let _ = greeter;
//! ```

// So `#[derive(Inject)]`'s generated `::ironframe::...` paths resolve inside
// this crate's own tests and doctests, exactly as if they were an external
// dependent crate.
extern crate self as ironframe;

pub mod app;
mod chain;
#[cfg(feature = "config")]
pub mod config;
mod container;
mod descriptor;
mod graph;
mod inject;
mod key;
mod lifecycle;
pub mod manager;
pub mod observer;
pub mod supervisor;

mod error;
mod lifestyle;
mod registry;

pub use app::Application;
#[cfg(feature = "config")]
pub use config::ConfigView;
pub use container::{Container, Registration};
pub use error::{DiError, DiResult};
pub use inject::Inject;
pub use key::Identity;
pub use lifecycle::{AppState, LifecycleRuntime};
pub use lifestyle::Lifestyle;
pub use manager::WorkerManager;
pub use observer::{Observer, TracingObserver};
pub use supervisor::{DeadLetterEvent, Worker, WorkerOptions};

#[cfg(feature = "derive")]
pub use ironframe_derive::Inject;
