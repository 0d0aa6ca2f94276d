/// SpaceLens Core: progressive scanning, caching and navigation.
///
/// This crate contains the whole engine with zero UI dependencies.
/// Frontends drive it through [`coordinator::service::CoordinatorHandle`]
/// (or a [`coordinator::ScanCoordinator`] they pump themselves) and receive
/// projections through the [`coordinator::publish::Publisher`] trait.
///
/// # Modules
///
/// - [`model`]: The value-like `Entry` record and size helpers.
/// - [`scanner`]: Probe, flat scanner, size aggregator and hierarchy builder.
/// - [`coordinator`]: Cache, history, generation tokens and publishing.
/// - [`config`]: Engine settings.
/// - [`error`]: Setup errors and the non-fatal scan fault taxonomy.
pub mod config;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod scanner;

pub use config::CoreConfig;
pub use coordinator::publish::{
    HierarchyProjection, ListProjection, Publisher, SharedView, SnapshotPublisher, ViewSnapshot,
};
pub use coordinator::service::{spawn_coordinator, CoordinatorHandle};
pub use coordinator::{ScanCoordinator, ScanPhase};
pub use error::{CoreError, ScanFault};
pub use model::Entry;
