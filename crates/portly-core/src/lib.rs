// portly-core: Telemetry and control coordinator between portly-api and consumers.

pub mod command;
pub mod config;
pub mod convert;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod health;
pub mod model;
pub mod scheduler;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{PendingCommand, WriteOutcome};
pub use config::CoordinatorConfig;
pub use coordinator::{Coordinator, PortView};
pub use error::CoreError;
pub use events::CoordinatorEvent;
pub use health::{HealthDetector, Transition};
pub use scheduler::stagger_offset;
pub use store::StateCache;
pub use stream::SnapshotStream;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    AdminState, ConnectivityState, DeviceIdentity, Duplex, FailureCause, Health, LinkState,
    PoeDelivery, PoePriority, PoeStatus, PollOutcome, Port, PortCounters, PortMode, PortRates,
    Rate, Snapshot, SnapshotOrigin,
};

pub use portly_api::WriteOp;
