// ── Switch domain model ──
//
// Every type in this module is the canonical representation of switch
// state. Parser records from portly-api are merged into these types by
// `convert`, and consumers (CLI) depend only on them.

pub mod connectivity;
pub mod identity;
pub mod poe;
pub mod port;
pub mod snapshot;

// ── Re-exports ──────────────────────────────────────────────────────
// Flat access: `use portly_core::model::*` gives you everything.

pub use connectivity::{ConnectivityState, FailureCause, Health};
pub use identity::DeviceIdentity;
pub use poe::{PoeDelivery, PoePriority, PoeStatus};
pub use port::{AdminState, Duplex, LinkState, Port, PortCounters, PortMode, PortRates, Rate};
pub use snapshot::{PollOutcome, Snapshot, SnapshotOrigin};
