// ── Snapshot store ──
//
// Lock-free snapshot storage with push-based change notification.

mod state_cache;

pub use state_cache::StateCache;
