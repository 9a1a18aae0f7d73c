// ── Query cache ──
//
// Keys, per-kind staleness policy, the entry store and invalidation.

mod invalidate;
pub mod key;
pub mod policy;
pub mod state;
pub mod store;

pub use key::{CacheKey, ResourceKind};
pub use policy::{CachePolicies, RefetchTrigger, StalenessPolicy};
pub use state::{QueryState, QueryStatus};
pub use store::{DEFAULT_REQUEST_TIMEOUT, EntryInfo, QueryCache};
