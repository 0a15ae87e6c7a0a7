pub mod config;
pub mod errors;
pub mod telemetry;
pub mod types;

pub use config::{ApiConfig, DeletePolicy, ResolverConfig, StoreBackend, StoreConfig};
pub use errors::{IdentityError, Result};
pub use telemetry::{init_tracing, record_counter, record_timing, LogFormat};
pub use types::{AnonymousIdentityState, AnonymousName, SavedIdentity, TopicId};
