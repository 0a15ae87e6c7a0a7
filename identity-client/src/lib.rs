pub mod api;
pub mod domain;
pub mod notify;
pub mod service;
pub mod store;

pub use api::{HttpIdentityApi, IdentityApi};
pub use notify::{MemoryNotifier, Notice, NoticeLevel, Notifier, TracingNotifier};
pub use service::{AnonymousIdentityResolver, IdentitySession, LoadStatus};
pub use store::{build_store, FileStore, LocalStore, MemoryStore, RedisStore};
