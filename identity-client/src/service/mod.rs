pub mod resolver;
pub mod session;

pub use resolver::AnonymousIdentityResolver;
pub use session::{IdentitySession, LoadStatus};
