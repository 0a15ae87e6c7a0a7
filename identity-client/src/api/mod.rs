pub mod dto;
pub mod identity_api;

pub use dto::{AssignIdentityRequest, IdentityData, IdentityEnvelope};
pub use identity_api::{HttpIdentityApi, IdentityApi};
