pub mod reconcile;

pub use reconcile::{reconcile, Resolution, ResolutionSource, ServerLookup};
