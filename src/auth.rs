//! Token lifecycle: claims, verification, and the per-client token store.

pub mod claims;
pub mod metrics;
pub mod secret;
pub mod store;
pub mod verifier;

pub use claims::*;
pub use metrics::*;
pub use secret::*;
pub use store::*;
pub use verifier::*;
