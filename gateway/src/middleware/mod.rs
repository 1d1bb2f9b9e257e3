pub mod signature;

pub use signature::{SignatureError, VonageClaims, signature_middleware, verify_signed_request};
