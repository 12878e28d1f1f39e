//! Concrete chain backends for the server binary.
//!
//! The scheme crates only define capability traits; these modules provide
//! the reqwest-backed implementations the binary wires in.

pub mod hedera;
pub mod ton;

pub use hedera::HederaMirrorProvider;
pub use ton::TonIndexerRpc;
