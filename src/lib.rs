pub mod canonical;
pub mod config;
pub mod did;
pub mod document;
pub mod hashing;
pub mod keypair;
pub mod presentation;
pub mod signer;
pub mod statement;
pub mod verifier;

pub use k256;
