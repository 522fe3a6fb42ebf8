//! Verification of ICS-23 style commitment proofs.
//!
//! A proof shows that a key maps to a value (or to nothing) in a Merkle tree
//! with a given root, without access to the tree itself. A [`ProofSpec`]
//! describes how a particular tree variant hashes its nodes; the presets in
//! [`specs`] cover IAVL, Tendermint and sparse Merkle trees.

pub mod api;
pub mod backend;
pub mod batch;
pub mod codec;
pub mod compress;
pub mod error;
pub mod hash;
pub mod ops;
pub mod proto;
pub mod specs;
pub mod types;
pub mod verify;

#[cfg(feature = "std")]
pub mod builder;

pub use backend::{init, try_backend, Backend, Config};
pub use batch::{build_batch_proof, verify_batch_membership, verify_batch_non_membership};
pub use compress::{compress, decompress};
pub use error::{DecodeError, Error, Result, VerifyError};
pub use specs::{iavl_spec, smt_spec, tendermint_spec};
pub use types::*;
pub use verify::{calculate_existence_root, verify_membership, verify_non_membership};

#[cfg(feature = "std")]
pub use builder::{TreeBuilder, TreeVariant};
