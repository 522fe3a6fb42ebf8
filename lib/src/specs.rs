//! Built-in proof specs for the supported tree variants.

use once_cell::sync::Lazy;

use crate::types::{HashOp, InnerSpec, LeafOp, LengthOp, ProofSpec};

static IAVL_SPEC: Lazy<ProofSpec> = Lazy::new(|| ProofSpec {
    leaf_spec: LeafOp {
        hash: HashOp::Sha256,
        prehash_key: HashOp::NoHash,
        prehash_value: HashOp::Sha256,
        length: LengthOp::VarProto,
        prefix: vec![0],
    },
    inner_spec: InnerSpec {
        child_order: vec![0, 1],
        // Children are length-prefixed: 0x20 followed by the 32 byte hash.
        child_size: 33,
        min_prefix_length: 4,
        max_prefix_length: 12,
        empty_child: vec![],
        hash: HashOp::Sha256,
    },
    max_depth: 0,
    min_depth: 0,
    prehash_key_before_comparison: false,
});

static TENDERMINT_SPEC: Lazy<ProofSpec> = Lazy::new(|| ProofSpec {
    leaf_spec: LeafOp {
        hash: HashOp::Sha256,
        prehash_key: HashOp::NoHash,
        prehash_value: HashOp::Sha256,
        length: LengthOp::VarProto,
        prefix: vec![0],
    },
    inner_spec: InnerSpec {
        child_order: vec![0, 1],
        child_size: 32,
        min_prefix_length: 1,
        max_prefix_length: 1,
        empty_child: vec![],
        hash: HashOp::Sha256,
    },
    max_depth: 0,
    min_depth: 0,
    prehash_key_before_comparison: false,
});

static SMT_SPEC: Lazy<ProofSpec> = Lazy::new(|| ProofSpec {
    leaf_spec: LeafOp {
        hash: HashOp::Sha256,
        prehash_key: HashOp::Sha256,
        prehash_value: HashOp::Sha256,
        length: LengthOp::NoPrefix,
        prefix: vec![0],
    },
    inner_spec: InnerSpec {
        child_order: vec![0, 1],
        child_size: 32,
        min_prefix_length: 1,
        max_prefix_length: 1,
        empty_child: vec![0; 32],
        hash: HashOp::Sha256,
    },
    max_depth: 256,
    min_depth: 0,
    prehash_key_before_comparison: true,
});

/// Spec for IAVL+ trees as used by the Cosmos SDK stores.
pub fn iavl_spec() -> &'static ProofSpec {
    &IAVL_SPEC
}

/// Spec for the simple Merkle tree Tendermint uses for block data.
pub fn tendermint_spec() -> &'static ProofSpec {
    &TENDERMINT_SPEC
}

/// Spec for sparse Merkle trees keyed by the sha256 of the key.
pub fn smt_spec() -> &'static ProofSpec {
    &SMT_SPEC
}

/// Force every preset so later lookups never run an initializer.
pub(crate) fn warm_up() {
    Lazy::force(&IAVL_SPEC);
    Lazy::force(&TENDERMINT_SPEC);
    Lazy::force(&SMT_SPEC);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_share_leaf_hashing() {
        assert_eq!(iavl_spec().leaf_spec, tendermint_spec().leaf_spec);
        assert_ne!(iavl_spec().leaf_spec, smt_spec().leaf_spec);
    }

    #[test]
    fn test_iavl_child_size_covers_length_prefix() {
        assert_eq!(iavl_spec().inner_spec.child_size, 33);
        assert_eq!(tendermint_spec().inner_spec.child_size, 32);
    }

    #[test]
    fn test_smt_placeholder_and_depth() {
        let spec = smt_spec();
        assert_eq!(spec.inner_spec.empty_child, vec![0u8; 32]);
        assert_eq!(spec.max_depth, 256);
        assert!(spec.prehash_key_before_comparison);
    }

    #[test]
    fn test_presets_are_stable() {
        assert!(std::ptr::eq(iavl_spec(), iavl_spec()));
    }
}
