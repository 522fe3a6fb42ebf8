use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Hash output as produced by any [`HashOp`]. Lengths vary by algorithm.
pub type Hash = Vec<u8>;

/// Hash algorithms a tree variant may use for leaves, inner nodes or prehashing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum HashOp {
    /// Identity; the input is passed through untouched.
    NoHash = 0,
    Sha256 = 1,
    Sha512 = 2,
    Keccak256 = 3,
    Ripemd160 = 4,
    /// ripemd160(sha256(x))
    Bitcoin = 5,
    Sha512_256 = 6,
    Blake2b512 = 7,
    Blake2s256 = 8,
    Blake3 = 9,
}

impl TryFrom<i32> for HashOp {
    type Error = DecodeError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => HashOp::NoHash,
            1 => HashOp::Sha256,
            2 => HashOp::Sha512,
            3 => HashOp::Keccak256,
            4 => HashOp::Ripemd160,
            5 => HashOp::Bitcoin,
            6 => HashOp::Sha512_256,
            7 => HashOp::Blake2b512,
            8 => HashOp::Blake2s256,
            9 => HashOp::Blake3,
            other => return Err(DecodeError::UnknownHashOp(other)),
        })
    }
}

/// How the length of a byte string is prefixed before it is hashed into a leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum LengthOp {
    NoPrefix = 0,
    /// Protobuf varint: base-128, little-endian groups, continuation bit.
    VarProto = 1,
    /// RLP byte-string header.
    VarRlp = 2,
    Fixed32Big = 3,
    Fixed32Little = 4,
    Fixed64Big = 5,
    Fixed64Little = 6,
    /// No prefix, but the data must be exactly 32 bytes.
    Require32Bytes = 7,
    /// No prefix, but the data must be exactly 64 bytes.
    Require64Bytes = 8,
}

impl TryFrom<i32> for LengthOp {
    type Error = DecodeError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => LengthOp::NoPrefix,
            1 => LengthOp::VarProto,
            2 => LengthOp::VarRlp,
            3 => LengthOp::Fixed32Big,
            4 => LengthOp::Fixed32Little,
            5 => LengthOp::Fixed64Big,
            6 => LengthOp::Fixed64Little,
            7 => LengthOp::Require32Bytes,
            8 => LengthOp::Require64Bytes,
            other => return Err(DecodeError::UnknownLengthOp(other)),
        })
    }
}

/// Leaf hashing rule. Embedded in every existence proof and used as the
/// leaf half of a [`ProofSpec`].
///
/// `output = hash(prefix || length(prehash_key(key)) || prehash_key(key) || length(prehash_value(value)) || prehash_value(value))`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafOp {
    pub hash: HashOp,
    pub prehash_key: HashOp,
    pub prehash_value: HashOp,
    pub length: LengthOp,
    /// Fixed bytes that separate leaf hashing from inner hashing.
    pub prefix: Vec<u8>,
}

/// One step of a path: `output = hash(prefix || child || suffix)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InnerOp {
    pub hash: HashOp,
    pub prefix: Vec<u8>,
    pub suffix: Vec<u8>,
}

/// Shape of the inner nodes of a tree variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InnerSpec {
    /// Permutation of `0..n`: the position of each branch in the hashed image.
    pub child_order: Vec<i32>,
    pub child_size: i32,
    pub min_prefix_length: i32,
    pub max_prefix_length: i32,
    /// Placeholder written in a child slot when the branch is absent.
    pub empty_child: Vec<u8>,
    pub hash: HashOp,
}

/// The parameter set a tree variant's proofs must satisfy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofSpec {
    pub leaf_spec: LeafOp,
    pub inner_spec: InnerSpec,
    /// Maximum path length, 0 for unbounded.
    pub max_depth: i32,
    /// Minimum path length, 0 for none.
    pub min_depth: i32,
    /// Compare keys by their `leaf_spec.prehash_key` digest when ordering
    /// neighbours in a non-existence proof.
    pub prehash_key_before_comparison: bool,
}

/// Proves that `key` maps to `value` under some root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistenceProof {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub leaf: LeafOp,
    /// Inner steps, leaf to root.
    pub path: Vec<InnerOp>,
}

/// Proves that `key` is absent by exhibiting its neighbours.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonExistenceProof {
    pub key: Vec<u8>,
    pub left: Option<ExistenceProof>,
    pub right: Option<ExistenceProof>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchEntry {
    Exist(ExistenceProof),
    Nonexist(NonExistenceProof),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProof {
    pub entries: Vec<BatchEntry>,
}

/// Existence proof whose path is a list of indices into
/// [`CompressedBatchProof::lookup_inners`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedExistenceProof {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub leaf: LeafOp,
    pub path: Vec<i32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedNonExistenceProof {
    pub key: Vec<u8>,
    pub left: Option<CompressedExistenceProof>,
    pub right: Option<CompressedExistenceProof>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressedBatchEntry {
    Exist(CompressedExistenceProof),
    Nonexist(CompressedNonExistenceProof),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedBatchProof {
    pub entries: Vec<CompressedBatchEntry>,
    pub lookup_inners: Vec<InnerOp>,
}

/// Any proof the engine accepts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitmentProof {
    Exist(ExistenceProof),
    Nonexist(NonExistenceProof),
    Batch(BatchProof),
    Compressed(CompressedBatchProof),
}

impl BatchEntry {
    /// Key the entry speaks about.
    pub fn key(&self) -> &[u8] {
        match self {
            BatchEntry::Exist(ex) => &ex.key,
            BatchEntry::Nonexist(non) => &non.key,
        }
    }
}

impl From<ExistenceProof> for CommitmentProof {
    fn from(proof: ExistenceProof) -> Self {
        CommitmentProof::Exist(proof)
    }
}

impl From<NonExistenceProof> for CommitmentProof {
    fn from(proof: NonExistenceProof) -> Self {
        CommitmentProof::Nonexist(proof)
    }
}

impl From<BatchProof> for CommitmentProof {
    fn from(proof: BatchProof) -> Self {
        CommitmentProof::Batch(proof)
    }
}

impl From<CompressedBatchProof> for CommitmentProof {
    fn from(proof: CompressedBatchProof) -> Self {
        CommitmentProof::Compressed(proof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_op_from_wire() {
        assert_eq!(HashOp::try_from(1).unwrap(), HashOp::Sha256);
        assert_eq!(HashOp::try_from(9).unwrap(), HashOp::Blake3);
        assert_eq!(HashOp::Keccak256 as i32, 3);
    }

    #[test]
    fn test_unknown_enum_values_rejected() {
        assert_eq!(HashOp::try_from(10), Err(DecodeError::UnknownHashOp(10)));
        assert_eq!(HashOp::try_from(-1), Err(DecodeError::UnknownHashOp(-1)));
        assert_eq!(LengthOp::try_from(9), Err(DecodeError::UnknownLengthOp(9)));
    }

    #[test]
    fn test_batch_entry_key() {
        let entry = BatchEntry::Nonexist(NonExistenceProof {
            key: b"missing".to_vec(),
            left: None,
            right: None,
        });
        assert_eq!(entry.key(), b"missing");
    }
}
