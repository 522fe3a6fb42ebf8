//! Conversion between the wire messages in [`crate::proto`] and the domain types.
//!
//! Encoding is infallible. Decoding rejects anything the domain model cannot
//! represent: unknown enum values, missing sub-messages, empty oneofs and
//! negative sizes.

use prost::Message;

use crate::error::DecodeError;
use crate::proto;
use crate::types::{
    BatchEntry, BatchProof, CommitmentProof, CompressedBatchEntry, CompressedBatchProof,
    CompressedExistenceProof, CompressedNonExistenceProof, ExistenceProof, HashOp, InnerOp,
    InnerSpec, LeafOp, LengthOp, NonExistenceProof, ProofSpec,
};

pub fn decode_commitment_proof(bytes: &[u8]) -> Result<CommitmentProof, DecodeError> {
    proto::CommitmentProof::decode(bytes)?.try_into()
}

pub fn encode_commitment_proof(proof: &CommitmentProof) -> Vec<u8> {
    proto::CommitmentProof::from(proof).encode_to_vec()
}

pub fn decode_spec(bytes: &[u8]) -> Result<ProofSpec, DecodeError> {
    proto::ProofSpec::decode(bytes)?.try_into()
}

pub fn encode_spec(spec: &ProofSpec) -> Vec<u8> {
    proto::ProofSpec::from(spec).encode_to_vec()
}

fn non_negative(field: &'static str, value: i32) -> Result<i32, DecodeError> {
    if value < 0 {
        return Err(DecodeError::NegativeValue { field, value });
    }
    Ok(value)
}

impl From<&LeafOp> for proto::LeafOp {
    fn from(leaf: &LeafOp) -> Self {
        proto::LeafOp {
            hash: leaf.hash as i32,
            prehash_key: leaf.prehash_key as i32,
            prehash_value: leaf.prehash_value as i32,
            length: leaf.length as i32,
            prefix: leaf.prefix.clone(),
        }
    }
}

impl TryFrom<proto::LeafOp> for LeafOp {
    type Error = DecodeError;

    fn try_from(raw: proto::LeafOp) -> Result<Self, Self::Error> {
        Ok(LeafOp {
            hash: HashOp::try_from(raw.hash)?,
            prehash_key: HashOp::try_from(raw.prehash_key)?,
            prehash_value: HashOp::try_from(raw.prehash_value)?,
            length: LengthOp::try_from(raw.length)?,
            prefix: raw.prefix,
        })
    }
}

impl From<&InnerOp> for proto::InnerOp {
    fn from(op: &InnerOp) -> Self {
        proto::InnerOp {
            hash: op.hash as i32,
            prefix: op.prefix.clone(),
            suffix: op.suffix.clone(),
        }
    }
}

impl TryFrom<proto::InnerOp> for InnerOp {
    type Error = DecodeError;

    fn try_from(raw: proto::InnerOp) -> Result<Self, Self::Error> {
        Ok(InnerOp {
            hash: HashOp::try_from(raw.hash)?,
            prefix: raw.prefix,
            suffix: raw.suffix,
        })
    }
}

impl From<&InnerSpec> for proto::InnerSpec {
    fn from(spec: &InnerSpec) -> Self {
        proto::InnerSpec {
            child_order: spec.child_order.clone(),
            child_size: spec.child_size,
            min_prefix_length: spec.min_prefix_length,
            max_prefix_length: spec.max_prefix_length,
            empty_child: spec.empty_child.clone(),
            hash: spec.hash as i32,
        }
    }
}

impl TryFrom<proto::InnerSpec> for InnerSpec {
    type Error = DecodeError;

    fn try_from(raw: proto::InnerSpec) -> Result<Self, Self::Error> {
        for &branch in &raw.child_order {
            non_negative("child_order", branch)?;
        }
        Ok(InnerSpec {
            child_order: raw.child_order,
            child_size: non_negative("child_size", raw.child_size)?,
            min_prefix_length: non_negative("min_prefix_length", raw.min_prefix_length)?,
            max_prefix_length: non_negative("max_prefix_length", raw.max_prefix_length)?,
            empty_child: raw.empty_child,
            hash: HashOp::try_from(raw.hash)?,
        })
    }
}

impl From<&ProofSpec> for proto::ProofSpec {
    fn from(spec: &ProofSpec) -> Self {
        proto::ProofSpec {
            leaf_spec: Some((&spec.leaf_spec).into()),
            inner_spec: Some((&spec.inner_spec).into()),
            max_depth: spec.max_depth,
            min_depth: spec.min_depth,
            prehash_key_before_comparison: spec.prehash_key_before_comparison,
        }
    }
}

impl TryFrom<proto::ProofSpec> for ProofSpec {
    type Error = DecodeError;

    fn try_from(raw: proto::ProofSpec) -> Result<Self, Self::Error> {
        Ok(ProofSpec {
            leaf_spec: raw
                .leaf_spec
                .ok_or(DecodeError::MissingField("leaf_spec"))?
                .try_into()?,
            inner_spec: raw
                .inner_spec
                .ok_or(DecodeError::MissingField("inner_spec"))?
                .try_into()?,
            max_depth: non_negative("max_depth", raw.max_depth)?,
            min_depth: non_negative("min_depth", raw.min_depth)?,
            prehash_key_before_comparison: raw.prehash_key_before_comparison,
        })
    }
}

impl From<&ExistenceProof> for proto::ExistenceProof {
    fn from(proof: &ExistenceProof) -> Self {
        proto::ExistenceProof {
            key: proof.key.clone(),
            value: proof.value.clone(),
            leaf: Some((&proof.leaf).into()),
            path: proof.path.iter().map(Into::into).collect(),
        }
    }
}

impl TryFrom<proto::ExistenceProof> for ExistenceProof {
    type Error = DecodeError;

    fn try_from(raw: proto::ExistenceProof) -> Result<Self, Self::Error> {
        Ok(ExistenceProof {
            key: raw.key,
            value: raw.value,
            leaf: raw.leaf.ok_or(DecodeError::MissingField("leaf"))?.try_into()?,
            path: raw
                .path
                .into_iter()
                .map(InnerOp::try_from)
                .collect::<Result<_, _>>()?,
        })
    }
}

impl From<&NonExistenceProof> for proto::NonExistenceProof {
    fn from(proof: &NonExistenceProof) -> Self {
        proto::NonExistenceProof {
            key: proof.key.clone(),
            left: proof.left.as_ref().map(Into::into),
            right: proof.right.as_ref().map(Into::into),
        }
    }
}

impl TryFrom<proto::NonExistenceProof> for NonExistenceProof {
    type Error = DecodeError;

    fn try_from(raw: proto::NonExistenceProof) -> Result<Self, Self::Error> {
        Ok(NonExistenceProof {
            key: raw.key,
            left: raw.left.map(ExistenceProof::try_from).transpose()?,
            right: raw.right.map(ExistenceProof::try_from).transpose()?,
        })
    }
}

impl From<&BatchEntry> for proto::BatchEntry {
    fn from(entry: &BatchEntry) -> Self {
        use proto::batch_entry::Proof;
        let proof = match entry {
            BatchEntry::Exist(ex) => Proof::Exist(ex.into()),
            BatchEntry::Nonexist(non) => Proof::Nonexist(non.into()),
        };
        proto::BatchEntry { proof: Some(proof) }
    }
}

impl TryFrom<proto::BatchEntry> for BatchEntry {
    type Error = DecodeError;

    fn try_from(raw: proto::BatchEntry) -> Result<Self, Self::Error> {
        use proto::batch_entry::Proof;
        Ok(match raw.proof.ok_or(DecodeError::EmptyOneof("BatchEntry"))? {
            Proof::Exist(ex) => BatchEntry::Exist(ex.try_into()?),
            Proof::Nonexist(non) => BatchEntry::Nonexist(non.try_into()?),
        })
    }
}

impl From<&BatchProof> for proto::BatchProof {
    fn from(batch: &BatchProof) -> Self {
        proto::BatchProof {
            entries: batch.entries.iter().map(Into::into).collect(),
        }
    }
}

impl TryFrom<proto::BatchProof> for BatchProof {
    type Error = DecodeError;

    fn try_from(raw: proto::BatchProof) -> Result<Self, Self::Error> {
        Ok(BatchProof {
            entries: raw
                .entries
                .into_iter()
                .map(BatchEntry::try_from)
                .collect::<Result<_, _>>()?,
        })
    }
}

impl From<&CompressedExistenceProof> for proto::CompressedExistenceProof {
    fn from(proof: &CompressedExistenceProof) -> Self {
        proto::CompressedExistenceProof {
            key: proof.key.clone(),
            value: proof.value.clone(),
            leaf: Some((&proof.leaf).into()),
            path: proof.path.clone(),
        }
    }
}

impl TryFrom<proto::CompressedExistenceProof> for CompressedExistenceProof {
    type Error = DecodeError;

    fn try_from(raw: proto::CompressedExistenceProof) -> Result<Self, Self::Error> {
        Ok(CompressedExistenceProof {
            key: raw.key,
            value: raw.value,
            leaf: raw.leaf.ok_or(DecodeError::MissingField("leaf"))?.try_into()?,
            path: raw.path,
        })
    }
}

impl From<&CompressedNonExistenceProof> for proto::CompressedNonExistenceProof {
    fn from(proof: &CompressedNonExistenceProof) -> Self {
        proto::CompressedNonExistenceProof {
            key: proof.key.clone(),
            left: proof.left.as_ref().map(Into::into),
            right: proof.right.as_ref().map(Into::into),
        }
    }
}

impl TryFrom<proto::CompressedNonExistenceProof> for CompressedNonExistenceProof {
    type Error = DecodeError;

    fn try_from(raw: proto::CompressedNonExistenceProof) -> Result<Self, Self::Error> {
        Ok(CompressedNonExistenceProof {
            key: raw.key,
            left: raw
                .left
                .map(CompressedExistenceProof::try_from)
                .transpose()?,
            right: raw
                .right
                .map(CompressedExistenceProof::try_from)
                .transpose()?,
        })
    }
}

impl From<&CompressedBatchEntry> for proto::CompressedBatchEntry {
    fn from(entry: &CompressedBatchEntry) -> Self {
        use proto::compressed_batch_entry::Proof;
        let proof = match entry {
            CompressedBatchEntry::Exist(ex) => Proof::Exist(ex.into()),
            CompressedBatchEntry::Nonexist(non) => Proof::Nonexist(non.into()),
        };
        proto::CompressedBatchEntry { proof: Some(proof) }
    }
}

impl TryFrom<proto::CompressedBatchEntry> for CompressedBatchEntry {
    type Error = DecodeError;

    fn try_from(raw: proto::CompressedBatchEntry) -> Result<Self, Self::Error> {
        use proto::compressed_batch_entry::Proof;
        Ok(
            match raw
                .proof
                .ok_or(DecodeError::EmptyOneof("CompressedBatchEntry"))?
            {
                Proof::Exist(ex) => CompressedBatchEntry::Exist(ex.try_into()?),
                Proof::Nonexist(non) => CompressedBatchEntry::Nonexist(non.try_into()?),
            },
        )
    }
}

impl From<&CompressedBatchProof> for proto::CompressedBatchProof {
    fn from(batch: &CompressedBatchProof) -> Self {
        proto::CompressedBatchProof {
            entries: batch.entries.iter().map(Into::into).collect(),
            lookup_inners: batch.lookup_inners.iter().map(Into::into).collect(),
        }
    }
}

impl TryFrom<proto::CompressedBatchProof> for CompressedBatchProof {
    type Error = DecodeError;

    fn try_from(raw: proto::CompressedBatchProof) -> Result<Self, Self::Error> {
        Ok(CompressedBatchProof {
            entries: raw
                .entries
                .into_iter()
                .map(CompressedBatchEntry::try_from)
                .collect::<Result<_, _>>()?,
            lookup_inners: raw
                .lookup_inners
                .into_iter()
                .map(InnerOp::try_from)
                .collect::<Result<_, _>>()?,
        })
    }
}

impl From<&CommitmentProof> for proto::CommitmentProof {
    fn from(proof: &CommitmentProof) -> Self {
        use proto::commitment_proof::Proof;
        let proof = match proof {
            CommitmentProof::Exist(ex) => Proof::Exist(ex.into()),
            CommitmentProof::Nonexist(non) => Proof::Nonexist(non.into()),
            CommitmentProof::Batch(batch) => Proof::Batch(batch.into()),
            CommitmentProof::Compressed(batch) => Proof::Compressed(batch.into()),
        };
        proto::CommitmentProof { proof: Some(proof) }
    }
}

impl TryFrom<proto::CommitmentProof> for CommitmentProof {
    type Error = DecodeError;

    fn try_from(raw: proto::CommitmentProof) -> Result<Self, Self::Error> {
        use proto::commitment_proof::Proof;
        Ok(
            match raw.proof.ok_or(DecodeError::EmptyOneof("CommitmentProof"))? {
                Proof::Exist(ex) => CommitmentProof::Exist(ex.try_into()?),
                Proof::Nonexist(non) => CommitmentProof::Nonexist(non.try_into()?),
                Proof::Batch(batch) => CommitmentProof::Batch(batch.try_into()?),
                Proof::Compressed(batch) => CommitmentProof::Compressed(batch.try_into()?),
            },
        )
    }
}
