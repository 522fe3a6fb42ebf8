use std::collections::BTreeMap;

use prost::Message;

use crate::error::DecodeError;
use crate::proto;
use crate::types::{
    BatchEntry, BatchProof, CommitmentProof, CompressedBatchEntry, CompressedBatchProof,
    CompressedExistenceProof, CompressedNonExistenceProof, ExistenceProof, InnerOp,
    NonExistenceProof,
};

/// Replace the paths of a batch proof by indices into a shared table of
/// inner ops. Proofs that are not batches are returned unchanged.
pub fn compress(proof: &CommitmentProof) -> CommitmentProof {
    match proof {
        CommitmentProof::Batch(batch) => CommitmentProof::Compressed(compress_batch(batch)),
        other => other.clone(),
    }
}

/// Inverse of [`compress`]. Proofs that are not compressed are returned unchanged.
pub fn decompress(proof: &CommitmentProof) -> Result<CommitmentProof, DecodeError> {
    match proof {
        CommitmentProof::Compressed(compressed) => {
            decompress_batch(compressed).map(CommitmentProof::Batch)
        }
        other => Ok(other.clone()),
    }
}

pub fn compress_batch(batch: &BatchProof) -> CompressedBatchProof {
    let mut table = LookupTable::default();
    let entries = batch
        .entries
        .iter()
        .map(|entry| match entry {
            BatchEntry::Exist(ex) => CompressedBatchEntry::Exist(table.compress_exist(ex)),
            BatchEntry::Nonexist(non) => {
                CompressedBatchEntry::Nonexist(CompressedNonExistenceProof {
                    key: non.key.clone(),
                    left: non.left.as_ref().map(|ex| table.compress_exist(ex)),
                    right: non.right.as_ref().map(|ex| table.compress_exist(ex)),
                })
            }
        })
        .collect();
    CompressedBatchProof {
        entries,
        lookup_inners: table.inners,
    }
}

pub fn decompress_batch(compressed: &CompressedBatchProof) -> Result<BatchProof, DecodeError> {
    let lookup = &compressed.lookup_inners;
    let entries = compressed
        .entries
        .iter()
        .map(|entry| {
            Ok(match entry {
                CompressedBatchEntry::Exist(ex) => BatchEntry::Exist(decompress_exist(ex, lookup)?),
                CompressedBatchEntry::Nonexist(non) => BatchEntry::Nonexist(NonExistenceProof {
                    key: non.key.clone(),
                    left: non
                        .left
                        .as_ref()
                        .map(|ex| decompress_exist(ex, lookup))
                        .transpose()?,
                    right: non
                        .right
                        .as_ref()
                        .map(|ex| decompress_exist(ex, lookup))
                        .transpose()?,
                }),
            })
        })
        .collect::<Result<Vec<_>, DecodeError>>()?;
    Ok(BatchProof { entries })
}

fn decompress_exist(
    ex: &CompressedExistenceProof,
    lookup: &[InnerOp],
) -> Result<ExistenceProof, DecodeError> {
    let path = ex
        .path
        .iter()
        .map(|&index| {
            usize::try_from(index)
                .ok()
                .and_then(|i| lookup.get(i))
                .cloned()
                .ok_or(DecodeError::LookupIndexOutOfRange {
                    index,
                    len: lookup.len(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ExistenceProof {
        key: ex.key.clone(),
        value: ex.value.clone(),
        leaf: ex.leaf.clone(),
        path,
    })
}

/// Distinct inner ops in first-seen order, keyed by their wire encoding.
#[derive(Default)]
struct LookupTable {
    inners: Vec<InnerOp>,
    registry: BTreeMap<Vec<u8>, i32>,
}

impl LookupTable {
    fn index_of(&mut self, op: &InnerOp) -> i32 {
        let encoded = proto::InnerOp::from(op).encode_to_vec();
        let inners = &mut self.inners;
        *self.registry.entry(encoded).or_insert_with(|| {
            inners.push(op.clone());
            (inners.len() - 1) as i32
        })
    }

    fn compress_exist(&mut self, ex: &ExistenceProof) -> CompressedExistenceProof {
        CompressedExistenceProof {
            key: ex.key.clone(),
            value: ex.value.clone(),
            leaf: ex.leaf.clone(),
            path: ex.path.iter().map(|op| self.index_of(op)).collect(),
        }
    }
}
