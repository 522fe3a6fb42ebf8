use tracing::{debug, trace};

use crate::compress::decompress_batch;
use crate::error::{Error, VerifyError};
use crate::types::{
    BatchEntry, BatchProof, CommitmentProof, ExistenceProof, NonExistenceProof, ProofSpec,
};
use crate::verify::{verify_existence, verify_non_existence};

/// Bundle single existence / non-existence proofs into one batch, keeping their order.
pub fn build_batch_proof<I>(proofs: I) -> Result<CommitmentProof, Error>
where
    I: IntoIterator<Item = CommitmentProof>,
{
    let entries = proofs
        .into_iter()
        .enumerate()
        .map(|(i, proof)| match proof {
            CommitmentProof::Exist(ex) => Ok(BatchEntry::Exist(ex)),
            CommitmentProof::Nonexist(non) => Ok(BatchEntry::Nonexist(non)),
            CommitmentProof::Batch(_) | CommitmentProof::Compressed(_) => Err(
                Error::InvalidArgument(format!("proof {i} is already a batch")),
            ),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CommitmentProof::Batch(BatchProof { entries }))
}

/// Existence entry proving `key`, if the batch holds one.
pub fn existence_proof_for<'a>(entries: &'a [BatchEntry], key: &[u8]) -> Option<&'a ExistenceProof> {
    entries.iter().find_map(|entry| match entry {
        BatchEntry::Exist(ex) if ex.key == key => Some(ex),
        _ => None,
    })
}

/// Non-existence entry for `key`, if the batch holds one.
pub fn non_existence_proof_for<'a>(
    entries: &'a [BatchEntry],
    key: &[u8],
) -> Option<&'a NonExistenceProof> {
    entries.iter().find_map(|entry| match entry {
        BatchEntry::Nonexist(non) if non.key == key => Some(non),
        _ => None,
    })
}

/// Check every `(key, value)` pair against the batch. All must pass.
///
/// Compressed proofs are decompressed first; a single existence proof is
/// treated as a batch of one.
pub fn check_batch_membership(
    proof: &CommitmentProof,
    spec: &ProofSpec,
    root: &[u8],
    items: &[(&[u8], &[u8])],
    parallel: bool,
) -> Result<(), Error> {
    let batch = as_batch(proof)?;
    let check = |(key, value): &(&[u8], &[u8])| -> Result<(), VerifyError> {
        trace!(key = %hex::encode(key), "checking batch membership");
        let ex = existence_proof_for(&batch.entries, key)
            .ok_or_else(|| VerifyError::KeyNotInBatch(key.to_vec()))?;
        verify_existence(ex, spec, root, key, value)
    };
    Ok(run_all(items, parallel, check)?)
}

/// Check that every key is proven absent by the batch. All must pass.
pub fn check_batch_non_membership(
    proof: &CommitmentProof,
    spec: &ProofSpec,
    root: &[u8],
    keys: &[&[u8]],
    parallel: bool,
) -> Result<(), Error> {
    let batch = as_batch(proof)?;
    let check = |key: &&[u8]| -> Result<(), VerifyError> {
        trace!(key = %hex::encode(key), "checking batch non-membership");
        let non = non_existence_proof_for(&batch.entries, key)
            .ok_or_else(|| VerifyError::KeyNotInBatch(key.to_vec()))?;
        verify_non_existence(non, spec, root, key)
    };
    Ok(run_all(keys, parallel, check)?)
}

/// `true` if every `(key, value)` pair is proven by the batch.
pub fn verify_batch_membership(
    proof: &CommitmentProof,
    spec: &ProofSpec,
    root: &[u8],
    items: &[(&[u8], &[u8])],
) -> bool {
    match check_batch_membership(proof, spec, root, items, false) {
        Ok(()) => true,
        Err(err) => {
            debug!(%err, items = items.len(), "batch membership rejected");
            false
        }
    }
}

/// `true` if every key is proven absent by the batch.
pub fn verify_batch_non_membership(
    proof: &CommitmentProof,
    spec: &ProofSpec,
    root: &[u8],
    keys: &[&[u8]],
) -> bool {
    match check_batch_non_membership(proof, spec, root, keys, false) {
        Ok(()) => true,
        Err(err) => {
            debug!(%err, keys = keys.len(), "batch non-membership rejected");
            false
        }
    }
}

fn as_batch(proof: &CommitmentProof) -> Result<BatchProof, Error> {
    Ok(match proof {
        CommitmentProof::Batch(batch) => batch.clone(),
        CommitmentProof::Compressed(compressed) => decompress_batch(compressed)?,
        CommitmentProof::Exist(ex) => BatchProof {
            entries: vec![BatchEntry::Exist(ex.clone())],
        },
        CommitmentProof::Nonexist(non) => BatchProof {
            entries: vec![BatchEntry::Nonexist(non.clone())],
        },
    })
}

/// Run `check` over every item. The outcome is all-or-nothing either way;
/// only the order in which items are looked at differs.
#[cfg(feature = "parallel")]
fn run_all<T, F>(items: &[T], parallel: bool, check: F) -> Result<(), VerifyError>
where
    T: Sync,
    F: Fn(&T) -> Result<(), VerifyError> + Sync + Send,
{
    if parallel {
        use rayon::prelude::*;
        return items.par_iter().try_for_each(check);
    }
    items.iter().try_for_each(check)
}

#[cfg(not(feature = "parallel"))]
fn run_all<T, F>(items: &[T], _parallel: bool, check: F) -> Result<(), VerifyError>
where
    F: Fn(&T) -> Result<(), VerifyError>,
{
    items.iter().try_for_each(check)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HashOp, LeafOp, LengthOp};

    fn exist(key: &[u8]) -> ExistenceProof {
        ExistenceProof {
            key: key.to_vec(),
            value: b"v".to_vec(),
            leaf: LeafOp {
                hash: HashOp::Sha256,
                prehash_key: HashOp::NoHash,
                prehash_value: HashOp::NoHash,
                length: LengthOp::VarProto,
                prefix: vec![0],
            },
            path: vec![],
        }
    }

    #[test]
    fn test_build_batch_keeps_order() {
        let non = NonExistenceProof {
            key: b"b".to_vec(),
            left: Some(exist(b"a")),
            right: None,
        };
        let batch = build_batch_proof(vec![
            exist(b"c").into(),
            non.clone().into(),
            exist(b"a").into(),
        ])
        .unwrap();
        let CommitmentProof::Batch(batch) = batch else {
            panic!("expected a batch");
        };
        let keys: Vec<&[u8]> = batch.entries.iter().map(BatchEntry::key).collect();
        assert_eq!(keys, vec![&b"c"[..], &b"b"[..], &b"a"[..]]);
        assert_eq!(batch.entries[1], BatchEntry::Nonexist(non));
    }

    #[test]
    fn test_build_batch_rejects_nested_batch() {
        let inner = build_batch_proof(vec![exist(b"a").into()]).unwrap();
        assert!(matches!(
            build_batch_proof(vec![inner]),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_lookup_by_key() {
        let entries = vec![
            BatchEntry::Exist(exist(b"a")),
            BatchEntry::Nonexist(NonExistenceProof {
                key: b"a".to_vec(),
                left: None,
                right: None,
            }),
        ];
        assert_eq!(existence_proof_for(&entries, b"a"), Some(&exist(b"a")));
        assert!(existence_proof_for(&entries, b"b").is_none());
        assert_eq!(non_existence_proof_for(&entries, b"a").unwrap().key, b"a");
    }

    #[test]
    fn test_missing_key_fails_batch() {
        let proof = build_batch_proof(vec![exist(b"a").into()]).unwrap();
        let err = check_batch_membership(
            &proof,
            crate::specs::tendermint_spec(),
            &[0u8; 32],
            &[(&b"zz"[..], &b"v"[..])],
            false,
        )
        .unwrap_err();
        assert_eq!(err, Error::Verify(VerifyError::KeyNotInBatch(b"zz".to_vec())));
    }
}
