//! Single-proof verification.
//!
//! An existence proof is checked in three stages: the proof must conform to
//! the [`ProofSpec`], it must speak about the requested key and value, and
//! folding the leaf through the path must land exactly on the trusted root.
//! A non-existence proof exhibits the neighbours of the missing key and
//! additionally shows, from the shape of their paths, that nothing can sit
//! between them.

use tracing::debug;

use crate::batch;
use crate::compress::decompress_batch;
use crate::error::{ensure_spec, Error, VerifyError};
use crate::hash::do_hash;
use crate::ops::{apply_inner, apply_leaf};
use crate::types::{
    CommitmentProof, ExistenceProof, Hash, InnerOp, InnerSpec, LeafOp, NonExistenceProof, ProofSpec,
};

/// Recompute the root committed to by `proof` without checking it against a spec.
pub fn calculate_existence_root(proof: &ExistenceProof) -> Result<Hash, VerifyError> {
    calculate_root_for_spec(proof, None)
}

fn calculate_root_for_spec(
    proof: &ExistenceProof,
    spec: Option<&ProofSpec>,
) -> Result<Hash, VerifyError> {
    let mut hash = apply_leaf(&proof.leaf, &proof.key, &proof.value)?;
    for step in &proof.path {
        hash = apply_inner(step, &hash)?;
        if let Some(spec) = spec {
            let child_size = spec.inner_spec.child_size;
            // A child hash can never be wider than its slot.
            ensure_spec!(
                child_size < 32 || hash.len() <= child_size as usize,
                "intermediate hash of {} bytes exceeds child size {child_size}",
                hash.len()
            );
        }
    }
    Ok(hash)
}

/// Check that every part of `proof` is allowed by `spec`.
pub fn check_existence_spec(proof: &ExistenceProof, spec: &ProofSpec) -> Result<(), VerifyError> {
    check_inner_spec(&spec.inner_spec)?;
    ensure_leaf(&proof.leaf, &spec.leaf_spec)?;

    let depth = proof.path.len();
    if spec.min_depth > 0 {
        ensure_spec!(
            depth >= spec.min_depth as usize,
            "path of {depth} steps is shorter than min depth {}",
            spec.min_depth
        );
    }
    if spec.max_depth > 0 {
        ensure_spec!(
            depth <= spec.max_depth as usize,
            "path of {depth} steps is longer than max depth {}",
            spec.max_depth
        );
    }

    for (height, step) in proof.path.iter().enumerate() {
        ensure_inner(step, spec).map_err(|err| match err {
            VerifyError::SpecViolation(msg) => {
                VerifyError::SpecViolation(format!("step {height}: {msg}"))
            }
            other => other,
        })?;
    }
    Ok(())
}

/// Verify that `proof` commits `key => value` under `root`.
pub fn verify_existence(
    proof: &ExistenceProof,
    spec: &ProofSpec,
    root: &[u8],
    key: &[u8],
    value: &[u8],
) -> Result<(), VerifyError> {
    check_existence_spec(proof, spec)?;
    if proof.key != key {
        return Err(VerifyError::KeyMismatch);
    }
    if proof.value != value {
        return Err(VerifyError::ValueMismatch);
    }
    let calculated = calculate_root_for_spec(proof, Some(spec))?;
    if calculated != root {
        return Err(VerifyError::HashMismatch {
            expected: root.to_vec(),
            actual: calculated,
        });
    }
    Ok(())
}

/// Verify that `proof` shows `key` to be absent under `root`.
pub fn verify_non_existence(
    proof: &NonExistenceProof,
    spec: &ProofSpec,
    root: &[u8],
    key: &[u8],
) -> Result<(), VerifyError> {
    if proof.key != key {
        return Err(VerifyError::KeyMismatch);
    }
    let target = key_for_comparison(spec, key);

    if let Some(left) = &proof.left {
        verify_existence(left, spec, root, &left.key, &left.value)?;
        if target <= key_for_comparison(spec, &left.key) {
            return Err(VerifyError::OrderingViolation(
                "left neighbour is not before the key".to_string(),
            ));
        }
    }
    if let Some(right) = &proof.right {
        verify_existence(right, spec, root, &right.key, &right.value)?;
        if target >= key_for_comparison(spec, &right.key) {
            return Err(VerifyError::OrderingViolation(
                "right neighbour is not after the key".to_string(),
            ));
        }
    }

    let inner = &spec.inner_spec;
    match (&proof.left, &proof.right) {
        (Some(left), None) => ensure_right_most(inner, &left.path),
        (None, Some(right)) => ensure_left_most(inner, &right.path),
        (Some(left), Some(right)) => ensure_left_neighbor(inner, &left.path, &right.path),
        (None, None) => Err(VerifyError::OrderingViolation(
            "neither left nor right neighbour given".to_string(),
        )),
    }
}

/// Like [`verify_membership`] but reports why a proof was rejected.
///
/// Batch and compressed proofs are searched for an existence entry for `key`.
pub fn check_membership(
    proof: &CommitmentProof,
    spec: &ProofSpec,
    root: &[u8],
    key: &[u8],
    value: &[u8],
) -> Result<(), Error> {
    let existence = match proof {
        CommitmentProof::Exist(ex) => ex,
        CommitmentProof::Nonexist(_) => {
            return Err(VerifyError::SpecViolation(
                "non-existence proof cannot prove membership".to_string(),
            )
            .into())
        }
        CommitmentProof::Batch(b) => batch::existence_proof_for(&b.entries, key)
            .ok_or_else(|| VerifyError::KeyNotInBatch(key.to_vec()))?,
        CommitmentProof::Compressed(c) => {
            let b = decompress_batch(c)?;
            let ex = batch::existence_proof_for(&b.entries, key)
                .ok_or_else(|| VerifyError::KeyNotInBatch(key.to_vec()))?;
            return Ok(verify_existence(ex, spec, root, key, value)?);
        }
    };
    Ok(verify_existence(existence, spec, root, key, value)?)
}

/// Like [`verify_non_membership`] but reports why a proof was rejected.
pub fn check_non_membership(
    proof: &CommitmentProof,
    spec: &ProofSpec,
    root: &[u8],
    key: &[u8],
) -> Result<(), Error> {
    let non_existence = match proof {
        CommitmentProof::Nonexist(non) => non,
        CommitmentProof::Exist(_) => {
            return Err(VerifyError::SpecViolation(
                "existence proof cannot prove absence".to_string(),
            )
            .into())
        }
        CommitmentProof::Batch(b) => batch::non_existence_proof_for(&b.entries, key)
            .ok_or_else(|| VerifyError::KeyNotInBatch(key.to_vec()))?,
        CommitmentProof::Compressed(c) => {
            let b = decompress_batch(c)?;
            let non = batch::non_existence_proof_for(&b.entries, key)
                .ok_or_else(|| VerifyError::KeyNotInBatch(key.to_vec()))?;
            return Ok(verify_non_existence(non, spec, root, key)?);
        }
    };
    Ok(verify_non_existence(non_existence, spec, root, key)?)
}

/// `true` if `proof` commits `key => value` under `root`.
pub fn verify_membership(
    proof: &CommitmentProof,
    spec: &ProofSpec,
    root: &[u8],
    key: &[u8],
    value: &[u8],
) -> bool {
    match check_membership(proof, spec, root, key, value) {
        Ok(()) => true,
        Err(err) => {
            debug!(key = %hex::encode(key), %err, "membership proof rejected");
            false
        }
    }
}

/// `true` if `proof` shows that `key` is absent under `root`.
pub fn verify_non_membership(
    proof: &CommitmentProof,
    spec: &ProofSpec,
    root: &[u8],
    key: &[u8],
) -> bool {
    match check_non_membership(proof, spec, root, key) {
        Ok(()) => true,
        Err(err) => {
            debug!(key = %hex::encode(key), %err, "non-membership proof rejected");
            false
        }
    }
}

/// Key as used for ordering neighbours.
pub fn key_for_comparison(spec: &ProofSpec, key: &[u8]) -> Vec<u8> {
    if spec.prehash_key_before_comparison {
        do_hash(spec.leaf_spec.prehash_key, key)
    } else {
        key.to_vec()
    }
}

fn check_inner_spec(spec: &InnerSpec) -> Result<(), VerifyError> {
    ensure_spec!(spec.child_size > 0, "child size must be positive");
    ensure_spec!(!spec.child_order.is_empty(), "child order is empty");
    ensure_spec!(
        spec.min_prefix_length >= 0 && spec.min_prefix_length <= spec.max_prefix_length,
        "prefix bounds [{}, {}] are inconsistent",
        spec.min_prefix_length,
        spec.max_prefix_length
    );
    let n = spec.child_order.len();
    let mut seen = vec![false; n];
    for &branch in &spec.child_order {
        ensure_spec!(
            branch >= 0 && (branch as usize) < n && !seen[branch as usize],
            "child order {:?} is not a permutation",
            spec.child_order
        );
        seen[branch as usize] = true;
    }
    Ok(())
}

fn ensure_leaf(leaf: &LeafOp, leaf_spec: &LeafOp) -> Result<(), VerifyError> {
    ensure_spec!(
        leaf.hash == leaf_spec.hash,
        "unexpected leaf hash op {:?}",
        leaf.hash
    );
    ensure_spec!(
        leaf.prehash_key == leaf_spec.prehash_key,
        "unexpected leaf prehash key op {:?}",
        leaf.prehash_key
    );
    ensure_spec!(
        leaf.prehash_value == leaf_spec.prehash_value,
        "unexpected leaf prehash value op {:?}",
        leaf.prehash_value
    );
    ensure_spec!(
        leaf.length == leaf_spec.length,
        "unexpected leaf length op {:?}",
        leaf.length
    );
    ensure_spec!(
        leaf.prefix.starts_with(&leaf_spec.prefix),
        "leaf prefix {} does not start with {}",
        hex::encode(&leaf.prefix),
        hex::encode(&leaf_spec.prefix)
    );
    Ok(())
}

fn ensure_inner(inner: &InnerOp, spec: &ProofSpec) -> Result<(), VerifyError> {
    let inner_spec = &spec.inner_spec;
    ensure_spec!(
        inner.hash == inner_spec.hash,
        "unexpected inner hash op {:?}",
        inner.hash
    );
    ensure_spec!(
        !inner.prefix.starts_with(&spec.leaf_spec.prefix),
        "inner prefix starts with the leaf prefix"
    );

    let child_size = inner_spec.child_size as usize;
    let min_prefix = inner_spec.min_prefix_length as usize;
    // Every child but the one being proven may sit in the prefix or suffix.
    let max_sibling_bytes = (inner_spec.child_order.len() - 1) * child_size;
    let max_prefix = inner_spec.max_prefix_length as usize + max_sibling_bytes;
    ensure_spec!(
        inner.prefix.len() >= min_prefix,
        "inner prefix of {} bytes is shorter than {min_prefix}",
        inner.prefix.len()
    );
    ensure_spec!(
        inner.prefix.len() <= max_prefix,
        "inner prefix of {} bytes is longer than {max_prefix}",
        inner.prefix.len()
    );
    ensure_spec!(
        inner.suffix.len() % child_size == 0,
        "inner suffix of {} bytes is not a whole number of {child_size} byte children",
        inner.suffix.len()
    );
    ensure_spec!(
        inner.suffix.len() <= max_sibling_bytes,
        "inner suffix of {} bytes is longer than {max_sibling_bytes}",
        inner.suffix.len()
    );
    ensure_spec!(
        inner.prefix.len() + inner.suffix.len() <= max_prefix,
        "inner prefix and suffix of {} bytes hold more than {} siblings",
        inner.prefix.len() + inner.suffix.len(),
        inner_spec.child_order.len() - 1
    );
    Ok(())
}

/// Allowed prefix and suffix sizes of a step whose child sits in a given branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Padding {
    min_prefix: usize,
    max_prefix: usize,
    suffix: usize,
}

impl Padding {
    fn matches(&self, op: &InnerOp) -> bool {
        op.prefix.len() >= self.min_prefix
            && op.prefix.len() <= self.max_prefix
            && op.suffix.len() == self.suffix
    }
}

/// Position of `branch` in the hashed image.
fn position(spec: &InnerSpec, branch: usize) -> Result<usize, VerifyError> {
    spec.child_order
        .iter()
        .position(|&b| b as usize == branch)
        .ok_or_else(|| VerifyError::SpecViolation(format!("branch {branch} not in child order")))
}

fn padding(spec: &InnerSpec, branch: usize) -> Result<Padding, VerifyError> {
    let idx = position(spec, branch)?;
    let child_size = spec.child_size as usize;
    let prefix = idx * child_size;
    Ok(Padding {
        min_prefix: prefix + spec.min_prefix_length as usize,
        max_prefix: prefix + spec.max_prefix_length as usize,
        suffix: (spec.child_order.len() - 1 - idx) * child_size,
    })
}

/// Branch the proven child occupies in `op`, recovered from its padding.
fn branch_of(spec: &InnerSpec, op: &InnerOp) -> Result<usize, VerifyError> {
    for branch in 0..spec.child_order.len() {
        if padding(spec, branch)?.matches(op) {
            return Ok(branch);
        }
    }
    Err(VerifyError::OrderingViolation(
        "inner op padding matches no branch".to_string(),
    ))
}

/// Bytes of the sibling in `other` branch of a step whose own child is at `branch`.
fn sibling<'a>(
    spec: &InnerSpec,
    op: &'a InnerOp,
    branch: usize,
    other: usize,
) -> Result<Option<&'a [u8]>, VerifyError> {
    let child_size = spec.child_size as usize;
    let own = position(spec, branch)?;
    let pos = position(spec, other)?;
    let slot = if pos < own {
        // The siblings before us are the last `own` slots of the prefix.
        let Some(start) = op.prefix.len().checked_sub((own - pos) * child_size) else {
            return Ok(None);
        };
        op.prefix.get(start..start + child_size)
    } else {
        let start = (pos - own - 1) * child_size;
        op.suffix.get(start..start + child_size)
    };
    Ok(slot)
}

fn left_branches_are_empty(spec: &InnerSpec, op: &InnerOp) -> Result<bool, VerifyError> {
    if spec.empty_child.is_empty() {
        return Ok(false);
    }
    let branch = branch_of(spec, op)?;
    if branch == 0 {
        return Ok(false);
    }
    for other in 0..branch {
        if sibling(spec, op, branch, other)? != Some(spec.empty_child.as_slice()) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn right_branches_are_empty(spec: &InnerSpec, op: &InnerOp) -> Result<bool, VerifyError> {
    if spec.empty_child.is_empty() {
        return Ok(false);
    }
    let branch = branch_of(spec, op)?;
    let last = spec.child_order.len() - 1;
    if branch == last {
        return Ok(false);
    }
    for other in branch + 1..=last {
        if sibling(spec, op, branch, other)? != Some(spec.empty_child.as_slice()) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Every step either descends into the first branch or has only empty
/// children to its left.
fn ensure_left_most(spec: &InnerSpec, path: &[InnerOp]) -> Result<(), VerifyError> {
    let first = padding(spec, 0)?;
    for step in path {
        if !first.matches(step) && !left_branches_are_empty(spec, step)? {
            return Err(VerifyError::OrderingViolation(
                "step is not left-most".to_string(),
            ));
        }
    }
    Ok(())
}

/// Every step either descends into the last branch or has only empty
/// children to its right.
fn ensure_right_most(spec: &InnerSpec, path: &[InnerOp]) -> Result<(), VerifyError> {
    let last = padding(spec, spec.child_order.len() - 1)?;
    for step in path {
        if !last.matches(step) && !right_branches_are_empty(spec, step)? {
            return Err(VerifyError::OrderingViolation(
                "step is not right-most".to_string(),
            ));
        }
    }
    Ok(())
}

/// `left` and `right` lead to adjacent leaves: they share every step above
/// their first divergence, diverge into consecutive branches there, and below
/// it hug the facing edges of their subtrees.
fn ensure_left_neighbor(
    spec: &InnerSpec,
    left: &[InnerOp],
    right: &[InnerOp],
) -> Result<(), VerifyError> {
    let (mut l, mut r) = (left.len(), right.len());
    loop {
        if l == 0 || r == 0 {
            return Err(VerifyError::OrderingViolation(
                "paths never diverge".to_string(),
            ));
        }
        let (top_left, top_right) = (&left[l - 1], &right[r - 1]);
        if top_left.prefix != top_right.prefix || top_left.suffix != top_right.suffix {
            break;
        }
        l -= 1;
        r -= 1;
    }

    if !is_left_step(spec, &left[l - 1], &right[r - 1])? {
        return Err(VerifyError::OrderingViolation(
            "neighbours do not diverge into adjacent branches".to_string(),
        ));
    }
    ensure_right_most(spec, &left[..l - 1])?;
    ensure_left_most(spec, &right[..r - 1])
}

fn is_left_step(spec: &InnerSpec, left: &InnerOp, right: &InnerOp) -> Result<bool, VerifyError> {
    let left_branch = branch_of(spec, left)?;
    let right_branch = branch_of(spec, right)?;
    Ok(left_branch + 1 == right_branch)
}
