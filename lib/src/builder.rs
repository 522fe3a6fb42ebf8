//! Static reference trees for the preset specs.
//!
//! A [`TreeBuilder`] hashes a fixed set of entries into one of the supported
//! tree shapes and hands out existence and non-existence proofs for it. It is
//! meant for tests and fixtures; there is no way to change a tree once built.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::hash::{do_hash, proto_varint};
use crate::ops::apply_leaf;
use crate::specs::{iavl_spec, smt_spec, tendermint_spec};
use crate::types::{
    CommitmentProof, ExistenceProof, Hash, HashOp, InnerOp, LeafOp, NonExistenceProof, ProofSpec,
};
use crate::verify::key_for_comparison;

/// Version stamped on every IAVL node.
const IAVL_VERSION: i64 = 1;

/// Tree shapes the builder knows how to produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeVariant {
    Iavl,
    Tendermint,
    Smt,
}

impl TreeVariant {
    pub fn spec(&self) -> &'static ProofSpec {
        match self {
            TreeVariant::Iavl => iavl_spec(),
            TreeVariant::Tendermint => tendermint_spec(),
            TreeVariant::Smt => smt_spec(),
        }
    }
}

impl fmt::Display for TreeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TreeVariant::Iavl => "iavl",
            TreeVariant::Tendermint => "tendermint",
            TreeVariant::Smt => "smt",
        })
    }
}

impl FromStr for TreeVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "iavl" => Ok(TreeVariant::Iavl),
            "tendermint" => Ok(TreeVariant::Tendermint),
            "smt" => Ok(TreeVariant::Smt),
            other => Err(Error::InvalidArgument(format!(
                "unknown tree variant `{other}`"
            ))),
        }
    }
}

#[derive(Clone, Debug)]
struct Entry {
    sort_key: Vec<u8>,
    key: Vec<u8>,
    value: Vec<u8>,
    leaf: LeafOp,
    path: Vec<InnerOp>,
}

/// An immutable tree over a sorted set of entries.
pub struct TreeBuilder {
    variant: TreeVariant,
    // Sorted by `sort_key`.
    entries: Vec<Entry>,
    root: Hash,
}

impl TreeBuilder {
    /// Build a tree over `entries`. A repeated key keeps its last value.
    pub fn new<I, K, V>(variant: TreeVariant, entries: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let spec = variant.spec();
        let mut sorted = BTreeMap::new();
        for (key, value) in entries {
            let (key, value) = (key.as_ref().to_vec(), value.as_ref().to_vec());
            if key.is_empty() || value.is_empty() {
                return Err(Error::InvalidArgument(
                    "tree entries need a non-empty key and value".to_string(),
                ));
            }
            sorted.insert(key_for_comparison(spec, &key), (key, value));
        }
        if sorted.is_empty() {
            return Err(Error::InvalidArgument(
                "a tree needs at least one entry".to_string(),
            ));
        }

        let leaf = match variant {
            TreeVariant::Iavl => iavl_leaf_op(),
            TreeVariant::Tendermint | TreeVariant::Smt => spec.leaf_spec.clone(),
        };
        let mut entries = sorted
            .into_iter()
            .map(|(sort_key, (key, value))| Entry {
                sort_key,
                key,
                value,
                leaf: leaf.clone(),
                path: Vec::new(),
            })
            .collect::<Vec<_>>();
        let leaves = entries
            .iter()
            .map(|e| apply_leaf(&e.leaf, &e.key, &e.value))
            .collect::<Result<Vec<_>, _>>()?;

        let root = match variant {
            TreeVariant::Tendermint => build_simple(&leaves, &mut entries),
            TreeVariant::Iavl => build_iavl(&leaves, &mut entries).0,
            TreeVariant::Smt => build_sparse(&leaves, &mut entries, 0),
        };
        Ok(Self {
            variant,
            entries,
            root,
        })
    }

    pub fn variant(&self) -> TreeVariant {
        self.variant
    }

    pub fn spec(&self) -> &'static ProofSpec {
        self.variant.spec()
    }

    /// Get the root hash
    pub fn root(&self) -> &[u8] {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in proof order.
    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.entries.iter().map(|e| e.key.as_slice())
    }

    /// Get a value by key
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.position(key).ok().map(|i| self.entries[i].value.as_slice())
    }

    pub fn existence_proof(&self, key: &[u8]) -> Option<ExistenceProof> {
        self.position(key).ok().map(|i| self.exist_at(i))
    }

    /// Neighbours bracketing `key`, or `None` if `key` is in the tree.
    pub fn non_existence_proof(&self, key: &[u8]) -> Option<NonExistenceProof> {
        let pos = self.position(key).err()?;
        Some(self.absent_at(key, pos))
    }

    /// Existence proof if `key` is present, non-existence proof otherwise.
    pub fn proof(&self, key: &[u8]) -> CommitmentProof {
        match self.position(key) {
            Ok(i) => CommitmentProof::Exist(self.exist_at(i)),
            Err(pos) => CommitmentProof::Nonexist(self.absent_at(key, pos)),
        }
    }

    fn position(&self, key: &[u8]) -> Result<usize, usize> {
        let target = key_for_comparison(self.spec(), key);
        self.entries
            .binary_search_by(|e| e.sort_key.as_slice().cmp(&target))
    }

    fn exist_at(&self, index: usize) -> ExistenceProof {
        let entry = &self.entries[index];
        ExistenceProof {
            key: entry.key.clone(),
            value: entry.value.clone(),
            leaf: entry.leaf.clone(),
            path: entry.path.clone(),
        }
    }

    /// `key` would be inserted at `pos`.
    fn absent_at(&self, key: &[u8], pos: usize) -> NonExistenceProof {
        NonExistenceProof {
            key: key.to_vec(),
            left: pos.checked_sub(1).map(|i| self.exist_at(i)),
            right: (pos < self.entries.len()).then(|| self.exist_at(pos)),
        }
    }
}

fn inner_op(prefix: Vec<u8>, suffix: Vec<u8>) -> InnerOp {
    InnerOp {
        hash: HashOp::Sha256,
        prefix,
        suffix,
    }
}

fn concat(parts: &[&[u8]]) -> Vec<u8> {
    parts.concat()
}

/// Split of `n > 1` leaves: the largest power of two below `n`.
fn split_point(n: usize) -> usize {
    let mut k = 1;
    while k * 2 < n {
        k *= 2;
    }
    k
}

/// RFC 6962 style tree: `sha256(0x01 || left || right)`.
fn build_simple(leaves: &[Hash], entries: &mut [Entry]) -> Hash {
    if leaves.len() == 1 {
        return leaves[0].clone();
    }
    let k = split_point(leaves.len());
    let (left_entries, right_entries) = entries.split_at_mut(k);
    let left = build_simple(&leaves[..k], left_entries);
    let right = build_simple(&leaves[k..], right_entries);

    for e in left_entries.iter_mut() {
        e.path.push(inner_op(vec![1], right.clone()));
    }
    for e in right_entries.iter_mut() {
        e.path.push(inner_op(concat(&[&[1], &left]), vec![]));
    }
    do_hash(HashOp::Sha256, &concat(&[&[1], &left, &right]))
}

fn zigzag(n: i64) -> Vec<u8> {
    proto_varint(((n << 1) ^ (n >> 63)) as u64)
}

fn iavl_leaf_op() -> LeafOp {
    let mut leaf = iavl_spec().leaf_spec.clone();
    // height 0, size 1, version
    leaf.prefix = concat(&[&zigzag(0), &zigzag(1), &zigzag(IAVL_VERSION)]);
    leaf
}

/// Balanced IAVL tree. Returns the subtree hash and height.
fn build_iavl(leaves: &[Hash], entries: &mut [Entry]) -> (Hash, i64) {
    if leaves.len() == 1 {
        return (leaves[0].clone(), 0);
    }
    let k = (leaves.len() + 1) / 2;
    let (left_entries, right_entries) = entries.split_at_mut(k);
    let (left, left_height) = build_iavl(&leaves[..k], left_entries);
    let (right, right_height) = build_iavl(&leaves[k..], right_entries);

    let height = left_height.max(right_height) + 1;
    let header = concat(&[
        &zigzag(height),
        &zigzag(leaves.len() as i64),
        &zigzag(IAVL_VERSION),
    ]);
    let hash_len = [left.len() as u8];

    for e in left_entries.iter_mut() {
        e.path.push(inner_op(
            concat(&[&header, &hash_len]),
            concat(&[&hash_len, &right]),
        ));
    }
    for e in right_entries.iter_mut() {
        e.path.push(inner_op(
            concat(&[&header, &hash_len, &left, &hash_len]),
            vec![],
        ));
    }
    let hash = do_hash(
        HashOp::Sha256,
        &concat(&[&header, &hash_len, &left, &hash_len, &right]),
    );
    (hash, height)
}

fn bit_at(bytes: &[u8], index: usize) -> u8 {
    (bytes[index / 8] >> (7 - index % 8)) & 1
}

/// Sparse tree keyed by the bits of `sha256(key)`. A lone leaf sits as high
/// as it can; missing subtrees hash to the placeholder.
fn build_sparse(leaves: &[Hash], entries: &mut [Entry], depth: usize) -> Hash {
    match leaves.len() {
        0 => return smt_spec().inner_spec.empty_child.clone(),
        1 => return leaves[0].clone(),
        _ => {}
    }
    let k = entries.partition_point(|e| bit_at(&e.sort_key, depth) == 0);
    let (left_entries, right_entries) = entries.split_at_mut(k);
    let left = build_sparse(&leaves[..k], left_entries, depth + 1);
    let right = build_sparse(&leaves[k..], right_entries, depth + 1);

    for e in left_entries.iter_mut() {
        e.path.push(inner_op(vec![1], right.clone()));
    }
    for e in right_entries.iter_mut() {
        e.path.push(inner_op(concat(&[&[1], &left]), vec![]));
    }
    do_hash(HashOp::Sha256, &concat(&[&[1], &left, &right]))
}
