use crate::error::{ensure_spec, VerifyError};
use crate::hash::{do_hash, encode_length};
use crate::types::{Hash, HashOp, InnerOp, LeafOp, LengthOp};

/// Hash a key-value pair into its leaf commitment.
///
/// `hash(prefix || length(key') || key' || length(value') || value')`
/// where `key'` and `value'` are the optionally prehashed inputs.
pub fn apply_leaf(leaf: &LeafOp, key: &[u8], value: &[u8]) -> Result<Hash, VerifyError> {
    ensure_spec!(!key.is_empty(), "leaf op needs a key");
    ensure_spec!(!value.is_empty(), "leaf op needs a value");

    let mut image = leaf.prefix.clone();
    image.extend(prepare_leaf_data(leaf.prehash_key, leaf.length, key)?);
    image.extend(prepare_leaf_data(leaf.prehash_value, leaf.length, value)?);
    Ok(do_hash(leaf.hash, &image))
}

/// Fold a child hash into its parent: `hash(prefix || child || suffix)`.
pub fn apply_inner(inner: &InnerOp, child: &[u8]) -> Result<Hash, VerifyError> {
    ensure_spec!(!child.is_empty(), "inner op needs a child hash");

    let mut image = Vec::with_capacity(inner.prefix.len() + child.len() + inner.suffix.len());
    image.extend_from_slice(&inner.prefix);
    image.extend_from_slice(child);
    image.extend_from_slice(&inner.suffix);
    Ok(do_hash(inner.hash, &image))
}

fn prepare_leaf_data(prehash: HashOp, length: LengthOp, data: &[u8]) -> Result<Vec<u8>, VerifyError> {
    let hashed = do_hash(prehash, data);
    encode_length(length, &hashed)
}
