//! Byte-level entry points.
//!
//! Proofs and specs cross this boundary protobuf-encoded. Malformed input is
//! an `Err`; a well-formed proof that does not verify is `Ok(false)`.

use tracing::debug;

use crate::backend::{try_backend, Backend};
use crate::codec::{decode_commitment_proof, decode_spec, encode_commitment_proof, encode_spec};
use crate::error::Error;
use crate::types::{CommitmentProof, Hash, ProofSpec};
use crate::{batch, compress, specs, verify};

pub fn default_iavl_spec() -> Result<Vec<u8>, Error> {
    try_backend()?;
    Ok(encode_spec(specs::iavl_spec()))
}

pub fn default_tendermint_spec() -> Result<Vec<u8>, Error> {
    try_backend()?;
    Ok(encode_spec(specs::tendermint_spec()))
}

pub fn default_smt_spec() -> Result<Vec<u8>, Error> {
    try_backend()?;
    Ok(encode_spec(specs::smt_spec()))
}

/// Does `proof` commit `key => value` under `root`?
///
/// An empty `value` is [`Error::MissingValue`]; use
/// [`verify_non_membership`] to prove absence.
pub fn verify_membership(
    proof: &[u8],
    spec: &[u8],
    root: &[u8],
    key: &[u8],
    value: &[u8],
) -> Result<bool, Error> {
    let backend = try_backend()?;
    if value.is_empty() {
        return Err(Error::MissingValue);
    }
    let (proof, spec) = decode_inputs(backend, proof, spec)?;
    verdict(
        verify::check_membership(&proof, &spec, root, key, value),
        "membership",
    )
}

/// Does `proof` show `key` to be absent under `root`?
pub fn verify_non_membership(
    proof: &[u8],
    spec: &[u8],
    root: &[u8],
    key: &[u8],
) -> Result<bool, Error> {
    let backend = try_backend()?;
    let (proof, spec) = decode_inputs(backend, proof, spec)?;
    verdict(
        verify::check_non_membership(&proof, &spec, root, key),
        "non-membership",
    )
}

/// Does `proof` commit every `keys[i] => values[i]` under `root`?
pub fn verify_batch_membership(
    proof: &[u8],
    spec: &[u8],
    root: &[u8],
    keys: &[Vec<u8>],
    values: &[Vec<u8>],
) -> Result<bool, Error> {
    let backend = try_backend()?;
    if keys.len() != values.len() {
        return Err(Error::InvalidArgument(format!(
            "{} keys but {} values",
            keys.len(),
            values.len()
        )));
    }
    if values.iter().any(Vec::is_empty) {
        return Err(Error::MissingValue);
    }
    let (proof, spec) = decode_inputs(backend, proof, spec)?;
    let items: Vec<(&[u8], &[u8])> = keys
        .iter()
        .zip(values)
        .map(|(k, v)| (k.as_slice(), v.as_slice()))
        .collect();
    verdict(
        batch::check_batch_membership(
            &proof,
            &spec,
            root,
            &items,
            backend.config().parallel_batches,
        ),
        "batch membership",
    )
}

/// Does `proof` show every key in `keys` to be absent under `root`?
pub fn verify_batch_non_membership(
    proof: &[u8],
    spec: &[u8],
    root: &[u8],
    keys: &[Vec<u8>],
) -> Result<bool, Error> {
    let backend = try_backend()?;
    let (proof, spec) = decode_inputs(backend, proof, spec)?;
    let keys: Vec<&[u8]> = keys.iter().map(Vec::as_slice).collect();
    verdict(
        batch::check_batch_non_membership(
            &proof,
            &spec,
            root,
            &keys,
            backend.config().parallel_batches,
        ),
        "batch non-membership",
    )
}

/// Combine encoded single proofs into one encoded batch proof.
pub fn build_batch_proof(proofs: &[Vec<u8>]) -> Result<Vec<u8>, Error> {
    let backend = try_backend()?;
    let decoded = proofs
        .iter()
        .map(|bytes| decode_proof(backend, bytes))
        .collect::<Result<Vec<_>, _>>()?;
    let batch = batch::build_batch_proof(decoded)?;
    Ok(encode_commitment_proof(&batch))
}

pub fn compress_batch_proof(proof: &[u8]) -> Result<Vec<u8>, Error> {
    let backend = try_backend()?;
    let proof = decode_proof(backend, proof)?;
    Ok(encode_commitment_proof(&compress::compress(&proof)))
}

pub fn decompress_batch_proof(proof: &[u8]) -> Result<Vec<u8>, Error> {
    let backend = try_backend()?;
    let proof = decode_proof(backend, proof)?;
    Ok(encode_commitment_proof(&compress::decompress(&proof)?))
}

/// Root committed to by an encoded existence proof.
pub fn calculate_existence_root(proof: &[u8]) -> Result<Hash, Error> {
    let backend = try_backend()?;
    match decode_proof(backend, proof)? {
        CommitmentProof::Exist(ex) => Ok(verify::calculate_existence_root(&ex)?),
        _ => Err(Error::InvalidArgument(
            "root can only be calculated from an existence proof".to_string(),
        )),
    }
}

fn decode_proof(backend: &Backend, bytes: &[u8]) -> Result<CommitmentProof, Error> {
    backend.check_size(bytes)?;
    Ok(decode_commitment_proof(bytes)?)
}

fn decode_inputs(
    backend: &Backend,
    proof: &[u8],
    spec: &[u8],
) -> Result<(CommitmentProof, ProofSpec), Error> {
    backend.check_size(spec)?;
    let spec = decode_spec(spec)?;
    Ok((decode_proof(backend, proof)?, spec))
}

/// Fold a verification failure into `false`; anything else stays an error.
fn verdict(outcome: Result<(), Error>, what: &str) -> Result<bool, Error> {
    match outcome {
        Ok(()) => Ok(true),
        Err(Error::Verify(err)) => {
            debug!(%err, "{what} proof rejected");
            Ok(false)
        }
        Err(err) => Err(err),
    }
}
