use blake2::{Blake2b512, Blake2s256};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256, Sha512, Sha512_256};
use sha3::Keccak256;

use crate::error::{ensure_spec, VerifyError};
use crate::types::{Hash, HashOp, LengthOp};

/// Apply `op` to `data`. [`HashOp::NoHash`] returns the input unchanged.
pub fn do_hash(op: HashOp, data: &[u8]) -> Hash {
    match op {
        HashOp::NoHash => data.to_vec(),
        HashOp::Sha256 => Sha256::digest(data).to_vec(),
        HashOp::Sha512 => Sha512::digest(data).to_vec(),
        HashOp::Keccak256 => keccak256(data).to_vec(),
        HashOp::Ripemd160 => Ripemd160::digest(data).to_vec(),
        HashOp::Bitcoin => Ripemd160::digest(Sha256::digest(data)).to_vec(),
        HashOp::Sha512_256 => Sha512_256::digest(data).to_vec(),
        HashOp::Blake2b512 => Blake2b512::digest(data).to_vec(),
        HashOp::Blake2s256 => Blake2s256::digest(data).to_vec(),
        HashOp::Blake3 => blake3::hash(data).as_bytes().to_vec(),
    }
}

/// Compute Keccak256 hash
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Prefix `data` with its length encoded according to `op`.
///
/// The `Require*` modes add nothing but reject data of the wrong size.
pub fn encode_length(op: LengthOp, data: &[u8]) -> Result<Vec<u8>, VerifyError> {
    let len = data.len();
    let mut out = match op {
        LengthOp::NoPrefix => Vec::with_capacity(len),
        LengthOp::Require32Bytes => {
            ensure_spec!(len == 32, "length op requires 32 bytes, got {len}");
            Vec::with_capacity(len)
        }
        LengthOp::Require64Bytes => {
            ensure_spec!(len == 64, "length op requires 64 bytes, got {len}");
            Vec::with_capacity(len)
        }
        LengthOp::VarProto => proto_varint(len as u64),
        // rlp::encode emits the header followed by the data itself.
        LengthOp::VarRlp => return Ok(rlp::encode(&data.to_vec()).to_vec()),
        LengthOp::Fixed32Big => u32_len(len)?.to_be_bytes().to_vec(),
        LengthOp::Fixed32Little => u32_len(len)?.to_le_bytes().to_vec(),
        LengthOp::Fixed64Big => (len as u64).to_be_bytes().to_vec(),
        LengthOp::Fixed64Little => (len as u64).to_le_bytes().to_vec(),
    };
    out.extend_from_slice(data);
    Ok(out)
}

/// Protobuf varint: 7 bits per byte, least significant group first,
/// high bit set on every byte but the last.
pub fn proto_varint(mut n: u64) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(10);
    while n >= 0x80 {
        bytes.push((n as u8 & 0x7f) | 0x80);
        n >>= 7;
    }
    bytes.push(n as u8);
    bytes
}

fn u32_len(len: usize) -> Result<u32, VerifyError> {
    u32::try_from(len)
        .map_err(|_| VerifyError::SpecViolation(format!("length {len} does not fit in 32 bits")))
}

/// Known-answer check over every hash op. Run once when the backend starts.
pub(crate) fn self_test() -> Result<(), String> {
    const VECTORS: &[(HashOp, &str)] = &[
        (
            HashOp::Sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
        ),
        (
            HashOp::Keccak256,
            "4e03657aea45a94fc7d47ba826c8d667c0d1e6e33a64a036ec44f58fa12d6c45",
        ),
        (HashOp::Ripemd160, "8eb208f7e05d987a9b044a8e98c6b087f15a0bfc"),
    ];
    for (op, expected) in VECTORS {
        let actual = hex::encode(do_hash(*op, b"abc"));
        if actual != *expected {
            return Err(format!("{op:?} self test failed: got {actual}"));
        }
    }
    for op in [
        HashOp::Sha512,
        HashOp::Bitcoin,
        HashOp::Sha512_256,
        HashOp::Blake2b512,
        HashOp::Blake2s256,
        HashOp::Blake3,
    ] {
        if do_hash(op, b"abc").len() != digest_len(op) {
            return Err(format!("{op:?} produced a digest of the wrong size"));
        }
    }
    Ok(())
}

fn digest_len(op: HashOp) -> usize {
    match op {
        HashOp::NoHash => 0,
        HashOp::Ripemd160 | HashOp::Bitcoin => 20,
        HashOp::Sha512 | HashOp::Blake2b512 => 64,
        _ => 32,
    }
}
