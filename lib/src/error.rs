use thiserror::Error;

/// Malformed bytes: the input could not be turned into a well-formed proof or spec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed protobuf: {0}")]
    Malformed(String),
    #[error("unknown hash op {0}")]
    UnknownHashOp(i32),
    #[error("unknown length op {0}")]
    UnknownLengthOp(i32),
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("no variant set in `{0}`")]
    EmptyOneof(&'static str),
    #[error("field `{field}` must not be negative, got {value}")]
    NegativeValue { field: &'static str, value: i32 },
    #[error("lookup index {index} outside table of {len} inner ops")]
    LookupIndexOutOfRange { index: i32, len: usize },
    #[error("input of {len} bytes exceeds the {limit} byte limit")]
    Oversized { len: usize, limit: usize },
}

impl From<prost::DecodeError> for DecodeError {
    fn from(err: prost::DecodeError) -> Self {
        DecodeError::Malformed(err.to_string())
    }
}

/// Reason a well-formed proof was rejected. The boolean verification calls
/// fold all of these into `false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("spec violation: {0}")]
    SpecViolation(String),
    #[error("calculated root {} does not match expected {}", hex::encode(.actual), hex::encode(.expected))]
    HashMismatch { expected: Vec<u8>, actual: Vec<u8> },
    #[error("proof is for a different key")]
    KeyMismatch,
    #[error("proof commits to a different value")]
    ValueMismatch,
    #[error("ordering violation: {0}")]
    OrderingViolation(String),
    #[error("no proof in batch for key {}", hex::encode(.0))]
    KeyNotInBatch(Vec<u8>),
}

/// Errors surfaced by the byte-level API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Verify(#[from] VerifyError),
    #[error("backend has not been initialized; call `backend::init` first")]
    NotInitialized,
    #[error("the `value` field is required for membership verification")]
    MissingValue,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("hash self test failed: {0}")]
    SelfTest(String),
}

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Shorthand for returning a [`VerifyError::SpecViolation`] from a check.
macro_rules! ensure_spec {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::VerifyError::SpecViolation(format!($($arg)+)));
        }
    };
}

pub(crate) use ensure_spec;
