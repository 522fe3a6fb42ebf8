//! One-time initialization of the verification backend.
//!
//! Every byte-level entry point in [`crate::api`] requires [`init`] to have
//! run. The first call checks the hash table against known answers, builds
//! the preset specs and stores the [`Config`]; later calls return the same
//! backend.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DecodeError, Error};
use crate::{hash, specs};

/// Default cap on the size of any encoded proof or spec.
pub const DEFAULT_MAX_PROOF_BYTES: usize = 1 << 20;

static BACKEND: OnceCell<Backend> = OnceCell::new();

/// Runtime settings fixed at [`init`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Inputs larger than this are rejected before decoding.
    pub max_proof_bytes: usize,
    /// Check batch items on the rayon pool when the `parallel` feature is on.
    pub parallel_batches: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_proof_bytes: DEFAULT_MAX_PROOF_BYTES,
            parallel_batches: true,
        }
    }
}

#[derive(Debug)]
pub struct Backend {
    config: Config,
}

impl Backend {
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Reject `input` if it is over the configured size limit.
    pub fn check_size(&self, input: &[u8]) -> Result<(), DecodeError> {
        let limit = self.config.max_proof_bytes;
        if input.len() > limit {
            return Err(DecodeError::Oversized {
                len: input.len(),
                limit,
            });
        }
        Ok(())
    }

    fn start(config: Config) -> Result<Self, Error> {
        if config.max_proof_bytes == 0 {
            return Err(Error::InvalidArgument(
                "max_proof_bytes must be positive".to_string(),
            ));
        }
        hash::self_test().map_err(Error::SelfTest)?;
        specs::warm_up();
        info!(
            max_proof_bytes = config.max_proof_bytes,
            parallel_batches = config.parallel_batches,
            "verification backend initialized"
        );
        Ok(Self { config })
    }
}

/// Initialize the backend. Concurrent callers block until the first one
/// finishes; once set, `config` is ignored and the existing backend returned.
pub fn init(config: Config) -> Result<&'static Backend, Error> {
    if let Some(backend) = BACKEND.get() {
        if backend.config != config {
            debug!(?config, "backend already initialized, ignoring new config");
        }
        return Ok(backend);
    }
    BACKEND.get_or_try_init(|| Backend::start(config))
}

/// The initialized backend, or [`Error::NotInitialized`].
pub fn try_backend() -> Result<&'static Backend, Error> {
    BACKEND.get().ok_or(Error::NotInitialized)
}

pub fn is_initialized() -> bool {
    BACKEND.get().is_some()
}
