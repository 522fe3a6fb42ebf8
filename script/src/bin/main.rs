//! Command line front end for the ICS-23 proof verifier.
//!
//! All byte arguments are hex, with or without a `0x` prefix. For example:
//! ```shell
//! ics23 sample iavl --entry a=1 --entry b=2 --entry c=3 --key b --key ab
//! RUST_LOG=debug ics23 verify --spec iavl --root <hex> --proof <hex> --key 62 --value 32
//! ```
//!
//! Settings may also come from the environment or a `.env` file.

use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use ics23_lib::backend::DEFAULT_MAX_PROOF_BYTES;
use ics23_lib::codec::encode_commitment_proof;
use ics23_lib::{api, init, try_backend, CommitmentProof, Config, TreeBuilder, TreeVariant};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// The arguments for the command.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Reject any proof or spec larger than this many bytes.
    #[arg(long, env = "ICS23_MAX_PROOF_BYTES", default_value_t = DEFAULT_MAX_PROOF_BYTES)]
    max_proof_bytes: usize,

    /// Check batch items one at a time.
    #[arg(long, env = "ICS23_SEQUENTIAL")]
    sequential: bool,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Raise the log level (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the encoded spec of a preset.
    Spec { preset: Preset },
    /// Check that the proof commits key => value under root.
    Verify {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        key: Hex,
        #[arg(long)]
        value: Hex,
    },
    /// Check that the proof shows key to be absent under root.
    VerifyAbsent {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        key: Hex,
    },
    /// Check every key => value pair against a batch proof.
    VerifyBatch {
        #[command(flatten)]
        target: Target,
        #[arg(long = "key", required = true)]
        keys: Vec<Hex>,
        #[arg(long = "value", required = true)]
        values: Vec<Hex>,
    },
    /// Check that a batch proof shows every key to be absent.
    VerifyBatchAbsent {
        #[command(flatten)]
        target: Target,
        #[arg(long = "key", required = true)]
        keys: Vec<Hex>,
    },
    /// Combine single proofs into a batch proof.
    BuildBatch {
        #[arg(required = true)]
        proofs: Vec<Hex>,
    },
    /// Deduplicate the inner steps of a batch proof.
    Compress { proof: Hex },
    /// Expand a compressed batch proof.
    Decompress { proof: Hex },
    /// Print the root an existence proof commits to.
    Root { proof: Hex },
    /// Build a reference tree and print proofs for the requested keys.
    Sample {
        preset: Preset,
        /// Tree entry as `key=value` (UTF-8).
        #[arg(long = "entry", value_parser = parse_entry, required = true)]
        entries: Vec<(String, String)>,
        /// Key to prove, present or absent.
        #[arg(long = "key")]
        keys: Vec<String>,
    },
    /// Print the backend configuration in effect.
    Config,
}

/// Spec, root and proof shared by every verification command.
#[derive(clap::Args, Debug)]
struct Target {
    /// Preset name or hex-encoded ProofSpec.
    #[arg(long)]
    spec: String,
    #[arg(long)]
    root: Hex,
    #[arg(long)]
    proof: Hex,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Preset {
    Iavl,
    Tendermint,
    Smt,
}

impl From<Preset> for TreeVariant {
    fn from(preset: Preset) -> Self {
        match preset {
            Preset::Iavl => TreeVariant::Iavl,
            Preset::Tendermint => TreeVariant::Tendermint,
            Preset::Smt => TreeVariant::Smt,
        }
    }
}

/// Hex-encoded bytes.
#[derive(Clone, Debug)]
struct Hex(Vec<u8>);

impl FromStr for Hex {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex::decode(s.strip_prefix("0x").unwrap_or(s)).map(Hex)
    }
}

fn parse_entry(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() && !value.is_empty() => {
            Ok((key.to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got `{s}`")),
    }
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
enum Output {
    Verdict {
        verified: bool,
    },
    Bytes {
        hex: String,
    },
    Sample {
        variant: String,
        spec: String,
        root: String,
        proofs: Vec<SampleProof>,
    },
    Config(Config),
}

#[derive(Serialize, Debug)]
struct SampleProof {
    key: String,
    kind: &'static str,
    proof: String,
    decoded: CommitmentProof,
}

impl Output {
    fn bytes(bytes: &[u8]) -> Self {
        Output::Bytes {
            hex: hex::encode(bytes),
        }
    }

    fn print(&self, json: bool) -> Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(self)?);
            return Ok(());
        }
        match self {
            Output::Verdict { verified: true } => println!("verified"),
            Output::Verdict { verified: false } => println!("NOT verified"),
            Output::Bytes { hex } => println!("{hex}"),
            Output::Sample {
                variant,
                spec,
                root,
                proofs,
            } => {
                println!("variant: {variant}");
                println!("spec:    {spec}");
                println!("root:    {root}");
                for p in proofs {
                    println!("\n{} ({})\n{}", p.key, p.kind, p.proof);
                }
            }
            Output::Config(config) => {
                println!("max proof bytes:  {}", config.max_proof_bytes);
                println!("parallel batches: {}", config.parallel_batches);
            }
        }
        Ok(())
    }

    fn exit_code(&self) -> ExitCode {
        match self {
            Output::Verdict { verified: false } => ExitCode::FAILURE,
            _ => ExitCode::SUCCESS,
        }
    }
}

fn setup_logger(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn preset_spec(variant: TreeVariant) -> Result<Vec<u8>> {
    Ok(match variant {
        TreeVariant::Iavl => api::default_iavl_spec()?,
        TreeVariant::Tendermint => api::default_tendermint_spec()?,
        TreeVariant::Smt => api::default_smt_spec()?,
    })
}

/// A preset name or raw hex.
fn resolve_spec(spec: &str) -> Result<Vec<u8>> {
    if let Ok(variant) = spec.parse::<TreeVariant>() {
        return preset_spec(variant);
    }
    Ok(spec
        .parse::<Hex>()
        .with_context(|| format!("`{spec}` is neither a preset nor hex"))?
        .0)
}

fn unwrap_all(hexes: Vec<Hex>) -> Vec<Vec<u8>> {
    hexes.into_iter().map(|h| h.0).collect()
}

fn run(command: Command) -> Result<Output> {
    let output = match command {
        Command::Spec { preset } => Output::bytes(&preset_spec(preset.into())?),
        Command::Verify { target, key, value } => {
            let spec = resolve_spec(&target.spec)?;
            let verified =
                api::verify_membership(&target.proof.0, &spec, &target.root.0, &key.0, &value.0)
                    .context("membership check failed")?;
            Output::Verdict { verified }
        }
        Command::VerifyAbsent { target, key } => {
            let spec = resolve_spec(&target.spec)?;
            let verified =
                api::verify_non_membership(&target.proof.0, &spec, &target.root.0, &key.0)
                    .context("non-membership check failed")?;
            Output::Verdict { verified }
        }
        Command::VerifyBatch {
            target,
            keys,
            values,
        } => {
            let spec = resolve_spec(&target.spec)?;
            let verified = api::verify_batch_membership(
                &target.proof.0,
                &spec,
                &target.root.0,
                &unwrap_all(keys),
                &unwrap_all(values),
            )
            .context("batch membership check failed")?;
            Output::Verdict { verified }
        }
        Command::VerifyBatchAbsent { target, keys } => {
            let spec = resolve_spec(&target.spec)?;
            let verified = api::verify_batch_non_membership(
                &target.proof.0,
                &spec,
                &target.root.0,
                &unwrap_all(keys),
            )
            .context("batch non-membership check failed")?;
            Output::Verdict { verified }
        }
        Command::BuildBatch { proofs } => Output::bytes(
            &api::build_batch_proof(&unwrap_all(proofs)).context("could not build batch")?,
        ),
        Command::Compress { proof } => Output::bytes(
            &api::compress_batch_proof(&proof.0).context("could not compress proof")?,
        ),
        Command::Decompress { proof } => Output::bytes(
            &api::decompress_batch_proof(&proof.0).context("could not decompress proof")?,
        ),
        Command::Root { proof } => Output::bytes(
            &api::calculate_existence_root(&proof.0).context("could not calculate root")?,
        ),
        Command::Sample {
            preset,
            entries,
            keys,
        } => sample(preset.into(), entries, keys)?,
        Command::Config => Output::Config(try_backend()?.config().clone()),
    };
    Ok(output)
}

fn sample(variant: TreeVariant, entries: Vec<(String, String)>, keys: Vec<String>) -> Result<Output> {
    let tree = TreeBuilder::new(variant, entries).context("could not build sample tree")?;
    debug!(%variant, entries = tree.len(), "built sample tree");
    if keys.iter().any(String::is_empty) {
        bail!("keys must not be empty");
    }
    let proofs = keys
        .into_iter()
        .map(|key| {
            let proof = tree.proof(key.as_bytes());
            let kind = match proof {
                CommitmentProof::Exist(_) => "exist",
                _ => "nonexist",
            };
            SampleProof {
                key,
                kind,
                proof: hex::encode(encode_commitment_proof(&proof)),
                decoded: proof,
            }
        })
        .collect();
    Ok(Output::Sample {
        variant: variant.to_string(),
        spec: hex::encode(preset_spec(variant)?),
        root: hex::encode(tree.root()),
        proofs,
    })
}

fn main() -> Result<ExitCode> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    setup_logger(args.verbose);

    init(Config {
        max_proof_bytes: args.max_proof_bytes,
        parallel_batches: !args.sequential,
    })
    .context("failed to initialize the verification backend")?;

    let output = run(args.command)?;
    output.print(args.json)?;
    Ok(output.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse() {
        Args::try_parse_from(["ics23", "spec", "smt"]).unwrap();
        Args::try_parse_from([
            "ics23", "verify", "--spec", "iavl", "--root", "0xab", "--proof", "0a", "--key", "61",
            "--value", "31",
        ])
        .unwrap();
        assert!(Args::try_parse_from(["ics23", "verify-batch", "--spec", "iavl"]).is_err());
    }

    #[test]
    fn test_parse_entry() {
        assert_eq!(
            parse_entry("a=1").unwrap(),
            ("a".to_string(), "1".to_string())
        );
        assert!(parse_entry("a").is_err());
        assert!(parse_entry("=1").is_err());
    }

    #[test]
    fn test_hex_prefix_optional() {
        assert_eq!("0x0a0b".parse::<Hex>().unwrap().0, vec![10, 11]);
        assert_eq!("0a0b".parse::<Hex>().unwrap().0, vec![10, 11]);
        assert!("zz".parse::<Hex>().is_err());
    }

    #[test]
    fn test_sample_then_verify() {
        init(Config::default()).unwrap();
        let entries = vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
            ("c".to_string(), "3".to_string()),
        ];
        let Output::Sample { root, proofs, .. } =
            sample(TreeVariant::Iavl, entries, vec!["b".into(), "ab".into()]).unwrap()
        else {
            panic!("expected sample output");
        };
        assert_eq!(proofs[0].kind, "exist");
        assert_eq!(proofs[1].kind, "nonexist");

        let verify = Command::Verify {
            target: Target {
                spec: "iavl".to_string(),
                root: root.parse().unwrap(),
                proof: proofs[0].proof.parse().unwrap(),
            },
            key: Hex(b"b".to_vec()),
            value: Hex(b"2".to_vec()),
        };
        assert!(matches!(run(verify).unwrap(), Output::Verdict { verified: true }));

        let absent = Command::VerifyAbsent {
            target: Target {
                spec: "iavl".to_string(),
                root: root.parse().unwrap(),
                proof: proofs[1].proof.parse().unwrap(),
            },
            key: Hex(b"a".to_vec()),
        };
        assert!(matches!(run(absent).unwrap(), Output::Verdict { verified: false }));
    }

    #[test]
    fn test_sample_json_carries_decoded_proof() {
        init(Config::default()).unwrap();
        let entries = vec![("a".to_string(), "1".to_string())];
        let output = sample(TreeVariant::Tendermint, entries, vec!["a".into()]).unwrap();
        let json = serde_json::to_value(&output).unwrap();
        let entry = &json["proofs"][0];
        assert_eq!(entry["kind"], "exist");
        let decoded: CommitmentProof = serde_json::from_value(entry["decoded"].clone()).unwrap();
        assert_eq!(
            hex::encode(encode_commitment_proof(&decoded)),
            entry["proof"].as_str().unwrap()
        );
    }

    #[test]
    fn test_config_output_round_trips() {
        init(Config::default()).unwrap();
        let output = run(Command::Config).unwrap();
        let Output::Config(config) = &output else {
            panic!("expected config output");
        };
        let json = serde_json::to_string(&output).unwrap();
        assert_eq!(&serde_json::from_str::<Config>(&json).unwrap(), config);
    }
}
