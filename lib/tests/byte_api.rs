use ics23_lib::api;
use ics23_lib::codec::{decode_commitment_proof, encode_commitment_proof};
use ics23_lib::{init, CommitmentProof, Config, DecodeError, Error, TreeBuilder, TreeVariant};

fn setup() {
    init(Config::default()).unwrap();
}

fn tree() -> TreeBuilder {
    TreeBuilder::new(
        TreeVariant::Iavl,
        [("a", "1"), ("b", "2"), ("c", "3"), ("d", "4"), ("e", "5")],
    )
    .unwrap()
}

fn encoded(tree: &TreeBuilder, key: &str) -> Vec<u8> {
    encode_commitment_proof(&tree.proof(key.as_bytes()))
}

#[test]
fn test_membership_over_bytes() {
    setup();
    let tree = tree();
    let spec = api::default_iavl_spec().unwrap();
    let proof = encoded(&tree, "c");
    assert_eq!(api::verify_membership(&proof, &spec, tree.root(), b"c", b"3"), Ok(true));
    assert_eq!(api::verify_membership(&proof, &spec, tree.root(), b"c", b"4"), Ok(false));
    assert_eq!(api::verify_membership(&proof, &spec, &[0; 32], b"c", b"3"), Ok(false));

    let other_spec = api::default_tendermint_spec().unwrap();
    assert_eq!(
        api::verify_membership(&proof, &other_spec, tree.root(), b"c", b"3"),
        Ok(false)
    );
}

#[test]
fn test_non_membership_over_bytes() {
    setup();
    let tree = tree();
    let spec = api::default_iavl_spec().unwrap();
    let proof = encoded(&tree, "bb");
    assert_eq!(api::verify_non_membership(&proof, &spec, tree.root(), b"bb"), Ok(true));
    assert_eq!(api::verify_non_membership(&proof, &spec, tree.root(), b"b"), Ok(false));
}

#[test]
fn test_missing_value() {
    setup();
    let tree = tree();
    let spec = api::default_iavl_spec().unwrap();
    assert_eq!(
        api::verify_membership(&encoded(&tree, "a"), &spec, tree.root(), b"a", b""),
        Err(Error::MissingValue)
    );
}

#[test]
fn test_truncated_proof_is_error() {
    setup();
    let tree = tree();
    let spec = api::default_iavl_spec().unwrap();
    let proof = encoded(&tree, "a");
    let result = api::verify_membership(&proof[..proof.len() - 3], &spec, tree.root(), b"a", b"1");
    assert!(matches!(result, Err(Error::Decode(DecodeError::Malformed(_)))));
}

#[test]
fn test_oversized_input_rejected() {
    setup();
    let spec = api::default_iavl_spec().unwrap();
    let huge = vec![0u8; Config::default().max_proof_bytes + 1];
    assert!(matches!(
        api::verify_non_membership(&huge, &spec, &[0; 32], b"k"),
        Err(Error::Decode(DecodeError::Oversized { .. }))
    ));
}

#[test]
fn test_batch_build_compress_round_trip() {
    setup();
    let tree = tree();
    let spec = api::default_iavl_spec().unwrap();
    let singles: Vec<Vec<u8>> = ["a", "c", "e", "cc"].iter().map(|k| encoded(&tree, k)).collect();

    let batch = api::build_batch_proof(&singles).unwrap();
    assert!(matches!(
        decode_commitment_proof(&batch).unwrap(),
        CommitmentProof::Batch(_)
    ));
    let compressed = api::compress_batch_proof(&batch).unwrap();
    assert!(compressed.len() < batch.len());
    assert_eq!(api::decompress_batch_proof(&compressed).unwrap(), batch);

    let keys = vec![b"a".to_vec(), b"c".to_vec(), b"e".to_vec()];
    let values = vec![b"1".to_vec(), b"3".to_vec(), b"5".to_vec()];
    for proof in [&batch, &compressed] {
        assert_eq!(
            api::verify_batch_membership(proof, &spec, tree.root(), &keys, &values),
            Ok(true)
        );
        assert_eq!(
            api::verify_batch_non_membership(proof, &spec, tree.root(), &[b"cc".to_vec()]),
            Ok(true)
        );
        assert_eq!(
            api::verify_batch_non_membership(proof, &spec, tree.root(), &[b"zz".to_vec()]),
            Ok(false)
        );
    }
    assert!(matches!(
        api::verify_batch_membership(&batch, &spec, tree.root(), &keys, &values[..2]),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn test_nested_batch_rejected() {
    setup();
    let tree = tree();
    let batch = api::build_batch_proof(&[encoded(&tree, "a")]).unwrap();
    assert!(matches!(
        api::build_batch_proof(&[batch]),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn test_calculate_root_over_bytes() {
    setup();
    let tree = tree();
    assert_eq!(
        api::calculate_existence_root(&encoded(&tree, "d")).unwrap(),
        tree.root()
    );
    assert!(matches!(
        api::calculate_existence_root(&encoded(&tree, "dd")),
        Err(Error::InvalidArgument(_))
    ));
}
