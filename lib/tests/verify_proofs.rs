use ics23_lib::{
    batch::{check_batch_membership, check_batch_non_membership},
    build_batch_proof, calculate_existence_root, compress, decompress, iavl_spec, smt_spec,
    tendermint_spec,
    verify::{check_non_membership, key_for_comparison}, verify_batch_membership,
    verify_batch_non_membership, verify_membership, verify_non_membership, CommitmentProof,
    Error, ExistenceProof, TreeBuilder, TreeVariant, VerifyError,
};

const VARIANTS: [TreeVariant; 3] = [TreeVariant::Iavl, TreeVariant::Tendermint, TreeVariant::Smt];

fn fruit_tree(variant: TreeVariant) -> TreeBuilder {
    TreeBuilder::new(
        variant,
        [
            ("apple", "red"),
            ("banana", "yellow"),
            ("cherry", "dark red"),
            ("grape", "purple"),
            ("kiwi", "green"),
            ("lemon", "sour"),
            ("mango", "orange"),
            ("peach", "fuzzy"),
            ("plum", "violet"),
        ],
    )
    .unwrap()
}

fn exist(tree: &TreeBuilder, key: &str) -> ExistenceProof {
    tree.existence_proof(key.as_bytes()).unwrap()
}

#[test]
fn test_existence_proofs_verify() {
    for variant in VARIANTS {
        let tree = fruit_tree(variant);
        let proof = CommitmentProof::Exist(exist(&tree, "grape"));
        assert!(
            verify_membership(&proof, tree.spec(), tree.root(), b"grape", b"purple"),
            "{variant}"
        );
        assert!(!verify_membership(&proof, tree.spec(), tree.root(), b"grape", b"green"));
        assert!(!verify_membership(&proof, tree.spec(), tree.root(), b"kiwi", b"purple"));
    }
}

#[test]
fn test_calculated_root_matches() {
    for variant in VARIANTS {
        let tree = fruit_tree(variant);
        for key in ["apple", "lemon", "plum"] {
            let ex = exist(&tree, key);
            let root = calculate_existence_root(&ex).unwrap();
            assert_eq!(root, tree.root());
            let value = ex.value.clone();
            assert!(verify_membership(
                &ex.into(),
                tree.spec(),
                &root,
                key.as_bytes(),
                &value
            ));
        }
    }
}

#[test]
fn test_any_flipped_byte_fails() {
    for variant in VARIANTS {
        let tree = fruit_tree(variant);
        let original = exist(&tree, "cherry");
        let check = |ex: ExistenceProof| {
            verify_membership(&ex.into(), tree.spec(), tree.root(), b"cherry", b"dark red")
        };
        assert!(check(original.clone()));

        for i in 0..original.key.len() {
            let mut ex = original.clone();
            ex.key[i] ^= 0x01;
            assert!(!check(ex), "{variant} key byte {i}");
        }
        for i in 0..original.value.len() {
            let mut ex = original.clone();
            ex.value[i] ^= 0x01;
            assert!(!check(ex), "{variant} value byte {i}");
        }
        for step in 0..original.path.len() {
            for i in 0..original.path[step].prefix.len() {
                let mut ex = original.clone();
                ex.path[step].prefix[i] ^= 0x01;
                assert!(!check(ex), "{variant} step {step} prefix byte {i}");
            }
            for i in 0..original.path[step].suffix.len() {
                let mut ex = original.clone();
                ex.path[step].suffix[i] ^= 0x01;
                assert!(!check(ex), "{variant} step {step} suffix byte {i}");
            }
        }
    }
}

#[test]
fn test_dropped_step_fails() {
    let tree = fruit_tree(TreeVariant::Tendermint);
    let mut ex = exist(&tree, "kiwi");
    ex.path.pop();
    assert!(!verify_membership(
        &ex.into(),
        tree.spec(),
        tree.root(),
        b"kiwi",
        b"green"
    ));
}

#[test]
fn test_proof_fails_under_other_specs() {
    for variant in VARIANTS {
        let tree = fruit_tree(variant);
        let proof: CommitmentProof = exist(&tree, "mango").into();
        for other in VARIANTS.into_iter().filter(|v| *v != variant) {
            assert!(
                !verify_membership(&proof, other.spec(), tree.root(), b"mango", b"orange"),
                "{variant} proof accepted by {other}"
            );
        }
    }
}

#[test]
fn test_non_existence_between_neighbours() {
    for variant in [TreeVariant::Iavl, TreeVariant::Tendermint] {
        let tree = fruit_tree(variant);
        let non = tree.non_existence_proof(b"coconut").unwrap();
        assert_eq!(non.left.as_ref().unwrap().key, b"cherry");
        assert_eq!(non.right.as_ref().unwrap().key, b"grape");
        let proof = CommitmentProof::Nonexist(non.clone());
        assert!(verify_non_membership(&proof, tree.spec(), tree.root(), b"coconut"));

        // The same neighbours cannot prove either of themselves absent.
        for present in ["cherry", "grape"] {
            let mut forged = non.clone();
            forged.key = present.as_bytes().to_vec();
            assert_eq!(
                check_non_membership(&forged.into(), tree.spec(), tree.root(), present.as_bytes()),
                Err(Error::Verify(VerifyError::OrderingViolation(
                    if present == "cherry" {
                        "left neighbour is not before the key"
                    } else {
                        "right neighbour is not after the key"
                    }
                    .to_string()
                )))
            );
        }
    }
}

#[test]
fn test_non_existence_at_the_edges() {
    for variant in VARIANTS {
        let tree = fruit_tree(variant);
        for key in ["aardvark", "zucchini", "fig"] {
            let proof = tree.proof(key.as_bytes());
            assert!(matches!(proof, CommitmentProof::Nonexist(_)));
            assert!(
                verify_non_membership(&proof, tree.spec(), tree.root(), key.as_bytes()),
                "{variant} {key}"
            );
        }
    }
}

#[test]
fn test_non_adjacent_neighbours_rejected() {
    let tree = fruit_tree(TreeVariant::Iavl);
    let mut non = tree.non_existence_proof(b"coconut").unwrap();
    // Skip over grape: kiwi is after the key but not adjacent to cherry.
    non.right = Some(exist(&tree, "kiwi"));
    assert!(!verify_non_membership(
        &non.into(),
        tree.spec(),
        tree.root(),
        b"coconut"
    ));
}

#[test]
fn test_missing_edge_neighbour_rejected() {
    let tree = fruit_tree(TreeVariant::Tendermint);
    let mut non = tree.non_existence_proof(b"coconut").unwrap();
    // Cherry alone is not the right-most leaf, so it proves nothing.
    non.right = None;
    assert!(!verify_non_membership(
        &non.clone().into(),
        tree.spec(),
        tree.root(),
        b"coconut"
    ));
    non.left = None;
    assert!(!verify_non_membership(
        &non.into(),
        tree.spec(),
        tree.root(),
        b"coconut"
    ));
}

#[test]
fn test_iavl_abc_scenario() {
    let tree = TreeBuilder::new(TreeVariant::Iavl, [("a", "1"), ("b", "2"), ("c", "3")]).unwrap();
    let spec = iavl_spec();

    let b = CommitmentProof::Exist(exist(&tree, "b"));
    assert!(verify_membership(&b, spec, tree.root(), b"b", b"2"));

    let non = tree.non_existence_proof(b"ab").unwrap();
    assert_eq!(non.left.as_ref().unwrap().key, b"a");
    assert_eq!(non.right.as_ref().unwrap().key, b"b");
    let non: CommitmentProof = non.into();
    assert!(verify_non_membership(&non, spec, tree.root(), b"ab"));
    assert!(!verify_non_membership(&non, spec, tree.root(), b"a"));
}

#[test]
fn test_smt_orders_by_hashed_key() {
    let tree = fruit_tree(TreeVariant::Smt);
    let spec = smt_spec();
    let non = tree.non_existence_proof(b"coconut").unwrap();
    let target = key_for_comparison(spec, b"coconut");
    if let Some(left) = &non.left {
        assert!(key_for_comparison(spec, &left.key) < target);
    }
    if let Some(right) = &non.right {
        assert!(key_for_comparison(spec, &right.key) > target);
    }
    let proof: CommitmentProof = non.into();
    assert!(verify_non_membership(&proof, spec, tree.root(), b"coconut"));
    assert!(!verify_non_membership(&proof, tendermint_spec(), tree.root(), b"coconut"));
}

#[test]
fn test_batch_and_compressed_verify() {
    for variant in VARIANTS {
        let tree = fruit_tree(variant);
        let present = ["apple", "kiwi", "plum"];
        let absent = ["avocado", "lime", "quince"];
        let proofs = present
            .iter()
            .chain(absent.iter())
            .map(|k| tree.proof(k.as_bytes()));
        let batch = build_batch_proof(proofs).unwrap();
        let compressed = compress(&batch);
        assert!(matches!(compressed, CommitmentProof::Compressed(_)));
        assert_eq!(decompress(&compressed).unwrap(), batch);

        let items: Vec<(&[u8], &[u8])> = present
            .iter()
            .map(|k| (k.as_bytes(), tree.get(k.as_bytes()).unwrap()))
            .collect();
        let keys: Vec<&[u8]> = absent.iter().map(|k| k.as_bytes()).collect();
        for proof in [&batch, &compressed] {
            assert!(verify_batch_membership(proof, tree.spec(), tree.root(), &items));
            assert!(verify_batch_non_membership(proof, tree.spec(), tree.root(), &keys));
            assert!(verify_membership(proof, tree.spec(), tree.root(), b"kiwi", b"green"));
            assert!(verify_non_membership(proof, tree.spec(), tree.root(), b"lime"));
            assert!(check_batch_membership(proof, tree.spec(), tree.root(), &items, true).is_ok());
            assert!(check_batch_non_membership(proof, tree.spec(), tree.root(), &keys, true).is_ok());
        }

        // One bad item sinks the whole batch.
        let mut bad = items.clone();
        bad.push((&b"grape"[..], &b"not purple"[..]));
        assert!(!verify_batch_membership(&batch, tree.spec(), tree.root(), &bad));
        let mut unknown = keys.clone();
        unknown.push(&b"papaya"[..]);
        assert!(!verify_batch_non_membership(&compressed, tree.spec(), tree.root(), &unknown));
    }
}

#[test]
fn test_compression_shares_upper_steps() {
    let tree = fruit_tree(TreeVariant::Tendermint);
    let batch = build_batch_proof(tree.keys().map(|k| tree.proof(k))).unwrap();
    let CommitmentProof::Compressed(compressed) = compress(&batch) else {
        panic!("expected a compressed proof");
    };
    let CommitmentProof::Batch(batch) = batch else {
        panic!("expected a batch proof");
    };
    let total_steps: usize = batch
        .entries
        .iter()
        .map(|e| match e {
            ics23_lib::BatchEntry::Exist(ex) => ex.path.len(),
            ics23_lib::BatchEntry::Nonexist(_) => 0,
        })
        .sum();
    assert!(compressed.lookup_inners.len() < total_steps);
}
