#![allow(unused_imports)]

extern crate weaver_msa;

use weaver_msa::tree::guide_tree::{
    find_root, mst, reorder_linkage, sort_hits_by_score, AlnSimple,
};
use weaver_msa::tree::newick::{linkage_to_newick, parse, post_order_pairs, NewickNode};

fn hit(query_id: usize, target_id: usize, score: i32) -> AlnSimple {
    AlnSimple {
        query_id,
        target_id,
        score,
    }
}

#[test]
fn test_find_root_compresses_paths() {
    let mut parent = vec![0, 0, 1, 2];
    assert_eq!(find_root(&mut parent, 3), 0);
    // path halving pulled 3 at least one level up
    assert!(parent[3] < 2);
}

#[test]
fn test_sort_hits_is_deterministic_on_ties() {
    let mut hits = vec![hit(1, 2, 5), hit(0, 2, 10), hit(0, 1, 10)];
    sort_hits_by_score(&mut hits);
    assert_eq!(hits, vec![hit(0, 1, 10), hit(0, 2, 10), hit(1, 2, 5)]);
}

#[test]
fn test_mst_accepts_n_minus_one_edges() {
    let mut hits = vec![hit(0, 1, 10), hit(0, 2, 10), hit(1, 2, 5)];
    sort_hits_by_score(&mut hits);
    let edges = mst(&hits, 3);
    // the tie-break keeps (0,1) then (0,2); (1,2) would close a cycle
    assert_eq!(edges, vec![hit(0, 1, 10), hit(0, 2, 10)]);
}

#[test]
fn test_reorder_serialises_edges_sharing_a_cluster() {
    let edges = vec![hit(0, 1, 10), hit(0, 2, 10)];
    let (ordered, rounds) = reorder_linkage(&edges, 3);
    assert_eq!(ordered.len(), 2);
    // both edges touch structure 0, so they land in separate rounds
    assert_eq!(rounds, vec![1, 1]);
}

#[test]
fn test_reorder_exposes_independent_merges() {
    let edges = vec![hit(0, 1, 9), hit(2, 3, 8), hit(1, 2, 7)];
    let (ordered, rounds) = reorder_linkage(&edges, 4);
    assert_eq!(rounds, vec![2, 1]);
    // round one: disjoint pairs; the bridging edge waits
    assert_eq!(ordered[0], hit(0, 1, 9));
    assert_eq!(ordered[1], hit(2, 3, 8));
    assert_eq!(ordered[2], hit(1, 2, 7));
    // no representative repeats inside round one
    let round_one = [ordered[0], ordered[1]];
    let mut touched = std::collections::HashSet::new();
    for edge in round_one {
        assert!(touched.insert(edge.query_id));
        assert!(touched.insert(edge.target_id));
    }
}

#[test]
fn test_reorder_covers_every_structure() {
    // star topology: everything merges into 0 across n-1 rounds
    let edges: Vec<AlnSimple> = (1..6).map(|i| hit(0, i, 10 - i as i32)).collect();
    let (ordered, rounds) = reorder_linkage(&edges, 6);
    assert_eq!(ordered.len(), 5);
    assert_eq!(rounds.iter().sum::<usize>(), 5);
    let mut seen = std::collections::HashSet::new();
    for edge in &ordered {
        seen.insert(edge.query_id);
        seen.insert(edge.target_id);
    }
    assert_eq!(seen.len(), 6);
}

#[test]
fn test_newick_parse_basic_topology() {
    let root = parse("((A,B),C);").unwrap();
    assert_eq!(root.children.len(), 2);
    assert!(root.children[1].is_leaf());
    assert_eq!(root.children[1].name.as_deref(), Some("C"));
    assert_eq!(root.children[0].children.len(), 2);
}

#[test]
fn test_newick_parse_ignores_branch_lengths() {
    let root = parse("((A:0.1,B:0.2):0.3,C:1e-3);").unwrap();
    let pairs = post_order_pairs(&root).unwrap();
    assert_eq!(
        pairs,
        vec![
            ("A".to_string(), "B".to_string()),
            ("A".to_string(), "C".to_string())
        ]
    );
}

#[test]
fn test_newick_post_order_merge_order() {
    // scenario: ((A,B),C) merges A+B first, then the AB cluster with C
    let root = parse("((A,B),C);").unwrap();
    let pairs = post_order_pairs(&root).unwrap();
    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[0], ("A".to_string(), "B".to_string()));
    assert_eq!(pairs[1], ("A".to_string(), "C".to_string()));
}

#[test]
fn test_newick_parse_rejects_garbage() {
    assert!(parse("((A,B),C;").is_err());
    assert!(parse("(),;").is_err());
}

#[test]
fn test_linkage_serialises_back_to_newick() {
    let names: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
    let edges = vec![hit(0, 1, 10), hit(0, 2, 8)];
    let newick = linkage_to_newick(&edges, &names, 3);
    assert_eq!(newick, "((A,B),C);");
    // and the round trip preserves merge order
    let reparsed = parse(&newick).unwrap();
    let pairs = post_order_pairs(&reparsed).unwrap();
    assert_eq!(pairs[0], ("A".to_string(), "B".to_string()));
}
