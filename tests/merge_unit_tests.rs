#![allow(unused_imports)]

extern crate weaver_msa;

use weaver_msa::alignment::cigar::{
    contract, expand, get_merge_instructions, mask_to_mapping, update_query_cigar,
    update_target_cigar, Instruction,
};
use weaver_msa::alignment::scorer::AlignmentResult;

fn identity_map(n: usize) -> Vec<usize> {
    (0..n).collect()
}

fn result(backtrace: &str, q_start: usize, q_end: usize, db_start: usize, db_end: usize) -> AlignmentResult {
    AlignmentResult {
        score: 1,
        q_start,
        q_end,
        db_start,
        db_end,
        backtrace: backtrace.to_string(),
    }
}

#[test]
fn test_merge_instructions_identical_sequences() {
    let res = result("MMMMM", 0, 4, 0, 4);
    let map = identity_map(5);
    let (q_bt, t_bt) = get_merge_instructions(&res, &map, &map);
    // one coalesced run of five matched positions on either side
    assert_eq!(q_bt.len(), 1);
    assert!(q_bt[0].is_seq());
    assert_eq!(q_bt[0].count(), 5);
    assert_eq!(t_bt, q_bt);
}

#[test]
fn test_merge_instructions_insertion_in_query() {
    // query ABCDE vs target ABDE; C is unmatched in the query
    let res = result("MMIMM", 0, 4, 0, 3);
    let map1 = identity_map(5);
    let map2 = identity_map(4);
    let (q_bt, t_bt) = get_merge_instructions(&res, &map1, &map2);

    let mut q_aa = contract(b"ABCDE");
    let mut q_ss = contract(b"DDDDD");
    update_query_cigar(&mut q_aa, &mut q_ss, &q_bt, 0, 0, 0, 0);
    let mut t_aa = contract(b"ABDE");
    let mut t_ss = contract(b"PPPP");
    update_target_cigar(&mut t_aa, &mut t_ss, &t_bt, 0, 0, 0, 0);

    assert_eq!(expand(&q_aa), b"ABCDE");
    assert_eq!(expand(&t_aa), b"AB-DE");
    assert_eq!(expand(&t_ss), b"PP-PP");
}

#[test]
fn test_merge_instructions_deletion_from_query() {
    // query ABDE vs target ABCDE; the target's C opens a gap in the query
    let res = result("MMDMM", 0, 3, 0, 4);
    let map1 = identity_map(4);
    let map2 = identity_map(5);
    let (q_bt, t_bt) = get_merge_instructions(&res, &map1, &map2);

    let mut q_aa = contract(b"ABDE");
    let mut q_ss = contract(b"DDDD");
    update_query_cigar(&mut q_aa, &mut q_ss, &q_bt, 0, 0, 0, 0);
    let mut t_aa = contract(b"ABCDE");
    let mut t_ss = contract(b"PPPPP");
    update_target_cigar(&mut t_aa, &mut t_ss, &t_bt, 0, 0, 0, 0);

    assert_eq!(expand(&q_aa), b"AB-DE");
    assert_eq!(expand(&t_aa), b"ABCDE");
}

#[test]
fn test_merge_instructions_skip_masked_columns() {
    // the query profile skipped a masked column between positions 1 and 2:
    // mask 00100 -> map [0, 1, 3, 4]
    let map1 = mask_to_mapping("00100");
    let map2 = identity_map(4);
    let res = result("MMMM", 0, 3, 0, 3);
    let (q_bt, t_bt) = get_merge_instructions(&res, &map1, &map2);

    // query side spans five gapped columns, so its instructions must cover
    // the masked column as well
    let q_cols: usize = q_bt.iter().map(|i| i.count() as usize).sum();
    assert_eq!(q_cols, 5);
    // target picks up one gap column to stay in register
    let t_gap_cols: usize = t_bt
        .iter()
        .filter(|i| i.is_gap())
        .map(|i| i.count() as usize)
        .sum();
    assert_eq!(t_gap_cols, 1);

    let mut q_aa = contract(b"AB-CD");
    let mut q_ss = contract(b"DD-DD");
    update_query_cigar(&mut q_aa, &mut q_ss, &q_bt, 0, 0, 0, 0);
    let mut t_aa = contract(b"ABCD");
    let mut t_ss = contract(b"PPPP");
    update_target_cigar(&mut t_aa, &mut t_ss, &t_bt, 0, 0, 0, 0);
    assert_eq!(expand(&q_aa), b"AB-CD");
    assert_eq!(expand(&t_aa), b"AB-CD");
}

#[test]
fn test_update_cigar_padding_assignment() {
    // local alignment covering only the middle; pre/post padding must place
    // the query's unaligned residues over target gaps and vice versa
    let map1 = identity_map(4);
    let map2 = identity_map(4);
    let res = result("MM", 1, 2, 1, 2);
    let (q_bt, t_bt) = get_merge_instructions(&res, &map1, &map2);

    let q_pre_seq = map1[res.q_start];
    let q_pre_gap = map2[res.db_start];
    let q_end_seq = map1[map1.len() - 1] - map1[res.q_end];
    let q_end_gap = map2[map2.len() - 1] - map2[res.db_end];

    let mut q_aa = contract(b"ABCD");
    let mut q_ss = contract(b"DDDD");
    update_query_cigar(&mut q_aa, &mut q_ss, &q_bt, q_pre_gap, q_pre_seq, q_end_gap, q_end_seq);
    let mut t_aa = contract(b"WXYZ");
    let mut t_ss = contract(b"PPPP");
    update_target_cigar(&mut t_aa, &mut t_ss, &t_bt, q_pre_seq, q_pre_gap, q_end_seq, q_end_gap);

    assert_eq!(expand(&q_aa), b"-ABCD-");
    assert_eq!(expand(&t_aa), b"W-XY-Z");
    assert_eq!(expand(&q_aa).len(), expand(&t_aa).len());
}

#[test]
fn test_empty_backtrace_yields_no_instructions() {
    let res = AlignmentResult::empty();
    let (q_bt, t_bt) = get_merge_instructions(&res, &identity_map(3), &identity_map(3));
    assert!(q_bt.is_empty());
    assert!(t_bt.is_empty());
}

#[test]
fn test_concatenation_weave_of_unalignable_pair() {
    // the merger resolves an empty backtrace by concatenating the blocks
    let mut q_aa = contract(b"AB");
    let mut q_ss = contract(b"DD");
    update_query_cigar(&mut q_aa, &mut q_ss, &[], 0, 0, 3, 2);
    let mut t_aa = contract(b"XYZ");
    let mut t_ss = contract(b"PPP");
    update_target_cigar(&mut t_aa, &mut t_ss, &[], 2, 0, 0, 3);
    assert_eq!(expand(&q_aa), b"AB---");
    assert_eq!(expand(&t_aa), b"--XYZ");
}
