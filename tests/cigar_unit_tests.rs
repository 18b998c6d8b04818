#![allow(unused_imports)]

extern crate weaver_msa;

use weaver_msa::alignment::cigar::{
    add_gaps, append_states, cigar_length, contract, copy_residues, expand, mask_to_mapping,
    CigarCursor, Instruction, State,
};

#[test]
fn test_expand_contract_round_trip() {
    for s in [
        "ACDEFG",
        "--AB-C",
        "A----B",
        "AB--",
        "-A-",
        "QWERTYQWERTY",
    ] {
        let cigar = contract(s.as_bytes());
        assert_eq!(expand(&cigar), s.as_bytes(), "round trip failed for {}", s);
    }
}

#[test]
fn test_long_gap_runs_split_at_capacity() {
    let mut gapped = String::from("A");
    gapped.push_str(&"-".repeat(300));
    gapped.push('B');
    let cigar = contract(gapped.as_bytes());
    assert_eq!(expand(&cigar), gapped.as_bytes());
    // 300 gaps need three instructions: 127 + 127 + 46
    let gap_counts: Vec<u8> = cigar
        .iter()
        .filter(|ins| ins.is_gap())
        .map(|ins| ins.count())
        .collect();
    assert_eq!(gap_counts, vec![127, 127, 46]);
}

#[test]
fn test_seq_instruction_carries_residue() {
    let ins = Instruction::new_seq(b'W');
    assert!(ins.is_seq());
    assert_eq!(ins.character(), b'W');
    let gap = Instruction::new_gap(9);
    assert!(gap.is_gap());
    assert_eq!(gap.count(), 9);
    assert_eq!(gap.character(), b'-');
}

#[test]
fn test_append_states_coalesces_gap_runs() {
    let mut cigar = Vec::new();
    append_states(&mut cigar, State::Gap, 100);
    assert_eq!(cigar.len(), 1);
    append_states(&mut cigar, State::Gap, 50);
    // tail filled to 127, remainder spills into a second instruction
    assert_eq!(cigar.len(), 2);
    assert_eq!(cigar[0].count(), 127);
    assert_eq!(cigar[1].count(), 23);
    assert_eq!(cigar_length(&cigar, true), 150);
    assert_eq!(cigar_length(&cigar, false), 0);
}

#[test]
fn test_append_states_seq_runs_count_positions() {
    let mut cigar = Vec::new();
    append_states(&mut cigar, State::Seq, 3);
    append_states(&mut cigar, State::Seq, 2);
    assert_eq!(cigar.len(), 1);
    assert!(cigar[0].is_seq());
    assert_eq!(cigar[0].count(), 5);
}

#[test]
fn test_add_gaps_keeps_channels_in_register() {
    let mut aa = contract(b"AC");
    let mut ss = contract(b"DP");
    add_gaps(140, &mut aa, &mut ss);
    assert_eq!(aa.len(), ss.len());
    for (a, s) in aa.iter().zip(ss.iter()) {
        if a.is_gap() {
            assert!(s.is_gap());
            assert_eq!(a.count(), s.count());
        }
    }
    assert_eq!(cigar_length(&aa, true), cigar_length(&ss, true));
}

#[test]
fn test_copy_residues_splits_gap_runs() {
    let src_aa = contract(b"A---B");
    let src_ss = contract(b"C---D");
    let mut cursor = CigarCursor::default();

    let mut dst_aa = Vec::new();
    let mut dst_ss = Vec::new();
    copy_residues(&mut dst_aa, &mut dst_ss, &src_aa, &src_ss, &mut cursor, 3);
    assert_eq!(expand(&dst_aa), b"A--");
    assert_eq!(expand(&dst_ss), b"C--");

    let mut tail_aa = Vec::new();
    let mut tail_ss = Vec::new();
    copy_residues(&mut tail_aa, &mut tail_ss, &src_aa, &src_ss, &mut cursor, 2);
    assert_eq!(expand(&tail_aa), b"-B");
    assert_eq!(expand(&tail_ss), b"-D");
}

#[test]
#[should_panic]
fn test_copy_residues_past_end_is_a_bug() {
    let src_aa = contract(b"AB");
    let src_ss = contract(b"CD");
    let mut cursor = CigarCursor::default();
    let mut dst_aa = Vec::new();
    let mut dst_ss = Vec::new();
    copy_residues(&mut dst_aa, &mut dst_ss, &src_aa, &src_ss, &mut cursor, 3);
}

#[test]
fn test_mask_to_mapping_keeps_unmasked_columns() {
    assert_eq!(mask_to_mapping("0000"), vec![0, 1, 2, 3]);
    assert_eq!(mask_to_mapping("0110"), vec![0, 3]);
    assert_eq!(mask_to_mapping("1111"), Vec::<usize>::new());
    assert_eq!(mask_to_mapping(""), Vec::<usize>::new());
}

#[test]
fn test_cigar_length_with_and_without_gaps() {
    let cigar = contract(b"-AB--C-");
    assert_eq!(cigar_length(&cigar, true), 7);
    assert_eq!(cigar_length(&cigar, false), 3);
}
