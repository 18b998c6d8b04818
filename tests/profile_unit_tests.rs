#![allow(unused_imports)]

#[macro_use]
extern crate approx;
extern crate weaver_msa;

use weaver_msa::alignment::cigar::contract;
use weaver_msa::alignment::substitution::{SUBMAT_3DI, SUBMAT_AA};
use weaver_msa::profile::filter::{parse_qid_string, MsaFilter, MsaFilterParams};
use weaver_msa::profile::pssm::{apply_global_bias_correction, PssmCalculator};
use weaver_msa::profile::weights::{
    compute_profile_mask, leading_gap_columns, trailing_gap_columns,
};

#[test]
fn test_mask_of_gapless_cluster_is_all_zero() {
    let cigars = vec![contract(b"ACDEF"), contract(b"ACDEF")];
    let lengths = vec![5, 5];
    let mask = compute_profile_mask(&[0, 1], &cigars, &lengths, &SUBMAT_AA, 0.51);
    assert_eq!(mask, "00000");
}

#[test]
fn test_mask_flags_gap_dominated_columns() {
    // middle column is a gap in two of three members
    let cigars = vec![contract(b"A-C"), contract(b"A-C"), contract(b"AAC")];
    let lengths = vec![2, 2, 3];
    let mask = compute_profile_mask(&[0, 1, 2], &cigars, &lengths, &SUBMAT_AA, 0.4);
    assert_eq!(mask.len(), 3);
    assert_eq!(&mask[0..1], "0");
    assert_eq!(&mask[1..2], "1");
    assert_eq!(&mask[2..3], "0");
}

#[test]
fn test_mask_excludes_end_gaps() {
    // member 0's trailing gap run is an end gap and carries no gap mass
    let cigars = vec![contract(b"AC--"), contract(b"ACDE")];
    let lengths = vec![2, 4];
    let mask = compute_profile_mask(&[0, 1], &cigars, &lengths, &SUBMAT_AA, 0.4);
    assert_eq!(mask, "0000");
}

#[test]
fn test_mask_excludes_split_end_gap_runs() {
    // an end gap longer than one instruction (> 127 columns) must still be
    // excluded over its whole length
    let mut trailing = String::from("AC");
    trailing.push_str(&"-".repeat(130));
    let mut full = String::from("AC");
    full.push_str(&"D".repeat(130));
    let cigars = vec![
        contract(trailing.as_bytes()),
        contract(full.as_bytes()),
    ];
    let lengths = vec![2, 132];
    let mask = compute_profile_mask(&[0, 1], &cigars, &lengths, &SUBMAT_AA, 0.4);
    assert_eq!(mask, "0".repeat(132));
}

#[test]
fn test_gap_column_helpers() {
    let cigar = contract(b"--AB---");
    assert_eq!(leading_gap_columns(&cigar), 2);
    assert_eq!(trailing_gap_columns(&cigar), 3);
    let gapless = contract(b"AB");
    assert_eq!(leading_gap_columns(&gapless), 0);
    assert_eq!(trailing_gap_columns(&gapless), 0);
}

#[test]
fn test_single_sequence_pssm_consensus_and_neff() {
    let row: &[u8] = b"ACDEFGHIKL";
    let calculator = PssmCalculator::new(&SUBMAT_AA, 1.1, 4.1, 1, false);
    let pssm = calculator.compute(&[row]);
    assert_eq!(pssm.len(), row.len());
    assert_eq!(pssm.consensus, SUBMAT_AA.encode(row));
    for j in 0..pssm.len() {
        // one sequence, zero entropy
        assert_relative_eq!(pssm.neff[j], 1.0, epsilon = 1e-5);
        // the observed residue scores above background
        let code = pssm.consensus[j] as usize;
        assert!(pssm.scores[[code, j]] > 0);
    }
}

#[test]
fn test_pssm_neff_grows_with_diversity() {
    let rows: Vec<&[u8]> = vec![b"AAAA", b"CCCC", b"DDDD"];
    let calculator = PssmCalculator::new(&SUBMAT_AA, 1.1, 4.1, 1, false);
    let pssm = calculator.compute(&rows);
    for j in 0..pssm.len() {
        assert!(pssm.neff[j] > 1.5, "column {} neff {}", j, pssm.neff[j]);
    }
}

#[test]
fn test_pssm_columns_with_gaps() {
    let rows: Vec<&[u8]> = vec![b"AC-E", b"ACDE"];
    let calculator = PssmCalculator::new(&SUBMAT_AA, 1.1, 4.1, 1, false);
    let pssm = calculator.compute(&rows);
    assert_eq!(pssm.len(), 4);
    // the half-occupied column still gets a consensus from the one residue
    assert_eq!(pssm.consensus[2], SUBMAT_AA.encode(b"D")[0]);
}

#[test]
fn test_global_bias_correction_preserves_layout() {
    let rows: Vec<&[u8]> = vec![b"ACDE", b"ACDE"];
    let calculator = PssmCalculator::new(&SUBMAT_AA, 1.1, 4.1, 1, false);
    let mut pssm = calculator.compute(&rows);
    let consensus = pssm.consensus.clone();
    apply_global_bias_correction(&mut pssm, &SUBMAT_AA);
    assert_eq!(pssm.consensus, consensus);
    assert_eq!(pssm.len(), 4);
}

#[test]
fn test_parse_qid_string() {
    assert_eq!(parse_qid_string("0.0"), vec![0.0]);
    assert_eq!(parse_qid_string("0.5,0.2"), vec![0.2, 0.5]);
    assert_eq!(parse_qid_string(""), vec![0.0]);
}

#[test]
fn test_filter_disabled_keeps_everything() {
    let rows: Vec<&[u8]> = vec![b"ACDE", b"ACDE", b"ACDE"];
    let filter = MsaFilter::new(&SUBMAT_AA, MsaFilterParams::disabled());
    assert_eq!(filter.filter(&rows), vec![true, true, true]);
}

#[test]
fn test_filter_drops_redundant_rows() {
    let rows: Vec<&[u8]> = vec![b"ACDEFGHIKL", b"ACDEFGHIKL", b"LKIHGFEDCA"];
    let params = MsaFilterParams {
        enabled: true,
        cov: 0.0,
        qid: vec![0.0],
        qsc: -20.0,
        max_seq_id: 0.9,
        ndiff: 1,
        min_enable: 0,
    };
    let filter = MsaFilter::new(&SUBMAT_AA, params);
    let kept = filter.filter(&rows);
    assert!(kept[0]);
    // row 1 is identical to the query and gets thinned out
    assert!(!kept[1]);
    assert!(kept[2]);
}

#[test]
fn test_filter_min_enable_gates_small_alignments() {
    let rows: Vec<&[u8]> = vec![b"ACDE", b"ACDE"];
    let params = MsaFilterParams {
        enabled: true,
        cov: 0.0,
        qid: vec![0.0],
        qsc: -20.0,
        max_seq_id: 0.9,
        ndiff: 1,
        min_enable: 10,
    };
    let filter = MsaFilter::new(&SUBMAT_AA, params);
    assert_eq!(filter.filter(&rows), vec![true, true]);
}

#[test]
fn test_filter_ndiff_restores_dropped_rows() {
    let rows: Vec<&[u8]> = vec![b"ACDEFGHIKL", b"ACDEFGHIKL", b"ACDEFGHIKL"];
    let params = MsaFilterParams {
        enabled: true,
        cov: 0.0,
        qid: vec![0.0],
        qsc: -20.0,
        max_seq_id: 0.9,
        ndiff: 3,
        min_enable: 0,
    };
    let filter = MsaFilter::new(&SUBMAT_AA, params);
    assert_eq!(filter.filter(&rows), vec![true, true, true]);
}
