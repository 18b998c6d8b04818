#![allow(unused_imports)]

extern crate weaver_msa;

use weaver_msa::alignment::scorer::{Operand, StructureAligner};
use weaver_msa::alignment::substitution::{SubstitutionMatrix, SUBMAT_3DI, SUBMAT_AA};
use weaver_msa::profile::pssm::PssmCalculator;

fn plain_aligner<'a>() -> StructureAligner<'a> {
    StructureAligner::new(&SUBMAT_AA, &SUBMAT_3DI, 10, 1, false, 1.0)
}

#[test]
fn test_substitution_matrices_are_symmetric() {
    for mat in [&*SUBMAT_AA, &*SUBMAT_3DI] {
        for i in 0..21 {
            for j in 0..21 {
                assert_eq!(
                    mat.matrix[i][j], mat.matrix[j][i],
                    "{} not symmetric at {},{}",
                    mat.name, i, j
                );
            }
        }
    }
}

#[test]
fn test_encode_decode_round_trip() {
    let seq = b"ACDEFGHIKLMNPQRSTVWY";
    let codes = SUBMAT_AA.encode(seq);
    assert_eq!(SUBMAT_AA.decode(&codes), seq.to_vec());
    // unknown letters collapse onto X
    assert_eq!(SUBMAT_AA.encode(b"B")[0], 20);
}

#[test]
fn test_ungapped_score_of_identical_sequences() {
    let aa = SUBMAT_AA.encode(b"ACDEFGHIKL");
    let ss = SUBMAT_3DI.encode(b"DDPPVVLLNN");
    let mut aligner = plain_aligner();
    aligner.init_query(&Operand::Sequence { aa: &aa, ss: &ss });
    let score = aligner.ungapped_score(&aa, &ss);

    let expected: i32 = aa
        .iter()
        .zip(ss.iter())
        .map(|(&a, &s)| {
            SUBMAT_AA.matrix[a as usize][a as usize] as i32
                + SUBMAT_3DI.matrix[s as usize][s as usize] as i32
        })
        .sum();
    assert_eq!(score, expected);
}

#[test]
fn test_ungapped_score_prefers_matching_diagonal() {
    let q_aa = SUBMAT_AA.encode(b"ACDEFGHIKL");
    let q_ss = SUBMAT_3DI.encode(b"DDPPVVLLNN");
    // same sequence shifted by two residues still scores on its diagonal
    let t_aa = SUBMAT_AA.encode(b"DEFGHIKL");
    let t_ss = SUBMAT_3DI.encode(b"PPVVLLNN");
    let mut aligner = plain_aligner();
    aligner.init_query(&Operand::Sequence { aa: &q_aa, ss: &q_ss });
    let shifted = aligner.ungapped_score(&t_aa, &t_ss);
    assert!(shifted > 0);

    let expected: i32 = t_aa
        .iter()
        .zip(t_ss.iter())
        .map(|(&a, &s)| {
            SUBMAT_AA.matrix[a as usize][a as usize] as i32
                + SUBMAT_3DI.matrix[s as usize][s as usize] as i32
        })
        .sum();
    assert_eq!(shifted, expected);
}

#[test]
fn test_gapped_alignment_of_identical_sequences() {
    let aa = SUBMAT_AA.encode(b"ACDEFGHIKLMNP");
    let ss = SUBMAT_3DI.encode(b"DDPPVVLLNNCCA");
    let mut aligner = plain_aligner();
    aligner.init_query(&Operand::Sequence { aa: &aa, ss: &ss });
    let res = aligner.align(&Operand::Sequence { aa: &aa, ss: &ss });
    assert!(!res.is_empty());
    assert_eq!(res.backtrace, "M".repeat(aa.len()));
    assert_eq!(res.q_start, 0);
    assert_eq!(res.q_end, aa.len() - 1);
    assert_eq!(res.db_start, 0);
    assert_eq!(res.db_end, aa.len() - 1);
}

#[test]
fn test_gapped_alignment_places_single_gap() {
    let q_aa = SUBMAT_AA.encode(b"ACDEFGHIKLMN");
    let q_ss = SUBMAT_3DI.encode(b"DDPPVVLLNNCC");
    // target lacks the query's G
    let t_aa = SUBMAT_AA.encode(b"ACDEFHIKLMN");
    let t_ss = SUBMAT_3DI.encode(b"DDPPVLLNNCC");
    let mut aligner = plain_aligner();
    aligner.init_query(&Operand::Sequence { aa: &q_aa, ss: &q_ss });
    let res = aligner.align(&Operand::Sequence { aa: &t_aa, ss: &t_ss });
    assert!(!res.is_empty());
    let inserts = res.backtrace.matches('I').count();
    let matches = res.backtrace.matches('M').count();
    assert_eq!(inserts, 1, "backtrace: {}", res.backtrace);
    assert_eq!(matches, t_aa.len());
    assert_eq!(res.backtrace.matches('D').count(), 0);
}

#[test]
fn test_profile_query_aligns_like_its_consensus() {
    let row_aa: &[u8] = b"ACDEFGHIKL";
    let row_ss: &[u8] = b"DDPPVVLLNN";
    let calc_aa = PssmCalculator::new(&SUBMAT_AA, 1.1, 4.1, 1, false);
    let calc_ss = PssmCalculator::new(&SUBMAT_3DI, 1.4, 1.5, 1, false);
    let pssm_aa = calc_aa.compute(&[row_aa]);
    let pssm_ss = calc_ss.compute(&[row_ss]);
    assert_eq!(pssm_aa.consensus, SUBMAT_AA.encode(row_aa));

    let t_aa = SUBMAT_AA.encode(row_aa);
    let t_ss = SUBMAT_3DI.encode(row_ss);
    let mut aligner = plain_aligner();
    aligner.init_query(&Operand::Profile {
        aa: &pssm_aa,
        ss: &pssm_ss,
    });
    let res = aligner.align(&Operand::Sequence { aa: &t_aa, ss: &t_ss });
    assert!(!res.is_empty());
    assert_eq!(res.backtrace, "M".repeat(row_aa.len()));
}

#[test]
fn test_empty_operands_fail_soft() {
    let mut aligner = plain_aligner();
    aligner.init_query(&Operand::Sequence { aa: &[], ss: &[] });
    let res = aligner.align(&Operand::Sequence { aa: &[], ss: &[] });
    assert!(res.is_empty());
    assert_eq!(res.score, 0);
}

#[test]
fn test_local_bias_correction_is_zero_mean_for_uniform_sequences() {
    // a one-letter sequence has constant window scores, so the correction is
    // the negated self score at every position
    let seq = SUBMAT_AA.encode(b"AAAAAAAA");
    let bias = SUBMAT_AA.calc_local_bias_correction(&seq, 1.0);
    let self_score = SUBMAT_AA.matrix[seq[0] as usize][seq[0] as usize] as f32;
    for value in bias {
        assert!((value + self_score).abs() < 1e-4);
    }
}
