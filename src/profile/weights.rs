use crate::alignment::cigar::{cigar_length, Instruction};
use crate::alignment::substitution::SubstitutionMatrix;
use crate::PROFILE_AA_SIZE;

/**
 * Compute the column mask of a cluster alignment from position-based
 * sequence weights ("Position-based Sequence Weights", Henikoff 1994).
 *
 * Each sequence receives weight `w_i = sum_col 1/(n_ij * d_j * (L_i + 30))`
 * where `n_ij` counts cluster members sharing sequence i's residue type at
 * column j and `d_j` counts distinct residue types at column j. Per column,
 * match and gap weight mass is accumulated; a column is masked (`'1'`) when
 * its gap fraction reaches `match_ratio`. End gaps (all contiguous leading
 * and trailing gap columns of a member) carry no gap mass.
 */
pub fn compute_profile_mask(
    members: &[usize],
    cigars: &[Vec<Instruction>],
    lengths: &[usize],
    submat: &SubstitutionMatrix,
    match_ratio: f32,
) -> String {
    assert!(!members.is_empty());
    let length_with_gaps = cigar_length(&cigars[members[0]], true);

    // residue type counts per column; row PROFILE_AA_SIZE holds the number
    // of distinct types
    let mut counts = vec![0u32; (PROFILE_AA_SIZE + 1) * length_with_gaps];
    for &index in members {
        let mut col = 0usize;
        for ins in &cigars[index] {
            if ins.is_seq() {
                let code = submat.aa2num[ins.character() as usize] as usize;
                if code < PROFILE_AA_SIZE {
                    let ij = code * length_with_gaps + col;
                    counts[ij] += 1;
                    if counts[ij] == 1 {
                        counts[PROFILE_AA_SIZE * length_with_gaps + col] += 1;
                    }
                }
                col += 1;
            } else {
                col += ins.count() as usize;
            }
        }
        debug_assert_eq!(col, length_with_gaps, "cluster member out of register");
    }

    let mut matches = vec![0.0f32; length_with_gaps];
    let mut gaps = vec![0.0f32; length_with_gaps];

    for &index in members {
        // sequence weight
        let mut weight = 1e-6f32;
        let mut col = 0usize;
        for ins in &cigars[index] {
            if ins.is_seq() {
                let code = submat.aa2num[ins.character() as usize] as usize;
                if code < PROFILE_AA_SIZE {
                    let distinct = counts[PROFILE_AA_SIZE * length_with_gaps + col];
                    let same = counts[code * length_with_gaps + col];
                    if same > 0 && distinct > 0 {
                        weight += 1.0
                            / (same as f32 * distinct as f32 * (lengths[index] as f32 + 30.0));
                    }
                }
                col += 1;
            } else {
                col += ins.count() as usize;
            }
        }

        // weight mass per column; end gaps are excluded from the gap mass
        let expanded = cigar_length(&cigars[index], true);
        let leading = leading_gap_columns(&cigars[index]);
        let trailing_start = expanded - trailing_gap_columns(&cigars[index]);
        let mut col = 0usize;
        for ins in &cigars[index] {
            if ins.is_seq() {
                let code = submat.aa2num[ins.character() as usize] as usize;
                if code < PROFILE_AA_SIZE {
                    matches[col] += weight;
                }
                col += 1;
            } else {
                for k in 0..ins.count() as usize {
                    let at = col + k;
                    if at >= leading && at < trailing_start {
                        gaps[at] += weight;
                    }
                }
                col += ins.count() as usize;
            }
        }
    }

    let mut mask = String::with_capacity(length_with_gaps);
    for j in 0..length_with_gaps {
        let total = gaps[j] + matches[j];
        let masked = total > 0.0 && gaps[j] / total >= match_ratio;
        mask.push(if masked { '1' } else { '0' });
    }
    mask
}

/// Number of gap columns before the first residue of a CIGAR.
pub fn leading_gap_columns(cigar: &[Instruction]) -> usize {
    let mut columns = 0usize;
    for ins in cigar {
        if ins.is_seq() {
            break;
        }
        columns += ins.count() as usize;
    }
    columns
}

/// Number of gap columns after the last residue of a CIGAR.
pub fn trailing_gap_columns(cigar: &[Instruction]) -> usize {
    let mut columns = 0usize;
    for ins in cigar.iter().rev() {
        if ins.is_seq() {
            break;
        }
        columns += ins.count() as usize;
    }
    columns
}
