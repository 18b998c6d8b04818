use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::alignment::cigar::{
    cigar_length, expand, get_merge_instructions, mask_to_mapping, update_query_cigar,
    update_target_cigar, Instruction,
};
use crate::alignment::scorer::{Operand, StructureAligner};
use crate::alignment::substitution::{SUBMAT_3DI, SUBMAT_AA};
use crate::cli::MsaParameters;
use crate::database::structure_db::StructureDb;
use crate::merge::merger::{compute_padding, msa_to_profile};
use crate::processing::msa_engine::MsaState;
use crate::scoring::lddt::calculate_lddt;
use crate::utils::errors::WeaverError;

// Refinement is deterministic for a fixed input: the partition stream comes
// from a fixed-seed generator.
const PARTITION_SEED: u64 = 0x5eed_001;

/**
 * Iterative partition-and-realign refinement.
 *
 * Each iteration bipartitions the aligned structures at random, rebuilds a
 * profile for either side over its non-empty columns, re-aligns the two
 * profiles and re-weaves the alignment. The candidate replaces the current
 * alignment only when its LDDT does not decrease. Runs on the calling thread
 * only; all heavy lifting reuses the progressive-phase primitives.
 */
pub fn refine_many(
    db: &StructureDb,
    params: &MsaParameters,
    state: &mut MsaState,
    final_msa_id: usize,
) -> Result<(), WeaverError> {
    let members = state.groups[final_msa_id].clone();
    if members.len() < 2 {
        debug!("refinement skipped: single-member alignment");
        return Ok(());
    }

    let coords: Vec<Vec<[f32; 3]>> = members
        .iter()
        .map(|&idx| db.ca_coords(state.db_keys[idx], state.seq_lens[idx]))
        .collect::<Result<_, _>>()?;

    let mut rng = StdRng::seed_from_u64(PARTITION_SEED);
    let member_cigars: Vec<&Vec<Instruction>> =
        members.iter().map(|&idx| &state.cigars_aa[idx]).collect();
    let mut current_lddt = calculate_lddt(&member_cigars, &coords, params.pair_threshold);
    debug!("refinement start, LDDT {:.4}", current_lddt);

    for iteration in 0..params.refine_iters {
        // random bipartition, both sides non-empty
        let (side_a, side_b) = loop {
            let mut a = Vec::new();
            let mut b = Vec::new();
            for (position, _) in members.iter().enumerate() {
                if rng.gen_bool(0.5) {
                    a.push(position);
                } else {
                    b.push(position);
                }
            }
            if !a.is_empty() && !b.is_empty() {
                break (a, b);
            }
        };

        let candidate = realign_partition(params, state, &members, &side_a, &side_b);
        let candidate = match candidate {
            Some(c) => c,
            None => {
                debug!("iteration {}: sides failed to align, reverted", iteration + 1);
                continue;
            }
        };

        let candidate_refs: Vec<&Vec<Instruction>> = candidate.iter().map(|(aa, _)| aa).collect();
        let candidate_lddt = calculate_lddt(&candidate_refs, &coords, params.pair_threshold);
        if candidate_lddt >= current_lddt {
            for (position, &idx) in members.iter().enumerate() {
                let (aa, ss) = candidate[position].clone();
                state.cigars_aa[idx] = aa;
                state.cigars_ss[idx] = ss;
            }
            debug!(
                "iteration {}: accepted, LDDT {:.4} -> {:.4}",
                iteration + 1,
                current_lddt,
                candidate_lddt
            );
            current_lddt = candidate_lddt;
        } else {
            debug!(
                "iteration {}: rejected, LDDT {:.4} < {:.4}",
                iteration + 1,
                candidate_lddt,
                current_lddt
            );
        }
    }
    Ok(())
}

/// Extract the two sub-alignments, profile them, align the profiles and
/// weave a candidate alignment. `None` when either side has no columns or
/// the profiles do not align.
fn realign_partition(
    params: &MsaParameters,
    state: &MsaState,
    members: &[usize],
    side_a: &[usize],
    side_b: &[usize],
) -> Option<Vec<(Vec<Instruction>, Vec<Instruction>)>> {
    let mask_a = occupancy_mask(state, members, side_a);
    let mask_b = occupancy_mask(state, members, side_b);
    let map_a = mask_to_mapping(&mask_a);
    let map_b = mask_to_mapping(&mask_b);
    if map_a.is_empty() || map_b.is_empty() {
        return None;
    }

    let side_cigars =
        |side: &[usize], channel: &Vec<Vec<Instruction>>| -> Vec<Vec<Instruction>> {
            side.iter().map(|&p| channel[members[p]].clone()).collect()
        };
    let a_aa = side_cigars(side_a, &state.cigars_aa);
    let a_ss = side_cigars(side_a, &state.cigars_ss);
    let b_aa = side_cigars(side_b, &state.cigars_aa);
    let b_ss = side_cigars(side_b, &state.cigars_ss);

    let profile_a_aa = msa_to_profile(&a_aa, &mask_a, &SUBMAT_AA, params, params.pca_aa, params.pcb_aa);
    let profile_a_ss =
        msa_to_profile(&a_ss, &mask_a, &SUBMAT_3DI, params, params.pca_3di, params.pcb_3di);
    let profile_b_aa = msa_to_profile(&b_aa, &mask_b, &SUBMAT_AA, params, params.pca_aa, params.pcb_aa);
    let profile_b_ss =
        msa_to_profile(&b_ss, &mask_b, &SUBMAT_3DI, params, params.pca_3di, params.pcb_3di);

    let mut aligner = StructureAligner::new(
        &SUBMAT_AA,
        &SUBMAT_3DI,
        params.gap_open,
        params.gap_extend,
        params.comp_bias_correction,
        params.comp_bias_correction_scale,
    );
    aligner.init_query(&Operand::Profile {
        aa: &profile_a_aa,
        ss: &profile_a_ss,
    });
    let res = aligner.align(&Operand::Profile {
        aa: &profile_b_aa,
        ss: &profile_b_ss,
    });
    if res.is_empty() {
        return None;
    }

    let (q_bt, t_bt) = get_merge_instructions(&res, &map_a, &map_b);
    let pad = compute_padding(&res, &map_a, &map_b);

    let mut candidate: Vec<(Vec<Instruction>, Vec<Instruction>)> = members
        .iter()
        .map(|&idx| (state.cigars_aa[idx].clone(), state.cigars_ss[idx].clone()))
        .collect();
    for &position in side_a {
        let (aa, ss) = &mut candidate[position];
        update_query_cigar(
            aa,
            ss,
            &q_bt,
            pad.q_pre_gap,
            pad.q_pre_seq,
            pad.q_end_gap,
            pad.q_end_seq,
        );
    }
    for &position in side_b {
        let (aa, ss) = &mut candidate[position];
        update_target_cigar(
            aa,
            ss,
            &t_bt,
            pad.t_pre_gap,
            pad.t_pre_seq,
            pad.t_end_gap,
            pad.t_end_seq,
        );
    }

    let width = cigar_length(&candidate[0].0, true);
    for (aa, ss) in &candidate {
        if cigar_length(aa, true) != width || cigar_length(ss, true) != width {
            // weaving failed to keep the union in register; drop the round
            return None;
        }
    }
    Some(candidate)
}

/// `'0'` for columns where at least one side member has a residue, `'1'`
/// (dropped) for columns that are all gap within the side.
fn occupancy_mask(state: &MsaState, members: &[usize], side: &[usize]) -> String {
    let width = cigar_length(&state.cigars_aa[members[side[0]]], true);
    let mut occupied = vec![false; width];
    for &position in side {
        let row = expand(&state.cigars_aa[members[position]]);
        for (column, &c) in row.iter().enumerate() {
            if c != b'-' {
                occupied[column] = true;
            }
        }
    }
    occupied.iter().map(|&o| if o { '0' } else { '1' }).collect()
}
