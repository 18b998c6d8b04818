use crate::alignment::cigar::{
    cigar_length, expand, get_merge_instructions, mask_to_mapping, update_query_cigar,
    update_target_cigar, Instruction,
};
use crate::alignment::scorer::{AlignmentResult, Operand, StructureAligner};
use crate::alignment::substitution::{SubstitutionMatrix, SUBMAT_3DI, SUBMAT_AA};
use crate::cli::MsaParameters;
use crate::database::structure_db::StructureDb;
use crate::profile::filter::{parse_qid_string, MsaFilter, MsaFilterParams};
use crate::profile::pssm::{apply_global_bias_correction, Pssm, PssmCalculator};
use crate::profile::weights::compute_profile_mask;
use crate::scoring::lddt::calculate_lddt;
use crate::scoring::tm_align;
use crate::tree::guide_tree::AlnSimple;
use crate::processing::msa_engine::MsaState;
use crate::utils::errors::WeaverError;

/// Everything a single merge produces; applied to the shared state at the
/// round barrier. Entries are keyed by the two cluster representatives, which
/// are disjoint across the merges of one round.
pub struct MergeOutcome {
    pub merged_id: usize,
    pub target_id: usize,
    pub new_cigars: Vec<(usize, Vec<Instruction>, Vec<Instruction>)>,
    pub new_group: Vec<usize>,
    pub mask: String,
    pub profile_aa: Pssm,
    pub profile_ss: Pssm,
    pub tm_aligned: bool,
    pub score: i32,
}

pub struct MergePadding {
    pub q_pre_gap: usize,
    pub q_pre_seq: usize,
    pub q_end_gap: usize,
    pub q_end_seq: usize,
    pub t_pre_gap: usize,
    pub t_pre_seq: usize,
    pub t_end_gap: usize,
    pub t_end_seq: usize,
}

/// The target side mirrors the query assignments: its leading residues cover
/// the query's leading gaps and vice versa.
pub fn compute_padding(res: &AlignmentResult, map1: &[usize], map2: &[usize]) -> MergePadding {
    let q_pre_seq = map1[res.q_start];
    let q_pre_gap = map2[res.db_start];
    let q_end_seq = map1[map1.len() - 1] - map1[res.q_end];
    let q_end_gap = map2[map2.len() - 1] - map2[res.db_end];
    MergePadding {
        q_pre_gap,
        q_pre_seq,
        q_end_gap,
        q_end_seq,
        t_pre_gap: q_pre_seq,
        t_pre_seq: q_pre_gap,
        t_end_gap: q_end_seq,
        t_end_seq: q_end_gap,
    }
}

/**
 * Execute one merge of the progressive phase.
 *
 * Resolves the two cluster representatives, orients the pair so the side
 * with the most information acts as the query, aligns over the masked
 * coordinates, optionally arbitrates between the dual-channel and the
 * structural alignment by LDDT, and produces rewoven CIGARs plus the new
 * mask and profiles for the surviving representative.
 */
pub fn merge_pair(
    db: &StructureDb,
    params: &MsaParameters,
    state: &MsaState,
    hit: &AlnSimple,
) -> Result<MergeOutcome, WeaverError> {
    let mut merged_id = std::cmp::min(hit.query_id, hit.target_id);
    let mut target_id = std::cmp::max(hit.query_id, hit.target_id);
    merged_id = state.id_mappings[merged_id];
    target_id = state.id_mappings[target_id];
    assert_ne!(merged_id, target_id, "merge hit within a single cluster");

    // Always merge onto the side with the most information.
    let mut query_is_profile = state.profiles.contains_key(&merged_id);
    let mut target_is_profile = state.profiles.contains_key(&target_id);
    if target_is_profile && !query_is_profile {
        std::mem::swap(&mut merged_id, &mut target_id);
        std::mem::swap(&mut query_is_profile, &mut target_is_profile);
    } else if target_is_profile && query_is_profile {
        let q_neff = state.profiles[&merged_id].1.neff_sum();
        let t_neff = state.profiles[&target_id].1.neff_sum();
        if q_neff <= t_neff {
            std::mem::swap(&mut merged_id, &mut target_id);
        }
    }

    let map1 = mask_to_mapping(&state.masks[merged_id]);
    let map2 = mask_to_mapping(&state.masks[target_id]);

    let q_raw_aa;
    let q_raw_ss;
    let query_op = if query_is_profile {
        let (aa, ss) = &state.profiles[&merged_id];
        Operand::Profile { aa, ss }
    } else {
        q_raw_aa = SUBMAT_AA.encode(db.aa.seq(merged_id));
        q_raw_ss = SUBMAT_3DI.encode(db.ss.seq(merged_id));
        Operand::Sequence {
            aa: &q_raw_aa,
            ss: &q_raw_ss,
        }
    };
    let t_raw_aa;
    let t_raw_ss;
    let target_op = if target_is_profile {
        let (aa, ss) = &state.profiles[&target_id];
        Operand::Profile { aa, ss }
    } else {
        t_raw_aa = SUBMAT_AA.encode(db.aa.seq(target_id));
        t_raw_ss = SUBMAT_3DI.encode(db.ss.seq(target_id));
        Operand::Sequence {
            aa: &t_raw_aa,
            ss: &t_raw_ss,
        }
    };
    debug_assert_eq!(map1.len(), query_op.len());
    debug_assert_eq!(map2.len(), target_op.len());

    let mut aligner = StructureAligner::new(
        &SUBMAT_AA,
        &SUBMAT_3DI,
        params.gap_open,
        params.gap_extend,
        params.comp_bias_correction,
        params.comp_bias_correction_scale,
    );
    aligner.init_query(&query_op);
    let mut res = aligner.align(&target_op);
    let mut tm_aligned = false;

    let q_members = &state.groups[merged_id];
    let t_members = &state.groups[target_id];

    let mut new_cigars: Vec<(usize, Vec<Instruction>, Vec<Instruction>)> = Vec::new();

    if res.is_empty() {
        // Unalignable pair: concatenate the two alignments side by side so
        // the cluster stays in register without aborting the traversal.
        debug!(
            "unalignable pair {} / {}, concatenating alignments",
            merged_id, target_id
        );
        let q_exp = cigar_length(&state.cigars_aa[q_members[0]], true);
        let t_exp = cigar_length(&state.cigars_aa[t_members[0]], true);
        for &index in q_members {
            let mut aa = state.cigars_aa[index].clone();
            let mut ss = state.cigars_ss[index].clone();
            update_query_cigar(&mut aa, &mut ss, &[], 0, 0, t_exp, q_exp);
            new_cigars.push((index, aa, ss));
        }
        for &index in t_members {
            let mut aa = state.cigars_aa[index].clone();
            let mut ss = state.cigars_ss[index].clone();
            update_target_cigar(&mut aa, &mut ss, &[], q_exp, 0, 0, t_exp);
            new_cigars.push((index, aa, ss));
        }
    } else {
        let (mut q_bt, mut t_bt) = get_merge_instructions(&res, &map1, &map2);

        // Structural arbitration: only meaningful while both sides are
        // single structures.
        if !query_is_profile && !target_is_profile {
            let q_coords = db.ca_coords(state.db_keys[merged_id], state.seq_lens[merged_id])?;
            let t_coords = db.ca_coords(state.db_keys[target_id], state.seq_lens[target_id])?;
            let tm = tm_align::align_structures(&q_coords, &t_coords);
            if !tm.result.is_empty() {
                let (q_bt_tm, t_bt_tm) = get_merge_instructions(&tm.result, &map1, &map2);
                let lddt_tm = candidate_lddt(
                    state, merged_id, target_id, &tm.result, &q_bt_tm, &t_bt_tm, &map1, &map2,
                    &q_coords, &t_coords, params.pair_threshold,
                );
                let lddt_3di = candidate_lddt(
                    state, merged_id, target_id, &res, &q_bt, &t_bt, &map1, &map2, &q_coords,
                    &t_coords, params.pair_threshold,
                );
                if lddt_tm > lddt_3di {
                    res = tm.result;
                    q_bt = q_bt_tm;
                    t_bt = t_bt_tm;
                    tm_aligned = true;
                }
            }
        }

        let pad = compute_padding(&res, &map1, &map2);
        for &index in q_members {
            let mut aa = state.cigars_aa[index].clone();
            let mut ss = state.cigars_ss[index].clone();
            update_query_cigar(
                &mut aa,
                &mut ss,
                &q_bt,
                pad.q_pre_gap,
                pad.q_pre_seq,
                pad.q_end_gap,
                pad.q_end_seq,
            );
            new_cigars.push((index, aa, ss));
        }
        for &index in t_members {
            let mut aa = state.cigars_aa[index].clone();
            let mut ss = state.cigars_ss[index].clone();
            update_target_cigar(
                &mut aa,
                &mut ss,
                &t_bt,
                pad.t_pre_gap,
                pad.t_pre_seq,
                pad.t_end_gap,
                pad.t_end_seq,
            );
            new_cigars.push((index, aa, ss));
        }
    }

    let mut new_group: Vec<usize> = Vec::with_capacity(q_members.len() + t_members.len());
    new_group.extend_from_slice(q_members);
    new_group.extend_from_slice(t_members);

    // Rebuild mask and profiles over the merged cluster.
    let member_cigars_aa: Vec<Vec<Instruction>> = new_group
        .iter()
        .map(|idx| {
            new_cigars
                .iter()
                .find(|(i, _, _)| i == idx)
                .map(|(_, aa, _)| aa.clone())
                .unwrap()
        })
        .collect();
    let member_cigars_ss: Vec<Vec<Instruction>> = new_group
        .iter()
        .map(|idx| {
            new_cigars
                .iter()
                .find(|(i, _, _)| i == idx)
                .map(|(_, _, ss)| ss.clone())
                .unwrap()
        })
        .collect();
    let member_lengths: Vec<usize> = new_group.iter().map(|&idx| state.seq_lens[idx]).collect();
    let members: Vec<usize> = (0..new_group.len()).collect();

    let mask = compute_profile_mask(
        &members,
        &member_cigars_aa,
        &member_lengths,
        &SUBMAT_AA,
        params.match_ratio,
    );
    let profile_aa = msa_to_profile(
        &member_cigars_aa,
        &mask,
        &SUBMAT_AA,
        params,
        params.pca_aa,
        params.pcb_aa,
    );
    let profile_ss = msa_to_profile(
        &member_cigars_ss,
        &mask,
        &SUBMAT_3DI,
        params,
        params.pca_3di,
        params.pcb_3di,
    );
    assert_eq!(
        profile_aa.len(),
        profile_ss.len(),
        "channel profiles diverged in column layout"
    );

    Ok(MergeOutcome {
        merged_id,
        target_id,
        new_cigars,
        new_group,
        mask,
        profile_aa,
        profile_ss,
        tm_aligned,
        score: res.score,
    })
}

/// LDDT of the two-structure test alignment a candidate backtrace produces.
fn candidate_lddt(
    state: &MsaState,
    merged_id: usize,
    target_id: usize,
    res: &AlignmentResult,
    q_bt: &[Instruction],
    t_bt: &[Instruction],
    map1: &[usize],
    map2: &[usize],
    q_coords: &[[f32; 3]],
    t_coords: &[[f32; 3]],
    pair_threshold: f32,
) -> f32 {
    let pad = compute_padding(res, map1, map2);
    let mut query_aa = state.cigars_aa[merged_id].clone();
    let mut query_ss = state.cigars_ss[merged_id].clone();
    let mut target_aa = state.cigars_aa[target_id].clone();
    let mut target_ss = state.cigars_ss[target_id].clone();
    update_query_cigar(
        &mut query_aa,
        &mut query_ss,
        q_bt,
        pad.q_pre_gap,
        pad.q_pre_seq,
        pad.q_end_gap,
        pad.q_end_seq,
    );
    update_target_cigar(
        &mut target_aa,
        &mut target_ss,
        t_bt,
        pad.t_pre_gap,
        pad.t_pre_seq,
        pad.t_end_gap,
        pad.t_end_seq,
    );
    let cigars = [&query_aa, &target_aa];
    let coords = vec![q_coords.to_vec(), t_coords.to_vec()];
    calculate_lddt(&cigars, &coords, pair_threshold)
}

/// Expand one member over the unmasked columns only.
fn expand_masked(cigar: &[Instruction], mask: &str) -> Vec<u8> {
    let expanded = expand(cigar);
    debug_assert_eq!(expanded.len(), mask.len());
    expanded
        .iter()
        .zip(mask.bytes())
        .filter(|(_, m)| *m == b'0')
        .map(|(c, _)| *c)
        .collect()
}

/**
 * Build one channel's PSSM from a cluster alignment and its mask: reduce to
 * unmasked columns, drop filtered sequences, run the PSSM calculation and
 * apply the global bias correction when configured.
 */
pub fn msa_to_profile(
    member_cigars: &[Vec<Instruction>],
    mask: &str,
    submat: &SubstitutionMatrix,
    params: &MsaParameters,
    pca: f32,
    pcb: f32,
) -> Pssm {
    let rows: Vec<Vec<u8>> = member_cigars
        .iter()
        .map(|cigar| expand_masked(cigar, mask))
        .collect();
    let row_refs: Vec<&[u8]> = rows.iter().map(|r| r.as_slice()).collect();

    let filter_params = MsaFilterParams {
        enabled: params.filter_msa,
        cov: params.cov,
        qid: parse_qid_string(&params.qid),
        qsc: params.qsc,
        max_seq_id: params.filter_max_seq_id,
        ndiff: params.ndiff,
        min_enable: params.filter_min_enable,
    };
    let filter = MsaFilter::new(submat, filter_params);
    let kept = filter.filter(&row_refs);
    let kept_rows: Vec<&[u8]> = row_refs
        .iter()
        .zip(kept.iter())
        .filter(|(_, &keep)| keep)
        .map(|(row, _)| *row)
        .collect();

    let calculator = PssmCalculator::new(submat, pca, pcb, params.pc_mode, params.wg);
    let mut pssm = calculator.compute(&kept_rows);
    if params.comp_bias_correction {
        apply_global_bias_correction(&mut pssm, submat);
    }
    pssm
}
