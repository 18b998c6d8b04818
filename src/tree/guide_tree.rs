use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::alignment::scorer::{Operand, StructureAligner};
use crate::alignment::substitution::{SUBMAT_3DI, SUBMAT_AA};
use crate::cli::MsaParameters;
use crate::database::db_reader::DbReader;
use crate::database::structure_db::StructureDb;
use crate::utils::errors::WeaverError;

/// One scored pair of structures; the unit the guide tree is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlnSimple {
    pub query_id: usize,
    pub target_id: usize,
    pub score: i32,
}

/// Path-halving find over a parent array.
pub fn find_root(parent: &mut [usize], mut vertex: usize) -> usize {
    while parent[vertex] != vertex {
        parent[vertex] = parent[parent[vertex]];
        vertex = parent[vertex];
    }
    vertex
}

fn progress_style() -> ProgressStyle {
    ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
        .unwrap()
        .progress_chars("##-")
}

/**
 * All-versus-all ungapped scoring pass seeding the guide tree.
 *
 * Parallel over query indices; every worker owns its own aligner and encoded
 * scratch sequences, thread-local hit vectors are concatenated at the end.
 * Structures flagged in `already_merged` are skipped on both sides.
 */
pub fn update_all_scores(
    db: &StructureDb,
    params: &MsaParameters,
    already_merged: &[bool],
) -> Vec<AlnSimple> {
    let sequence_cnt = db.size();
    let progress = ProgressBar::new(sequence_cnt as u64);
    progress.set_style(progress_style());
    progress.set_message("all vs all");

    let hits: Vec<AlnSimple> = (0..sequence_cnt)
        .into_par_iter()
        .map_init(
            || {
                StructureAligner::new(
                    &SUBMAT_AA,
                    &SUBMAT_3DI,
                    params.gap_open,
                    params.gap_extend,
                    params.comp_bias_correction,
                    params.comp_bias_correction_scale,
                )
            },
            |aligner, i| {
                let mut thread_hits = Vec::new();
                progress.inc(1);
                if already_merged[i] {
                    return thread_hits;
                }
                let q_aa = SUBMAT_AA.encode(db.aa.seq(i));
                let q_ss = SUBMAT_3DI.encode(db.ss.seq(i));
                aligner.init_query(&Operand::Sequence {
                    aa: &q_aa,
                    ss: &q_ss,
                });
                for j in (i + 1)..sequence_cnt {
                    if already_merged[j] {
                        continue;
                    }
                    let t_aa = SUBMAT_AA.encode(db.aa.seq(j));
                    let t_ss = SUBMAT_3DI.encode(db.ss.seq(j));
                    thread_hits.push(AlnSimple {
                        query_id: i,
                        target_id: j,
                        score: aligner.ungapped_score(&t_aa, &t_ss),
                    });
                }
                thread_hits
            },
        )
        .flatten()
        .collect();
    progress.finish_and_clear();
    hits
}

/**
 * Score representative-to-member pairs from an external clustering database.
 * Every cluster entry lists member keys one per line, the entry key being the
 * representative; each pair is scored with the same ungapped kernel as the
 * all-versus-all pass and appended to the hit list.
 */
pub fn parse_and_score_external_hits(
    db: &StructureDb,
    clu_db: &DbReader,
    params: &MsaParameters,
) -> Result<Vec<AlnSimple>, WeaverError> {
    let entries: Vec<usize> = (0..clu_db.size()).collect();
    let hits: Result<Vec<Vec<AlnSimple>>, WeaverError> = entries
        .par_iter()
        .map_init(
            || {
                StructureAligner::new(
                    &SUBMAT_AA,
                    &SUBMAT_3DI,
                    params.gap_open,
                    params.gap_extend,
                    params.comp_bias_correction,
                    params.comp_bias_correction_scale,
                )
            },
            |aligner, &entry| {
                let query_key = clu_db.db_key(entry);
                let query_id = db.aa.id_of_key(query_key).ok_or_else(|| {
                    WeaverError::DatabaseFormat(format!(
                        "cluster representative {} missing from structure database",
                        query_key
                    ))
                })?;
                let q_aa = SUBMAT_AA.encode(db.aa.seq(query_id));
                let q_ss = SUBMAT_3DI.encode(db.ss.seq(query_id));
                aligner.init_query(&Operand::Sequence {
                    aa: &q_aa,
                    ss: &q_ss,
                });

                let mut thread_hits = Vec::new();
                let text = String::from_utf8_lossy(clu_db.seq(entry)).into_owned();
                for line in text.lines() {
                    let member_key = match line.split_whitespace().next() {
                        Some(field) => match field.parse::<u32>() {
                            Ok(k) => k,
                            Err(_) => continue,
                        },
                        None => continue,
                    };
                    if member_key == query_key {
                        continue;
                    }
                    let member_id = db.aa.id_of_key(member_key).ok_or_else(|| {
                        WeaverError::DatabaseFormat(format!(
                            "cluster member {} missing from structure database",
                            member_key
                        ))
                    })?;
                    let t_aa = SUBMAT_AA.encode(db.aa.seq(member_id));
                    let t_ss = SUBMAT_3DI.encode(db.ss.seq(member_id));
                    thread_hits.push(AlnSimple {
                        query_id,
                        target_id: member_id,
                        score: aligner.ungapped_score(&t_aa, &t_ss),
                    });
                }
                Ok(thread_hits)
            },
        )
        .collect();
    Ok(hits?.into_iter().flatten().collect())
}

/// Deterministic hit order: score descending, then query id, then target id.
pub fn sort_hits_by_score(hits: &mut [AlnSimple]) {
    hits.par_sort_unstable_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(a.query_id.cmp(&b.query_id))
            .then(a.target_id.cmp(&b.target_id))
    });
}

/// Kruskal pass over score-sorted hits: keep every hit joining two distinct
/// components. The accepted edges are the guide tree.
pub fn mst(hits: &[AlnSimple], n: usize) -> Vec<AlnSimple> {
    let mut parent: Vec<usize> = (0..n).collect();
    let mut result = Vec::with_capacity(n.saturating_sub(1));
    for hit in hits {
        let u = find_root(&mut parent, hit.query_id);
        let v = find_root(&mut parent, hit.target_id);
        if u != v {
            result.push(*hit);
            parent[u] = v;
            if result.len() + 1 == n {
                break;
            }
        }
    }
    result
}

/**
 * Reorder guide-tree edges into rounds of independent merges.
 *
 * Greedy scan: take every edge whose component roots are untouched in the
 * current round, then start the next round. The returned counts give the
 * number of edges per round; within a round no two edges share a component,
 * so they can run concurrently.
 */
pub fn reorder_linkage(linkage: &[AlnSimple], n: usize) -> (Vec<AlnSimple>, Vec<usize>) {
    let mut parent: Vec<usize> = (0..n).collect();
    let mut counts = vec![0u32; n];
    let mut result = Vec::with_capacity(linkage.len());
    let mut merged = vec![false; linkage.len()];
    let mut rounds = Vec::new();
    let mut merge_count = 0usize;
    while merge_count < linkage.len() {
        counts.iter_mut().for_each(|c| *c = 0);
        let mut merge_tally = 0usize;
        for (i, aln) in linkage.iter().enumerate() {
            if merged[i] {
                continue;
            }
            let u = find_root(&mut parent, aln.query_id);
            let v = find_root(&mut parent, aln.target_id);
            if counts[u] > 0 || counts[v] > 0 {
                continue;
            }
            result.push(*aln);
            parent[u] = v;
            merged[i] = true;
            counts[u] += 1;
            counts[v] += 1;
            merge_tally += 1;
        }
        assert!(merge_tally > 0, "merge reordering made no progress");
        rounds.push(merge_tally);
        merge_count += merge_tally;
    }
    (result, rounds)
}
