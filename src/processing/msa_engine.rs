use std::collections::HashMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use rayon::prelude::*;

use crate::alignment::cigar::{expand, Instruction};
use crate::cli::MsaParameters;
use crate::database::db_reader::DbReader;
use crate::database::structure_db::StructureDb;
use crate::merge::merger::{merge_pair, MergeOutcome};
use crate::profile::pssm::Pssm;
use crate::refinement::refinement_engine::refine_many;
use crate::tree::guide_tree::{
    mst, parse_and_score_external_hits, reorder_linkage, sort_hits_by_score, update_all_scores,
    AlnSimple,
};
use crate::tree::newick::{linkage_to_newick, parse, post_order_pairs};
use crate::utils::errors::WeaverError;

/**
 * Mutable alignment state shared across the progressive phase.
 *
 * All tables are partitioned by cluster representative: a merge writes only
 * to entries keyed by its two representatives, which are disjoint across the
 * merges of one round, so outcomes computed in parallel can be applied at the
 * round barrier without locks.
 */
pub struct MsaState {
    pub cigars_aa: Vec<Vec<Instruction>>,
    pub cigars_ss: Vec<Vec<Instruction>>,
    pub groups: Vec<Vec<usize>>,
    pub masks: Vec<String>,
    pub id_mappings: Vec<usize>,
    pub profiles: HashMap<usize, (Pssm, Pssm)>,
    pub seq_lens: Vec<usize>,
    pub db_keys: Vec<u32>,
}

impl MsaState {
    pub fn new(db: &StructureDb) -> Self {
        let sequence_cnt = db.size();
        let mut cigars_aa = Vec::with_capacity(sequence_cnt);
        let mut cigars_ss = Vec::with_capacity(sequence_cnt);
        let mut masks = Vec::with_capacity(sequence_cnt);
        let mut seq_lens = Vec::with_capacity(sequence_cnt);
        let mut db_keys = Vec::with_capacity(sequence_cnt);
        for i in 0..sequence_cnt {
            let aa = db.aa.seq(i);
            let ss = db.ss.seq(i);
            assert_eq!(
                aa.len(),
                ss.len(),
                "amino-acid and 3Di entries differ in length for key {}",
                db.aa.db_key(i)
            );
            cigars_aa.push(aa.iter().map(|&c| Instruction::new_seq(c)).collect());
            cigars_ss.push(ss.iter().map(|&c| Instruction::new_seq(c)).collect());
            masks.push("0".repeat(aa.len()));
            seq_lens.push(aa.len());
            db_keys.push(db.aa.db_key(i));
        }
        MsaState {
            cigars_aa,
            cigars_ss,
            groups: (0..sequence_cnt).map(|i| vec![i]).collect(),
            masks,
            id_mappings: (0..sequence_cnt).collect(),
            profiles: HashMap::new(),
            seq_lens,
            db_keys,
        }
    }

    /// Fold one merge outcome back in. Must only run between rounds.
    pub fn apply_merge(&mut self, outcome: MergeOutcome) {
        let MergeOutcome {
            merged_id,
            target_id,
            new_cigars,
            new_group,
            mask,
            profile_aa,
            profile_ss,
            ..
        } = outcome;
        for (index, aa, ss) in new_cigars {
            self.cigars_aa[index] = aa;
            self.cigars_ss[index] = ss;
        }
        self.groups[merged_id] = new_group;
        self.groups[target_id].clear();
        self.masks[merged_id] = mask;
        self.masks[target_id].clear();
        self.profiles.insert(merged_id, (profile_aa, profile_ss));
        self.profiles.remove(&target_id);
        for mapping in self.id_mappings.iter_mut() {
            if *mapping == target_id {
                *mapping = merged_id;
            }
        }
    }
}

/// The progressive alignment engine: seeds a guide tree, executes its merge
/// rounds and writes the paired FASTA outputs.
pub struct MsaEngine<'a> {
    params: &'a MsaParameters,
    db: StructureDb,
}

pub fn start_msa_engine(params: &MsaParameters) -> Result<(), WeaverError> {
    let db = StructureDb::open(&params.structure_db)?;
    info!("Got databases");
    let mut engine = MsaEngine { params, db };
    engine.run()
}

impl<'a> MsaEngine<'a> {
    pub fn run(&mut self) -> Result<(), WeaverError> {
        let sequence_cnt = self.db.size();
        if sequence_cnt == 0 {
            return Err(WeaverError::DatabaseFormat(
                "structure database is empty".to_string(),
            ));
        }
        let mut state = MsaState::new(&self.db);
        info!("Initialised {} structure records", sequence_cnt);

        let (hits, merges) = self.build_guide_tree(&state)?;
        let mut final_msa_id = 0usize;

        info!("Begin progressive alignment");
        let progress = ProgressBar::new(hits.len() as u64);
        progress.set_style(
            ProgressStyle::with_template(
                "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} merges",
            )
            .unwrap()
            .progress_chars("##-"),
        );
        let mut index = 0usize;
        for (round, &count) in merges.iter().enumerate() {
            let round_hits = &hits[index..index + count];
            debug!(
                "Round {}: merging {} cluster pairs ({})",
                round + 1,
                count,
                round_hits
                    .iter()
                    .map(|h| format!("{}-{}", h.query_id, h.target_id))
                    .join(" ")
            );
            let outcomes: Result<Vec<MergeOutcome>, WeaverError> = round_hits
                .par_iter()
                .map(|hit| merge_pair(&self.db, self.params, &state, hit))
                .collect();
            for outcome in outcomes? {
                debug!(
                    "merged {}\t{}\t{}{}",
                    self.db.header(state.db_keys[outcome.merged_id]),
                    self.db.header(state.db_keys[outcome.target_id]),
                    outcome.score,
                    if outcome.tm_aligned { "\t(TM-align)" } else { "" }
                );
                final_msa_id = outcome.merged_id;
                state.apply_merge(outcome);
            }
            progress.inc(count as u64);
            index += count;
        }
        progress.finish_and_clear();

        if self.params.refine_iters > 0 {
            info!("Refining alignment for {} iterations", self.params.refine_iters);
            refine_many(&self.db, self.params, &mut state, final_msa_id)?;
        }

        self.write_msa(&state, final_msa_id)?;
        Ok(())
    }

    /// Assemble the ordered hit list plus per-round counts, either from a
    /// user supplied Newick tree or from the all-versus-all scoring pass.
    fn build_guide_tree(
        &self,
        state: &MsaState,
    ) -> Result<(Vec<AlnSimple>, Vec<usize>), WeaverError> {
        let sequence_cnt = self.db.size();
        if sequence_cnt == 1 {
            return Ok((Vec::new(), Vec::new()));
        }

        if let Some(tree_path) = &self.params.guide_tree {
            let text = fs::read_to_string(tree_path).map_err(|e| {
                WeaverError::Io(format!("failed to read guide tree {}: {}", tree_path, e))
            })?;
            info!("Parsing tree: {}", text.trim());
            let root = parse(&text)?;
            let mut tree_hits = Vec::new();
            for (query_name, target_name) in post_order_pairs(&root)? {
                let query_key = self
                    .db
                    .key_by_name(&query_name)
                    .ok_or_else(|| WeaverError::InputNotFound(query_name.clone()))?;
                let target_key = self
                    .db
                    .key_by_name(&target_name)
                    .ok_or_else(|| WeaverError::InputNotFound(target_name.clone()))?;
                let query_id = self.db.aa.id_of_key(query_key).unwrap();
                let target_id = self.db.aa.id_of_key(target_key).unwrap();
                if query_id == target_id {
                    continue;
                }
                tree_hits.push(AlnSimple {
                    query_id,
                    target_id,
                    score: 0,
                });
            }
            info!("Optimising merge order");
            return Ok(reorder_linkage(&tree_hits, sequence_cnt));
        }

        let mut already_merged = vec![false; sequence_cnt];
        let clu_db = match (&self.params.cluster_db, self.params.precluster) {
            (Some(prefix), true) => {
                // all-vs-all only covers cluster representatives; members
                // arrive through the external hits below
                already_merged.iter_mut().for_each(|m| *m = true);
                let reader =
                    DbReader::open(prefix.to_string(), format!("{}.index", prefix))?;
                for entry in 0..reader.size() {
                    if let Some(id) = self.db.aa.id_of_key(reader.db_key(entry)) {
                        already_merged[id] = false;
                    }
                }
                Some(reader)
            }
            _ => None,
        };

        info!("Performing initial all vs all alignments");
        let mut hits = update_all_scores(&self.db, self.params, &already_merged);
        if let Some(reader) = &clu_db {
            let external = parse_and_score_external_hits(&self.db, reader, self.params)?;
            debug!("Appending {} external cluster hits", external.len());
            hits.extend(external);
        }
        sort_hits_by_score(&mut hits);

        info!("Generating guide tree");
        let linkage = mst(&hits, sequence_cnt);

        info!("Optimising merge order");
        let (ordered, rounds) = reorder_linkage(&linkage, sequence_cnt);

        let names: Vec<String> = (0..sequence_cnt)
            .map(|i| self.db.header(state.db_keys[i]))
            .collect();
        let newick = linkage_to_newick(&ordered, &names, sequence_cnt);
        let tree_file = format!("{}.nw", self.params.output);
        info!("Writing guide tree to: {}", tree_file);
        fs::write(&tree_file, newick)
            .map_err(|e| WeaverError::Io(format!("failed to write {}: {}", tree_file, e)))?;

        Ok((ordered, rounds))
    }

    /// Write the two gapped FASTA outputs plus their transient index files.
    fn write_msa(&self, state: &MsaState, final_msa_id: usize) -> Result<(), WeaverError> {
        let order: Vec<usize> = if state.groups[final_msa_id].is_empty() {
            vec![final_msa_id]
        } else {
            state.groups[final_msa_id].clone()
        };
        assert_eq!(
            order.len(),
            self.db.size(),
            "final cluster does not cover every structure"
        );

        for (suffix, cigars) in [("aa", &state.cigars_aa), ("3di", &state.cigars_ss)] {
            let fasta_path = format!("{}_{}.fa", self.params.output, suffix);
            let index_path = format!("{}_{}.index", self.params.output, suffix);
            let file = fs::File::create(&fasta_path)
                .map_err(|e| WeaverError::Io(format!("failed to create {}: {}", fasta_path, e)))?;
            let mut writer = BufWriter::new(file);
            let mut index_lines = String::new();
            let mut offset = 0usize;
            for &idx in &order {
                let header = self.db.header(state.db_keys[idx]);
                let row = expand(&cigars[idx]);
                let record = format!(">{}\n{}\n", header, String::from_utf8_lossy(&row));
                writer.write_all(record.as_bytes()).map_err(|e| {
                    WeaverError::Io(format!("failed to write {}: {}", fasta_path, e))
                })?;
                index_lines.push_str(&format!(
                    "{}\t{}\t{}\n",
                    state.db_keys[idx],
                    offset,
                    record.len()
                ));
                offset += record.len();
            }
            writer
                .flush()
                .map_err(|e| WeaverError::Io(format!("failed to flush {}: {}", fasta_path, e)))?;
            fs::write(&index_path, index_lines)
                .map_err(|e| WeaverError::Io(format!("failed to write {}: {}", index_path, e)))?;
            // the index only exists while the writer runs
            if Path::new(&index_path).exists() {
                let _ = fs::remove_file(&index_path);
            }
            info!("Wrote {}", fasta_path);
        }
        Ok(())
    }
}
