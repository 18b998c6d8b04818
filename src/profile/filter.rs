use ordered_float::OrderedFloat;

use crate::alignment::substitution::SubstitutionMatrix;

/// Thresholds driving [`MsaFilter`]. Mirrors the knobs exposed on the
/// command line; `qid` keeps the raw comma-separated form it arrives in.
#[derive(Debug, Clone)]
pub struct MsaFilterParams {
    pub enabled: bool,
    pub cov: f32,
    pub qid: Vec<f32>,
    pub qsc: f32,
    pub max_seq_id: f32,
    pub ndiff: usize,
    pub min_enable: usize,
}

impl MsaFilterParams {
    pub fn disabled() -> Self {
        MsaFilterParams {
            enabled: false,
            cov: 0.0,
            qid: vec![0.0],
            qsc: -20.0,
            max_seq_id: 0.9,
            ndiff: 1000,
            min_enable: 0,
        }
    }
}

/// Parse a comma-separated identity threshold list, e.g. `"0.0,0.2,0.5"`.
pub fn parse_qid_string(qid: &str) -> Vec<f32> {
    let mut values: Vec<f32> = qid
        .split(',')
        .filter_map(|field| field.trim().parse::<f32>().ok())
        .collect();
    if values.is_empty() {
        values.push(0.0);
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    values
}

/**
 * Identity-and-coverage filter over a reduced MSA.
 *
 * The first row acts as the query. Rows failing the coverage, query identity
 * or score-per-column thresholds are dropped; the survivors are then thinned
 * so no retained pair exceeds `max_seq_id` pairwise identity, keeping rows in
 * input order. At least `ndiff` rows are retained when available, re-adding
 * the most query-similar dropped rows. MSAs smaller than `min_enable` pass
 * through untouched.
 */
pub struct MsaFilter<'a> {
    submat: &'a SubstitutionMatrix,
    params: MsaFilterParams,
}

impl<'a> MsaFilter<'a> {
    pub fn new(submat: &'a SubstitutionMatrix, params: MsaFilterParams) -> Self {
        MsaFilter { submat, params }
    }

    /// Returns one keep flag per row. Row zero is always kept.
    pub fn filter(&self, msa: &[&[u8]]) -> Vec<bool> {
        let set_size = msa.len();
        let mut kept = vec![true; set_size];
        if !self.params.enabled || set_size <= 1 || set_size < self.params.min_enable {
            return kept;
        }

        let query = msa[0];
        let min_qid = self
            .params
            .qid
            .iter()
            .cloned()
            .fold(0.0f32, f32::max);

        for (i, row) in msa.iter().enumerate().skip(1) {
            let (identity, coverage, score_per_col) = self.compare_to_query(query, row);
            if coverage < self.params.cov
                || identity < min_qid
                || score_per_col < self.params.qsc
            {
                kept[i] = false;
            }
        }

        // pairwise redundancy pass over the survivors
        let mut retained: Vec<usize> = vec![0];
        for i in 1..set_size {
            if !kept[i] {
                continue;
            }
            let redundant = retained.iter().any(|&k| {
                let (identity, _, _) = self.compare_to_query(msa[k], msa[i]);
                identity > self.params.max_seq_id
            });
            if redundant {
                kept[i] = false;
            } else {
                retained.push(i);
            }
        }

        // keep the alignment from thinning below ndiff rows
        if retained.len() < self.params.ndiff {
            let mut candidates: Vec<(usize, f32)> = (1..set_size)
                .filter(|&i| !kept[i])
                .map(|i| {
                    let (identity, _, _) = self.compare_to_query(query, msa[i]);
                    (i, identity)
                })
                .collect();
            candidates
                .sort_by_key(|&(i, identity)| (std::cmp::Reverse(OrderedFloat(identity)), i));
            for (i, _) in candidates {
                if retained.len() >= self.params.ndiff {
                    break;
                }
                kept[i] = true;
                retained.push(i);
            }
        }

        kept
    }

    /// (identity, coverage, average score per aligned column) of `row`
    /// against `reference`.
    fn compare_to_query(&self, reference: &[u8], row: &[u8]) -> (f32, f32, f32) {
        let mut aligned = 0usize;
        let mut identical = 0usize;
        let mut reference_cols = 0usize;
        let mut score_sum = 0i64;
        for (&a, &b) in reference.iter().zip(row.iter()) {
            let a_res = a != b'-';
            let b_res = b != b'-';
            if a_res {
                reference_cols += 1;
            }
            if a_res && b_res {
                aligned += 1;
                if a.eq_ignore_ascii_case(&b) {
                    identical += 1;
                }
                let ca = self.submat.aa2num[a as usize] as usize;
                let cb = self.submat.aa2num[b as usize] as usize;
                score_sum += self.submat.matrix[ca][cb] as i64;
            }
        }
        if aligned == 0 {
            return (0.0, 0.0, -1000.0);
        }
        let identity = identical as f32 / aligned as f32;
        let coverage = aligned as f32 / reference_cols.max(1) as f32;
        let score_per_col = score_sum as f32 / aligned as f32;
        (identity, coverage, score_per_col)
    }
}
