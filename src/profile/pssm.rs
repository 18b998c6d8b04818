use ndarray::Array2;

use crate::alignment::substitution::SubstitutionMatrix;
use crate::{ALPHABET_SIZE, PROFILE_AA_SIZE};

/// Half-bit scale shared with the substitution matrices.
const SCORE_SCALE: f64 = 2.0;
const MIN_SCORE: i32 = -50;
const MAX_SCORE: i32 = 50;

/// Position-specific scoring matrix for one channel of a cluster. Column
/// layout matches the unmasked columns of the cluster alignment; the AA and
/// 3Di profiles of a cluster always share it.
#[derive(Debug, Clone)]
pub struct Pssm {
    /// Log-odds scores, `[letter][column]`, half-bit units.
    pub scores: Array2<i16>,
    /// Consensus letter per column, numeric codes.
    pub consensus: Vec<u8>,
    /// Effective sequence count per column.
    pub neff: Vec<f32>,
    /// Position-specific gap penalties, present only when gap position
    /// scoring is enabled.
    pub gap_open: Option<Vec<u8>>,
    pub gap_close: Option<Vec<u8>>,
}

impl Pssm {
    pub fn len(&self) -> usize {
        self.consensus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consensus.is_empty()
    }

    /// Total effective sequence mass, the merge orientation criterion.
    pub fn neff_sum(&self) -> f32 {
        self.neff.iter().sum()
    }
}

/// Builds PSSMs from reduced (masked-column) MSAs. One instance per worker
/// thread; the substitution matrix is shared.
pub struct PssmCalculator<'a> {
    submat: &'a SubstitutionMatrix,
    /// Conditional substitution probabilities p(a|b), derived from the
    /// matrix scores and background once per calculator.
    conditional: Array2<f64>,
    pca: f32,
    pcb: f32,
    pc_mode: i32,
    wg: bool,
}

impl<'a> PssmCalculator<'a> {
    pub fn new(submat: &'a SubstitutionMatrix, pca: f32, pcb: f32, pc_mode: i32, wg: bool) -> Self {
        let mut conditional = Array2::zeros((ALPHABET_SIZE, ALPHABET_SIZE));
        for b in 0..ALPHABET_SIZE {
            let mut total = 0.0f64;
            for a in 0..ALPHABET_SIZE {
                let odds = 2f64.powf(submat.matrix[a][b] as f64 / SCORE_SCALE);
                let p = submat.background[a] as f64 * odds;
                conditional[[a, b]] = p;
                total += p;
            }
            if total > 0.0 {
                for a in 0..ALPHABET_SIZE {
                    conditional[[a, b]] /= total;
                }
            }
        }
        PssmCalculator {
            submat,
            conditional,
            pca,
            pcb,
            pc_mode,
            wg,
        }
    }

    /**
     * Compute a PSSM from a reduced MSA.
     *
     * `msa` holds one expanded row per retained sequence, `-` for gaps, over
     * the unmasked columns only. Sequence weighting is position-based
     * (Henikoff 1994) unless global weighting was requested, pseudo-counts
     * are mixed in per column, and the result is rounded to half-bit integer
     * scores.
     */
    pub fn compute(&self, msa: &[&[u8]]) -> Pssm {
        assert!(!msa.is_empty(), "cannot build a profile from an empty MSA");
        let length = msa[0].len();
        let set_size = msa.len();
        for row in msa {
            assert_eq!(row.len(), length, "ragged MSA row");
        }

        let weights = if self.wg {
            vec![1.0f64 / set_size as f64; set_size]
        } else {
            self.position_weights(msa, length)
        };

        // weighted residue frequencies per column
        let mut freqs = Array2::<f64>::zeros((ALPHABET_SIZE, length));
        let mut col_mass = vec![0.0f64; length];
        for (row, weight) in msa.iter().zip(weights.iter()) {
            for (j, &c) in row.iter().enumerate() {
                if c == b'-' {
                    continue;
                }
                let code = self.submat.aa2num[c as usize] as usize;
                if code < PROFILE_AA_SIZE {
                    freqs[[code, j]] += weight;
                    col_mass[j] += weight;
                }
            }
        }
        for j in 0..length {
            if col_mass[j] > 0.0 {
                for a in 0..PROFILE_AA_SIZE {
                    freqs[[a, j]] /= col_mass[j];
                }
            }
        }

        let neff: Vec<f32> = (0..length)
            .map(|j| {
                let mut entropy = 0.0f64;
                for a in 0..PROFILE_AA_SIZE {
                    let p = freqs[[a, j]];
                    if p > 0.0 {
                        entropy -= p * p.ln();
                    }
                }
                entropy.exp() as f32
            })
            .collect();

        let mut scores = Array2::<i16>::zeros((ALPHABET_SIZE, length));
        let mut consensus = vec![(ALPHABET_SIZE - 1) as u8; length];
        for j in 0..length {
            let mixed = self.mix_pseudocounts(&freqs, j, neff[j]);
            let mut best_letter = 0usize;
            let mut best_p = -1.0f64;
            for a in 0..PROFILE_AA_SIZE {
                if mixed[a] > best_p {
                    best_p = mixed[a];
                    best_letter = a;
                }
            }
            consensus[j] = best_letter as u8;
            for a in 0..PROFILE_AA_SIZE {
                let background = self.submat.background[a] as f64;
                let score = if mixed[a] > 0.0 && background > 0.0 {
                    (SCORE_SCALE * (mixed[a] / background).log2()).round() as i32
                } else {
                    MIN_SCORE
                };
                scores[[a, j]] = score.clamp(MIN_SCORE, MAX_SCORE) as i16;
            }
            // X scores a mild penalty everywhere, as in the raw matrices
            scores[[ALPHABET_SIZE - 1, j]] = -1;
        }

        Pssm {
            scores,
            consensus,
            neff,
            gap_open: None,
            gap_close: None,
        }
    }

    /// Position-based sequence weights over the reduced MSA.
    fn position_weights(&self, msa: &[&[u8]], length: usize) -> Vec<f64> {
        let set_size = msa.len();
        let mut counts = vec![0u32; (PROFILE_AA_SIZE + 1) * length];
        for row in msa {
            for (j, &c) in row.iter().enumerate() {
                if c == b'-' {
                    continue;
                }
                let code = self.submat.aa2num[c as usize] as usize;
                if code < PROFILE_AA_SIZE {
                    let ij = code * length + j;
                    counts[ij] += 1;
                    if counts[ij] == 1 {
                        counts[PROFILE_AA_SIZE * length + j] += 1;
                    }
                }
            }
        }
        let mut weights = vec![1e-6f64; set_size];
        for (i, row) in msa.iter().enumerate() {
            let residues = row.iter().filter(|&&c| c != b'-').count();
            for (j, &c) in row.iter().enumerate() {
                if c == b'-' {
                    continue;
                }
                let code = self.submat.aa2num[c as usize] as usize;
                if code < PROFILE_AA_SIZE {
                    let distinct = counts[PROFILE_AA_SIZE * length + j];
                    let same = counts[code * length + j];
                    if same > 0 && distinct > 0 {
                        weights[i] +=
                            1.0 / (same as f64 * distinct as f64 * (residues as f64 + 30.0));
                    }
                }
            }
        }
        let total: f64 = weights.iter().sum();
        if total > 0.0 {
            for w in weights.iter_mut() {
                *w /= total;
            }
        }
        weights
    }

    fn mix_pseudocounts(&self, freqs: &Array2<f64>, j: usize, neff: f32) -> [f64; ALPHABET_SIZE] {
        let tau = match self.pc_mode {
            0 => 0.0,
            2 => (self.pca as f64).clamp(0.0, 1.0),
            _ => {
                let t = self.pca as f64 / (1.0 + neff as f64 / self.pcb as f64);
                t.clamp(0.0, 0.95)
            }
        };
        let mut mixed = [0.0f64; ALPHABET_SIZE];
        let mut total = 0.0f64;
        for a in 0..PROFILE_AA_SIZE {
            let mut pseudo = 0.0f64;
            for b in 0..PROFILE_AA_SIZE {
                pseudo += self.conditional[[a, b]] * freqs[[b, j]];
            }
            mixed[a] = (1.0 - tau) * freqs[[a, j]] + tau * pseudo;
            total += mixed[a];
        }
        if total > 0.0 {
            for p in mixed.iter_mut() {
                *p /= total;
            }
        }
        mixed
    }
}

/**
 * Global composition bias correction over a finished PSSM: per column,
 * subtract the deviation of the column's expected score from the profile-wide
 * mean so composition-skewed clusters do not dominate later merges.
 */
pub fn apply_global_bias_correction(pssm: &mut Pssm, submat: &SubstitutionMatrix) {
    let length = pssm.len();
    if length == 0 {
        return;
    }
    let expected: Vec<f64> = (0..length)
        .map(|j| {
            (0..PROFILE_AA_SIZE)
                .map(|a| pssm.scores[[a, j]] as f64 * submat.background[a] as f64)
                .sum()
        })
        .collect();
    let mean: f64 = expected.iter().sum::<f64>() / length as f64;
    for j in 0..length {
        let shift = (expected[j] - mean).round() as i16;
        for a in 0..PROFILE_AA_SIZE {
            pssm.scores[[a, j]] =
                (pssm.scores[[a, j]] - shift).clamp(MIN_SCORE as i16, MAX_SCORE as i16);
        }
    }
}
