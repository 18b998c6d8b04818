use crate::alignment::cigar::{cigar_length, Instruction};

/// Inclusion radius: residue pairs farther apart than this in the reference
/// do not contribute.
pub const CUTOFF_DISTANCE: f32 = 15.0;

/// The four standard preservation thresholds, in Ångström.
pub const THRESHOLDS: [f32; 4] = [0.5, 1.0, 2.0, 4.0];

/**
 * Local Distance Difference Test over a set of gapped alignments.
 *
 * `cigars` and `coords` run in parallel: one alignment row and one Cα array
 * per member, all rows expanded to the same column count. For every ordered
 * pair of members and every column both occupy, the fraction of preserved
 * intra-structure distances (reference distance under the cutoff, difference
 * within each threshold) is accumulated per column. Columns whose fraction of
 * occupied member pairs falls below `pair_threshold` are ignored. Returns the
 * mean column score in `[0, 1]`.
 */
pub fn calculate_lddt(
    cigars: &[&Vec<Instruction>],
    coords: &[Vec<[f32; 3]>],
    pair_threshold: f32,
) -> f32 {
    assert_eq!(cigars.len(), coords.len());
    let set_size = cigars.len();
    if set_size < 2 {
        return 0.0;
    }
    let columns = cigar_length(cigars[0], true);
    for cigar in cigars {
        assert_eq!(
            cigar_length(cigar, true),
            columns,
            "LDDT rows out of register"
        );
    }

    // column -> residue index per member
    let residue_maps: Vec<Vec<Option<usize>>> = cigars
        .iter()
        .map(|cigar| {
            let mut map = Vec::with_capacity(columns);
            let mut residue = 0usize;
            for ins in cigar.iter() {
                if ins.is_seq() {
                    map.push(Some(residue));
                    residue += 1;
                } else {
                    for _ in 0..ins.count() {
                        map.push(None);
                    }
                }
            }
            map
        })
        .collect();

    let mut column_scores = vec![0.0f64; columns];
    let mut column_pairs = vec![0u32; columns];

    for a in 0..set_size {
        for b in 0..set_size {
            if a == b {
                continue;
            }
            // a is the reference structure of this ordered pair
            for c1 in 0..columns {
                let (ra1, rb1) = match (residue_maps[a][c1], residue_maps[b][c1]) {
                    (Some(x), Some(y)) => (x, y),
                    _ => continue,
                };
                let mut preserved = 0.0f64;
                let mut considered = 0u32;
                for c2 in 0..columns {
                    if c2 == c1 {
                        continue;
                    }
                    let (ra2, rb2) = match (residue_maps[a][c2], residue_maps[b][c2]) {
                        (Some(x), Some(y)) => (x, y),
                        _ => continue,
                    };
                    let d_ref = distance(&coords[a][ra1], &coords[a][ra2]);
                    if d_ref >= CUTOFF_DISTANCE {
                        continue;
                    }
                    let d_other = distance(&coords[b][rb1], &coords[b][rb2]);
                    let diff = (d_ref - d_other).abs();
                    considered += 1;
                    for threshold in THRESHOLDS {
                        if diff < threshold {
                            preserved += 0.25;
                        }
                    }
                }
                if considered > 0 {
                    column_scores[c1] += preserved / considered as f64;
                    column_pairs[c1] += 1;
                }
            }
        }
    }

    let total_pairs = (set_size * (set_size - 1)) as f32;
    let mut sum = 0.0f64;
    let mut counted = 0usize;
    for c in 0..columns {
        if column_pairs[c] == 0 {
            continue;
        }
        let coverage = column_pairs[c] as f32 / total_pairs;
        if coverage < pair_threshold {
            continue;
        }
        sum += column_scores[c] / column_pairs[c] as f64;
        counted += 1;
    }
    if counted == 0 {
        return 0.0;
    }
    (sum / counted as f64) as f32
}

fn distance(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}
