use bio::scores::blosum62;

use crate::ALPHABET_SIZE;

/// Shared letter order for both channels: twenty residue (or 3Di state)
/// letters plus X for anything unknown.
pub const ALPHABET: &[u8; ALPHABET_SIZE] = b"ACDEFGHIKLMNPQRSTVWYX";

/// Robinson & Robinson amino-acid background frequencies, X pinned to a tiny
/// pseudo frequency.
const AA_BACKGROUND: [f32; ALPHABET_SIZE] = [
    0.0780, 0.0192, 0.0536, 0.0629, 0.0397, 0.0738, 0.0219, 0.0514, 0.0572, 0.0901, 0.0224,
    0.0448, 0.0520, 0.0426, 0.0512, 0.0712, 0.0584, 0.0644, 0.0132, 0.0321, 0.0001,
];

/// Background state frequencies for the structural alphabet.
const SS_BACKGROUND: [f32; ALPHABET_SIZE] = [
    0.0489, 0.0529, 0.0771, 0.0350, 0.0405, 0.0514, 0.0434, 0.0352, 0.0297, 0.0671, 0.0242,
    0.0475, 0.0578, 0.0378, 0.0461, 0.0654, 0.0584, 0.0724, 0.0251, 0.0840, 0.0001,
];

/// Substitution scores for the 3Di structural alphabet, half-bit units, same
/// letter order as [`ALPHABET`].
const SS_MATRIX: &str = "\
    A   C   D   E   F   G   H   I   K   L   M   N   P   Q   R   S   T   V   W   Y   X
A   6   2   1   2   3  -1   1   0  -4   0  -6  -5   0  -6  -3  -7  -1  -1  -7  -2   0
C   2   6  -6  -1  -1  -5  -2  -2  -9   1  -4  -4  -6  -5   0  -3  -4  -4  -8   0   0
D   1  -6   4  -9  -9   1   1  -2  -7  -6  -8  -3  -4  -7  -2  -6   1   0  -5  -2   0
E   2  -1  -9   9  -8  -3  -5  -6  -2  -5  -7  -1   0  -2  -6 -10  -6  -2  -4  -3   0
F   3  -1  -9  -8   7  -1  -5  -6   1  -7  -6  -4  -6   2  -5  -9  -7  -1   0  -6   0
G  -1  -5   1  -3  -1   6   3  -5  -9   0  -4   1  -5  -3  -3  -1  -3   1  -9  -6   0
H   1  -2   1  -5  -5   3   6  -8  -6  -5  -2   3  -6  -5  -2  -5  -5   1  -7  -2   0
I   0  -2  -2  -6  -6  -5  -8   8  -5  -5   7  -6   0  -5   0  -2  -3  -5  -5  -1   0
K  -4  -9  -7  -2   1  -9  -6  -5   9  -6  -3  -3  -2  -5  -8  -9  -3  -1   0  -2   0
L   0   1  -6  -5  -7   0  -5  -5  -6   6  -7  -3  -4  -4   1  -4  -5  -6  -1  -3   0
M  -6  -4  -8  -7  -6  -4  -2   7  -3  -7  10  -4  -5  -2  -3 -10  -9  -6   1  -1   0
N  -5  -4  -3  -1  -4   1   3  -6  -3  -3  -4   6  -7   1  -2  -4  -3  -2  -5  -7   0
P   0  -6  -4   0  -6  -5  -6   0  -2  -4  -5  -7   8  -2  -5  -4  -7  -6  -1   0   0
Q  -6  -5  -7  -2   2  -3  -5  -5  -5  -4  -2   1  -2   7  -6  -6  -4  -7  -5   1   0
R  -3   0  -2  -6  -5  -3  -2   0  -8   1  -3  -2  -5  -6   6  -1  -6  -1  -9  -6   0
S  -7  -3  -6 -10  -9  -1  -5  -2  -9  -4 -10  -4  -4  -6  -1   4   2  -5 -11  -4   0
T  -1  -4   1  -6  -7  -3  -5  -3  -3  -5  -9  -3  -7  -4  -6   2   5   2  -7  -8   0
V  -1  -4   0  -2  -1   1   1  -5  -1  -6  -6  -2  -6  -7  -1  -5   2   6  -2  -6   0
W  -7  -8  -5  -4   0  -9  -7  -5   0  -1   1  -5  -1  -5  -9 -11  -7  -2   9   0   0
Y  -2   0  -2  -3  -6  -6  -2  -1  -2  -3  -1  -7   0   1  -6  -4  -8  -6   0   7   0
X   0   0   0   0   0   0   0   0   0   0   0   0   0   0   0   0   0   0   0   0   0
";

/// A scoring matrix over one channel plus the letter <-> code mappings shared
/// by sequences, profiles and the aligner kernels. Built once at startup and
/// read-only afterwards.
pub struct SubstitutionMatrix {
    pub name: &'static str,
    pub aa2num: [u8; 256],
    pub num2aa: [u8; ALPHABET_SIZE],
    pub matrix: [[i16; ALPHABET_SIZE]; ALPHABET_SIZE],
    pub background: [f32; ALPHABET_SIZE],
}

impl SubstitutionMatrix {
    fn mappings() -> ([u8; 256], [u8; ALPHABET_SIZE]) {
        let mut aa2num = [(ALPHABET_SIZE - 1) as u8; 256];
        let mut num2aa = [0u8; ALPHABET_SIZE];
        for (i, &letter) in ALPHABET.iter().enumerate() {
            aa2num[letter as usize] = i as u8;
            aa2num[letter.to_ascii_lowercase() as usize] = i as u8;
            num2aa[i] = letter;
        }
        (aa2num, num2aa)
    }

    /// BLOSUM62 for the amino-acid channel.
    pub fn blosum62() -> Self {
        let (aa2num, num2aa) = Self::mappings();
        let mut matrix = [[0i16; ALPHABET_SIZE]; ALPHABET_SIZE];
        for i in 0..ALPHABET_SIZE {
            for j in 0..ALPHABET_SIZE {
                matrix[i][j] = blosum62(ALPHABET[i], ALPHABET[j]) as i16;
            }
        }
        SubstitutionMatrix {
            name: "blosum62",
            aa2num,
            num2aa,
            matrix,
            background: AA_BACKGROUND,
        }
    }

    /// The structural-alphabet matrix for the 3Di channel.
    pub fn mat_3di() -> Self {
        let (aa2num, num2aa) = Self::mappings();
        let mut matrix = [[0i16; ALPHABET_SIZE]; ALPHABET_SIZE];
        for (i, line) in SS_MATRIX.lines().skip(1).enumerate() {
            for (j, field) in line.split_whitespace().skip(1).enumerate() {
                matrix[i][j] = field
                    .parse::<i16>()
                    .unwrap_or_else(|_| panic!("bad 3Di matrix entry: {}", field));
            }
        }
        SubstitutionMatrix {
            name: "3di",
            aa2num,
            num2aa,
            matrix,
            background: SS_BACKGROUND,
        }
    }

    pub fn encode(&self, seq: &[u8]) -> Vec<u8> {
        seq.iter().map(|&c| self.aa2num[c as usize]).collect()
    }

    pub fn decode(&self, codes: &[u8]) -> Vec<u8> {
        codes.iter().map(|&c| self.num2aa[c as usize]).collect()
    }

    /// Flattened i8 copy fed to the aligner kernels.
    pub fn tiny(&self) -> Vec<i8> {
        let mut flat = vec![0i8; ALPHABET_SIZE * ALPHABET_SIZE];
        for i in 0..ALPHABET_SIZE {
            for j in 0..ALPHABET_SIZE {
                flat[i * ALPHABET_SIZE + j] = self.matrix[i][j] as i8;
            }
        }
        flat
    }

    /**
     * Local composition bias correction for a raw sequence, one value per
     * position: the negated average score of the position's residue against
     * a +/-20 residue window. Sequences with skewed composition would
     * otherwise accumulate spurious ungapped score.
     */
    pub fn calc_local_bias_correction(&self, seq_num: &[u8], scale: f32) -> Vec<f32> {
        const HALF_WINDOW: usize = 20;
        let length = seq_num.len();
        let mut correction = vec![0.0f32; length];
        for i in 0..length {
            let start = i.saturating_sub(HALF_WINDOW);
            let end = std::cmp::min(length, i + HALF_WINDOW + 1);
            let mut sum = 0i32;
            let mut count = 0i32;
            for j in start..end {
                if j == i {
                    continue;
                }
                sum += self.matrix[seq_num[j] as usize][seq_num[i] as usize] as i32;
                count += 1;
            }
            if count > 0 {
                correction[i] = -(sum as f32 / count as f32) * scale;
            }
        }
        correction
    }

    /// Round a bias value to the nearest integer away from zero, the form the
    /// integer kernels consume.
    pub fn round_bias(bias: f32) -> i16 {
        if bias < 0.0 {
            (bias - 0.5) as i16
        } else {
            (bias + 0.5) as i16
        }
    }
}

lazy_static! {
    /// Process-wide read-only matrices for the two channels.
    pub static ref SUBMAT_AA: SubstitutionMatrix = SubstitutionMatrix::blosum62();
    pub static ref SUBMAT_3DI: SubstitutionMatrix = SubstitutionMatrix::mat_3di();
}
