/**
 * Run-length encoded alignment representation.
 *
 * Every aligned structure carries two parallel instruction vectors, one per
 * channel (amino acid and 3Di), that stay in register at all times: GAP
 * instructions are byte-for-byte identical between the channels, SEQ
 * instructions at the same index hold the two letters of the same backbone
 * position. A SEQ instruction encodes exactly one residue (the seven count
 * bits are reinterpreted as the residue character); a GAP instruction encodes
 * a run of 1..=127 gap columns, longer runs are split across consecutive
 * instructions.
 */
use crate::alignment::scorer::AlignmentResult;

/// Largest run a single instruction can hold.
pub const MAX_RUN: u8 = 127;

const STATE_BIT: u8 = 0x80;

/// One CIGAR element packed into a single byte: high bit is the state
/// (0 = SEQ, 1 = GAP), the low seven bits are the residue character or the
/// gap run length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    bits: u8,
}

impl Instruction {
    pub fn new_seq(residue: u8) -> Self {
        assert!(residue < STATE_BIT, "residue code out of range: {}", residue);
        Instruction { bits: residue }
    }

    pub fn new_gap(count: u8) -> Self {
        assert!(count <= MAX_RUN, "gap run out of range: {}", count);
        Instruction {
            bits: STATE_BIT | count,
        }
    }

    pub fn is_seq(&self) -> bool {
        self.bits & STATE_BIT == 0
    }

    pub fn is_gap(&self) -> bool {
        !self.is_seq()
    }

    /// Gap run length, or the residue payload of a SEQ element.
    pub fn count(&self) -> u8 {
        self.bits & !STATE_BIT
    }

    pub fn is_full(&self) -> bool {
        self.is_gap() && self.count() == MAX_RUN
    }

    /// The character this element contributes to the expanded alignment.
    pub fn character(&self) -> u8 {
        if self.is_seq() {
            self.bits
        } else {
            b'-'
        }
    }

    fn add_count(&mut self, n: u8) {
        debug_assert!(self.is_gap());
        self.bits += n;
    }
}

/// Merge instructions produced while weaving two alignments together reuse
/// the same byte layout but give SEQ a run semantic: `count` expanded
/// positions are copied from the source alignment rather than one residue.
/// `state` selects which interpretation a consumer applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Seq,
    Gap,
}

fn needs_new_gap_instruction(instructions: &[Instruction]) -> bool {
    match instructions.last() {
        None => true,
        Some(ins) => ins.is_seq() || ins.is_full(),
    }
}

/// Extend `cigar` with `count` elements of `state`, coalescing with the tail
/// instruction while it has free capacity. SEQ runs here follow the merge
/// instruction semantics (see [`State`]).
pub fn append_states(cigar: &mut Vec<Instruction>, state: State, count: usize) {
    let mut remaining = count;
    while remaining > 0 {
        let tail_matches = match cigar.last() {
            Some(ins) => match state {
                State::Seq => ins.is_seq() && !ins_run_full(ins),
                State::Gap => ins.is_gap() && !ins.is_full(),
            },
            None => false,
        };
        if !tail_matches {
            match state {
                State::Seq => cigar.push(Instruction { bits: 0 }),
                State::Gap => cigar.push(Instruction { bits: STATE_BIT }),
            }
        }
        let tail = cigar.last_mut().unwrap();
        let space = (MAX_RUN - tail.count()) as usize;
        let taken = std::cmp::min(space, remaining);
        tail.bits += taken as u8;
        remaining -= taken;
    }
}

fn ins_run_full(ins: &Instruction) -> bool {
    ins.count() == MAX_RUN
}

/// Materialise the gapped string, `-` for every gap column.
pub fn expand(cigar: &[Instruction]) -> Vec<u8> {
    let mut result = Vec::with_capacity(cigar.len());
    for ins in cigar {
        if ins.is_seq() {
            result.push(ins.character());
        } else {
            result.extend(std::iter::repeat(b'-').take(ins.count() as usize));
        }
    }
    result
}

/// Inverse of [`expand`]: SEQ elements carry the residue character directly.
pub fn contract(sequence: &[u8]) -> Vec<Instruction> {
    let mut instructions: Vec<Instruction> = Vec::with_capacity(sequence.len());
    for &letter in sequence {
        if letter == 0 {
            break;
        }
        if letter == b'-' {
            if needs_new_gap_instruction(&instructions) {
                instructions.push(Instruction::new_gap(1));
            } else {
                instructions.last_mut().unwrap().add_count(1);
            }
        } else {
            instructions.push(Instruction::new_seq(letter));
        }
    }
    debug_assert_eq!(expand(&instructions), sequence);
    instructions
}

/// Number of residues, or columns when `with_gaps`, covered by a CIGAR.
pub fn cigar_length(cigar: &[Instruction], with_gaps: bool) -> usize {
    cigar
        .iter()
        .map(|ins| {
            if ins.is_seq() {
                1
            } else if with_gaps {
                ins.count() as usize
            } else {
                0
            }
        })
        .sum()
}

/// Append `n` gap columns to both channels in lock step.
pub fn add_gaps(n: usize, cigar_aa: &mut Vec<Instruction>, cigar_ss: &mut Vec<Instruction>) {
    let mut to_add = n;
    while to_add > 0 {
        if needs_new_gap_instruction(cigar_aa) {
            cigar_aa.push(Instruction::new_gap(0));
            cigar_ss.push(Instruction::new_gap(0));
        }
        let space = (MAX_RUN - cigar_aa.last().unwrap().count()) as usize;
        let taken = std::cmp::min(space, to_add);
        cigar_aa.last_mut().unwrap().add_count(taken as u8);
        cigar_ss.last_mut().unwrap().add_count(taken as u8);
        to_add -= taken;
    }
}

/// Read position inside a source CIGAR pair, tracking partially consumed gap
/// runs so a run can be split when fewer than its remaining columns are
/// requested.
#[derive(Debug, Clone, Copy, Default)]
pub struct CigarCursor {
    pub index: usize,
    consumed: u8,
}

/// Copy `n` expanded positions from the source CIGAR pair starting at
/// `cursor`, appending to the destination pair and advancing the cursor.
pub fn copy_residues(
    dst_aa: &mut Vec<Instruction>,
    dst_ss: &mut Vec<Instruction>,
    src_aa: &[Instruction],
    src_ss: &[Instruction],
    cursor: &mut CigarCursor,
    n: usize,
) {
    let mut to_add = n;
    while to_add > 0 {
        assert!(
            cursor.index < src_aa.len(),
            "CIGAR cursor ran past the source alignment"
        );
        let ins_aa = src_aa[cursor.index];
        let ins_ss = src_ss[cursor.index];
        if ins_aa.is_seq() {
            assert!(ins_ss.is_seq(), "AA/3Di channels out of register");
            dst_aa.push(ins_aa);
            dst_ss.push(ins_ss);
            cursor.index += 1;
            to_add -= 1;
        } else {
            debug_assert_eq!(ins_aa.count(), ins_ss.count());
            let remaining = (ins_aa.count() - cursor.consumed) as usize;
            let taken = std::cmp::min(remaining, to_add);
            add_gaps(taken, dst_aa, dst_ss);
            cursor.consumed += taken as u8;
            if cursor.consumed == ins_aa.count() {
                cursor.index += 1;
                cursor.consumed = 0;
            }
            to_add -= taken;
        }
    }
}

/// Return the indices of unmasked (`'0'`) columns: the ungapped-to-gapped
/// position map over masked columns.
pub fn mask_to_mapping(mask: &str) -> Vec<usize> {
    mask.bytes()
        .enumerate()
        .filter(|(_, c)| *c == b'0')
        .map(|(i, _)| i)
        .collect()
}

/**
 * Translate a pairwise backtrace into per-side merge instructions.
 *
 * `map1`/`map2` are the mask-to-gapped position maps of the query and target
 * alignments. Each M step spans `(dq, dt)` gapped columns since the previous
 * M; the expansion emits SEQ on the side that consumed residues and GAP of
 * width `max(dq,dt) - d_side` on the other, so both sides end up spanning the
 * same number of merged columns.
 */
pub fn get_merge_instructions(
    res: &AlignmentResult,
    map1: &[usize],
    map2: &[usize],
) -> (Vec<Instruction>, Vec<Instruction>) {
    let mut q_bt: Vec<Instruction> = Vec::new();
    let mut t_bt: Vec<Instruction> = Vec::new();
    if res.backtrace.is_empty() {
        return (q_bt, t_bt);
    }

    // first match
    append_states(&mut q_bt, State::Seq, 1);
    append_states(&mut t_bt, State::Seq, 1);

    let mut old_q = map1[res.q_start];
    let mut old_t = map2[res.db_start];
    let mut q = res.q_start + 1;
    let mut t = res.db_start + 1;

    for step in res.backtrace.bytes().skip(1) {
        match step {
            b'M' => {
                let new_q = map1[q];
                let new_t = map2[t];
                let dq = new_q - old_q;
                let dt = new_t - old_t;
                if dq == 0 {
                    // No matches in query
                    append_states(&mut q_bt, State::Gap, dt);
                    append_states(&mut t_bt, State::Seq, dt);
                } else if dq == 1 {
                    // One match in query
                    if dt > 1 {
                        append_states(&mut q_bt, State::Gap, dt - 1);
                    }
                    append_states(&mut q_bt, State::Seq, 1);
                    append_states(&mut t_bt, State::Seq, dt);
                } else if dq >= dt {
                    // More query matches than target
                    append_states(&mut q_bt, State::Seq, dq);
                    append_states(&mut t_bt, State::Gap, dq - dt);
                    append_states(&mut t_bt, State::Seq, dt);
                } else {
                    // More target than query
                    append_states(&mut q_bt, State::Gap, dt - dq);
                    append_states(&mut q_bt, State::Seq, dq);
                    append_states(&mut t_bt, State::Seq, dt);
                }
                old_q = new_q;
                old_t = new_t;
                q += 1;
                t += 1;
            }
            b'I' => {
                q += 1;
            }
            b'D' => {
                t += 1;
            }
            other => panic!("invalid backtrace step: {}", other as char),
        }
    }
    (q_bt, t_bt)
}

/// Rebuild a query-side CIGAR pair around a merge: leading gaps, leading
/// self-residues, the woven alignment, trailing self-residues, trailing gaps.
pub fn update_query_cigar(
    cigar_aa: &mut Vec<Instruction>,
    cigar_ss: &mut Vec<Instruction>,
    instructions: &[Instruction],
    pre_gap: usize,
    pre_sequence: usize,
    end_gap: usize,
    end_sequence: usize,
) {
    let mut cursor = CigarCursor::default();
    let mut aa: Vec<Instruction> = Vec::with_capacity(cigar_aa.len());
    let mut ss: Vec<Instruction> = Vec::with_capacity(cigar_ss.len());
    add_gaps(pre_gap, &mut aa, &mut ss);
    copy_residues(&mut aa, &mut ss, cigar_aa, cigar_ss, &mut cursor, pre_sequence);
    for ins in instructions {
        if ins.is_seq() {
            copy_residues(
                &mut aa,
                &mut ss,
                cigar_aa,
                cigar_ss,
                &mut cursor,
                ins.count() as usize,
            );
        } else {
            add_gaps(ins.count() as usize, &mut aa, &mut ss);
        }
    }
    copy_residues(&mut aa, &mut ss, cigar_aa, cigar_ss, &mut cursor, end_sequence);
    add_gaps(end_gap, &mut aa, &mut ss);
    *cigar_aa = aa;
    *cigar_ss = ss;
}

/// Target-side variant of [`update_query_cigar`]: residues come before the
/// leading gaps, and after the woven alignment the gaps come first.
pub fn update_target_cigar(
    cigar_aa: &mut Vec<Instruction>,
    cigar_ss: &mut Vec<Instruction>,
    instructions: &[Instruction],
    pre_gap: usize,
    pre_sequence: usize,
    end_gap: usize,
    end_sequence: usize,
) {
    let mut cursor = CigarCursor::default();
    let mut aa: Vec<Instruction> = Vec::with_capacity(cigar_aa.len());
    let mut ss: Vec<Instruction> = Vec::with_capacity(cigar_ss.len());
    copy_residues(&mut aa, &mut ss, cigar_aa, cigar_ss, &mut cursor, pre_sequence);
    add_gaps(pre_gap, &mut aa, &mut ss);
    for ins in instructions {
        if ins.is_seq() {
            copy_residues(
                &mut aa,
                &mut ss,
                cigar_aa,
                cigar_ss,
                &mut cursor,
                ins.count() as usize,
            );
        } else {
            add_gaps(ins.count() as usize, &mut aa, &mut ss);
        }
    }
    add_gaps(end_gap, &mut aa, &mut ss);
    copy_residues(&mut aa, &mut ss, cigar_aa, cigar_ss, &mut cursor, end_sequence);
    *cigar_aa = aa;
    *cigar_ss = ss;
}
