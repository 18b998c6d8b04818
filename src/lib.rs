#![allow(clippy::too_many_arguments)]

#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;

pub mod alignment;
pub mod cli;
pub mod database;
pub mod merge;
pub mod processing;
pub mod profile;
pub mod refinement;
pub mod scoring;
pub mod tree;
pub mod utils;

/// Alphabet size shared by the amino-acid and 3Di channels: twenty letters
/// plus the unknown residue X.
pub const ALPHABET_SIZE: usize = 21;

/// Number of real (non-X) residue types used for profiles.
pub const PROFILE_AA_SIZE: usize = 20;
