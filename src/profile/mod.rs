pub mod filter;
pub mod pssm;
pub mod weights;
