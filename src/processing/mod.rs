pub mod msa_engine;
