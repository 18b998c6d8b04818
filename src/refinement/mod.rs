pub mod refinement_engine;
