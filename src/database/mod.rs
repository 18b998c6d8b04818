pub mod coordinates;
pub mod db_reader;
pub mod structure_db;
