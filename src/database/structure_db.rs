use std::path::Path;

use crate::database::coordinates::decode_coordinates;
use crate::database::db_reader::{DbReader, Lookup};
use crate::utils::errors::WeaverError;

/**
 * The three parallel indexed stores a structure database consists of, plus
 * headers and the accession lookup: `<db>` (amino acids), `<db>_ss` (3Di),
 * `<db>_ca` (Cα coordinates) and `<db>_h` (display headers), all keyed by
 * the same integer database key.
 */
pub struct StructureDb {
    pub aa: DbReader,
    pub ss: DbReader,
    pub ca: DbReader,
    pub headers: DbReader,
    pub lookup: Option<Lookup>,
}

impl StructureDb {
    pub fn open(prefix: &str) -> Result<Self, WeaverError> {
        let aa = DbReader::open(prefix.to_string(), format!("{}.index", prefix))?;
        let ss = DbReader::open(format!("{}_ss", prefix), format!("{}_ss.index", prefix))?;
        let ca = DbReader::open(format!("{}_ca", prefix), format!("{}_ca.index", prefix))?;
        let headers = DbReader::open(format!("{}_h", prefix), format!("{}_h.index", prefix))?;
        let lookup_path = format!("{}.lookup", prefix);
        let lookup = if Path::new(&lookup_path).exists() {
            Some(Lookup::open(lookup_path)?)
        } else {
            None
        };
        debug!(
            "Opened structure database {} with {} entries",
            prefix,
            aa.size()
        );
        Ok(StructureDb {
            aa,
            ss,
            ca,
            headers,
            lookup,
        })
    }

    pub fn size(&self) -> usize {
        self.aa.size()
    }

    /// Display name for a database key: the first whitespace-delimited token
    /// of its header entry.
    pub fn header(&self, key: u32) -> String {
        match self.headers.id_of_key(key) {
            Some(id) => {
                let raw = self.headers.seq(id);
                let token: Vec<u8> = raw
                    .iter()
                    .take_while(|c| !c.is_ascii_whitespace())
                    .cloned()
                    .collect();
                String::from_utf8_lossy(&token).into_owned()
            }
            None => format!("{}", key),
        }
    }

    /// Resolve a display name back to a database key, via the lookup file
    /// when present, scanning headers otherwise.
    pub fn key_by_name(&self, name: &str) -> Option<u32> {
        if let Some(lookup) = &self.lookup {
            if let Some(key) = lookup.key_of_name(name) {
                return Some(key);
            }
        }
        (0..self.headers.size())
            .map(|id| self.headers.db_key(id))
            .find(|&key| self.header(key) == name)
    }

    /// Decode the Cα block of a structure.
    pub fn ca_coords(&self, key: u32, length: usize) -> Result<Vec<[f32; 3]>, WeaverError> {
        let id = self.ca.id_of_key(key).ok_or_else(|| {
            WeaverError::DatabaseFormat(format!("no coordinate entry for key {}", key))
        })?;
        decode_coordinates(self.ca.data(id), length)
    }
}
