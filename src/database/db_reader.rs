use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::utils::errors::WeaverError;

/// One record of a flat indexed store.
#[derive(Debug, Clone, Copy)]
pub struct DbEntry {
    pub key: u32,
    pub offset: usize,
    pub length: usize,
}

/**
 * Reader for a flat database: a data file of NUL-terminated entries plus a
 * `.index` side file of `key \t offset \t length` lines. Entries are loaded
 * into memory once and served as slices; internal ids follow index order.
 */
pub struct DbReader {
    data: Vec<u8>,
    entries: Vec<DbEntry>,
    key_to_id: HashMap<u32, usize>,
}

impl DbReader {
    pub fn open<P: AsRef<Path>>(data_path: P, index_path: P) -> Result<Self, WeaverError> {
        let data = fs::read(&data_path).map_err(|e| {
            WeaverError::Io(format!(
                "failed to read {}: {}",
                data_path.as_ref().display(),
                e
            ))
        })?;
        let index_text = fs::read_to_string(&index_path).map_err(|e| {
            WeaverError::Io(format!(
                "failed to read {}: {}",
                index_path.as_ref().display(),
                e
            ))
        })?;

        let mut entries = Vec::new();
        let mut key_to_id = HashMap::new();
        for (line_no, line) in index_text.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split('\t');
            let parse = |field: Option<&str>| -> Result<usize, WeaverError> {
                field
                    .and_then(|f| f.trim().parse::<usize>().ok())
                    .ok_or_else(|| {
                        WeaverError::DatabaseFormat(format!(
                            "{}:{}: malformed index line",
                            index_path.as_ref().display(),
                            line_no + 1
                        ))
                    })
            };
            let key = parse(fields.next())? as u32;
            let offset = parse(fields.next())?;
            let length = parse(fields.next())?;
            if offset + length > data.len() {
                return Err(WeaverError::DatabaseFormat(format!(
                    "{}: entry {} points past end of data",
                    index_path.as_ref().display(),
                    key
                )));
            }
            key_to_id.insert(key, entries.len());
            entries.push(DbEntry {
                key,
                offset,
                length,
            });
        }

        Ok(DbReader {
            data,
            entries,
            key_to_id,
        })
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn db_key(&self, id: usize) -> u32 {
        self.entries[id].key
    }

    pub fn id_of_key(&self, key: u32) -> Option<usize> {
        self.key_to_id.get(&key).copied()
    }

    /// Raw entry bytes including any trailing newline/NUL.
    pub fn data(&self, id: usize) -> &[u8] {
        let entry = self.entries[id];
        &self.data[entry.offset..entry.offset + entry.length]
    }

    /// Entry bytes with trailing newline and NUL terminators stripped.
    pub fn seq(&self, id: usize) -> &[u8] {
        let mut bytes = self.data(id);
        while let Some((&last, rest)) = bytes.split_last() {
            if last == 0 || last == b'\n' {
                bytes = rest;
            } else {
                break;
            }
        }
        bytes
    }

    /// Residue count of a sequence entry (`entry length - 2`, the newline
    /// and NUL terminator).
    pub fn seq_len(&self, id: usize) -> usize {
        self.entries[id].length.saturating_sub(2)
    }
}

/// Accession-to-key lookup parsed from a `.lookup` side file of
/// `key \t accession \t file` lines.
pub struct Lookup {
    name_to_key: HashMap<String, u32>,
    key_to_name: HashMap<u32, String>,
}

impl Lookup {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, WeaverError> {
        let text = fs::read_to_string(&path).map_err(|e| {
            WeaverError::Io(format!("failed to read {}: {}", path.as_ref().display(), e))
        })?;
        let mut name_to_key = HashMap::new();
        let mut key_to_name = HashMap::new();
        for line in text.lines() {
            let mut fields = line.split('\t');
            let key = match fields.next().and_then(|f| f.trim().parse::<u32>().ok()) {
                Some(k) => k,
                None => continue,
            };
            if let Some(name) = fields.next() {
                name_to_key.insert(name.trim().to_string(), key);
                key_to_name.insert(key, name.trim().to_string());
            }
        }
        Ok(Lookup {
            name_to_key,
            key_to_name,
        })
    }

    pub fn key_of_name(&self, name: &str) -> Option<u32> {
        self.name_to_key.get(name).copied()
    }

    pub fn name_of_key(&self, key: u32) -> Option<&str> {
        self.key_to_name.get(&key).map(|s| s.as_str())
    }
}
