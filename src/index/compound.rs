//! Compound segment files.
//!
//! A compound file packs the part files of one segment into a single
//! structured file: a table of `(extension, length)` entries followed by the
//! part bytes in table order. Each packed part keeps its own header and
//! checksum.

use std::collections::HashMap;
use std::io::Read;

use crate::error::{CrawldexError, Result};
use crate::storage::Storage;
use crate::storage::structured::{StructReader, StructWriter};

/// Magic number of compound files ("CDXC").
pub const COMPOUND_MAGIC: u32 = 0x4344_5843;

/// Compound file format version.
pub const COMPOUND_VERSION: u32 = 1;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Pack `parts` (extension, file name) into a new compound file `output_name`.
///
/// The source files are left in place. Returns the compound file length.
pub fn write_compound(
    storage: &dyn Storage,
    output_name: &str,
    parts: &[(&str, String)],
) -> Result<u64> {
    let mut writer = StructWriter::new(storage.create_output(output_name)?);
    writer.write_header(COMPOUND_MAGIC, COMPOUND_VERSION)?;

    writer.write_varint(parts.len() as u64)?;
    for (ext, file_name) in parts {
        writer.write_string(ext)?;
        writer.write_varint(storage.file_size(file_name)?)?;
    }

    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    for (_, file_name) in parts {
        let mut input = storage.open_input(file_name)?;
        loop {
            let n = input.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            writer.write_raw(&buffer[..n])?;
        }
    }

    writer.close()
}

/// The parts of a compound file, loaded and checksum-verified.
#[derive(Debug)]
pub struct CompoundReader {
    name: String,
    parts: HashMap<String, Vec<u8>>,
}

impl CompoundReader {
    /// Load and verify the compound file `name`.
    pub fn open(storage: &dyn Storage, name: &str) -> Result<Self> {
        let mut reader = StructReader::new(storage.open_input(name)?)?;
        reader.read_header(COMPOUND_MAGIC, COMPOUND_VERSION)?;

        let count = reader.read_varint()? as usize;
        let mut table = Vec::with_capacity(count.min(16));
        for _ in 0..count {
            let ext = reader.read_string()?;
            let length = reader.read_varint()?;
            table.push((ext, length));
        }

        let mut parts = HashMap::with_capacity(table.len());
        for (ext, length) in table {
            let bytes = reader.read_raw(length as usize)?;
            if parts.insert(ext.clone(), bytes).is_some() {
                return Err(CrawldexError::corrupt(format!(
                    "Duplicate part '{ext}' in compound file {name}"
                )));
            }
        }
        reader.verify_checksum()?;

        Ok(CompoundReader {
            name: name.to_string(),
            parts,
        })
    }

    /// Remove and return the bytes of the part with extension `ext`.
    pub fn take_part(&mut self, ext: &str) -> Result<Vec<u8>> {
        self.parts.remove(ext).ok_or_else(|| {
            CrawldexError::corrupt(format!("Compound file {} has no '{ext}' part", self.name))
        })
    }

    /// Extensions of the parts not taken yet, sorted.
    pub fn part_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.parts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
