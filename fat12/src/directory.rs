// Root directory entries and 8.3 filename handling
// Entries are 32 bytes, allocated first-free-slot and never rewritten:
// this encoder has no delete or update, so a 0x00 first byte is the only
// free marker that matters.

use floppygen_core::BuildError;

use crate::geometry::Geometry;

pub const DIR_ENTRY_SIZE: usize = 32;

// Field offsets within a directory entry
const ENTRY_NAME: usize = 0x00;
const ENTRY_ATTR: usize = 0x0B;
const ENTRY_START_CLUSTER: usize = 0x1A;
const ENTRY_FILE_SIZE: usize = 0x1C;

/// Directory entry attributes.
pub mod attributes {
    pub const ATTR_READ_ONLY: u8 = 0x01;
    pub const ATTR_HIDDEN: u8 = 0x02;
    pub const ATTR_SYSTEM: u8 = 0x04;
    pub const ATTR_VOLUME_ID: u8 = 0x08;
    pub const ATTR_DIRECTORY: u8 = 0x10;
    pub const ATTR_ARCHIVE: u8 = 0x20;
}

/// Normalize a filename to the fixed-width 8.3 form: uppercase, split on
/// the last dot, base space-padded to 8 bytes, extension to 3.
///
/// Deliberately lenient: overlong parts are truncated and no character
/// validation is done, so any input name produces an entry. Callers that
/// care about collisions after truncation must check themselves.
pub fn format_83_name(filename: &str) -> [u8; 11] {
    let mut result = [0x20u8; 11]; // space-padded

    let upper = filename.to_uppercase();
    let (base, ext) = match upper.rfind('.') {
        Some(pos) => (&upper[..pos], &upper[pos + 1..]),
        None => (upper.as_str(), ""),
    };

    for (i, byte) in base.bytes().enumerate().take(8) {
        result[i] = byte;
    }
    for (i, byte) in ext.bytes().enumerate().take(3) {
        result[8 + i] = byte;
    }

    result
}

/// Render an 8.3 name field back to `BASE.EXT` form. Used when verifying
/// a finished image.
pub fn parse_83_name(name: &[u8; 11]) -> String {
    let mut result = String::new();

    for &byte in &name[0..8] {
        if byte == 0x20 || byte == 0x00 {
            break;
        }
        result.push(byte as char);
    }

    let ext_start = result.len();
    for &byte in &name[8..11] {
        if byte != 0x20 && byte != 0x00 {
            if result.len() == ext_start {
                result.push('.');
            }
            result.push(byte as char);
        }
    }

    result
}

/// Find the first free root directory slot (first byte 0x00).
pub fn find_free_entry(image: &[u8], geometry: &Geometry) -> Result<usize, BuildError> {
    let start = geometry.root_dir_start();
    for slot in 0..geometry.root_entries as usize {
        if image[start + slot * DIR_ENTRY_SIZE] == 0x00 {
            return Ok(slot);
        }
    }
    Err(BuildError::DirectoryFull)
}

/// Pack a 32-byte directory entry into `slot`. Reserved, time and date
/// fields are zero; the encoder records no timestamps.
pub fn write_dir_entry(
    image: &mut [u8],
    geometry: &Geometry,
    slot: usize,
    name: &[u8; 11],
    attr: u8,
    start_cluster: u16,
    size: u32,
) -> Result<(), BuildError> {
    if slot >= geometry.root_entries as usize {
        return Err(BuildError::InvalidInput(format!(
            "directory slot {} out of range (root holds {} entries)",
            slot, geometry.root_entries
        )));
    }

    let offset = geometry.root_dir_start() + slot * DIR_ENTRY_SIZE;
    let entry = &mut image[offset..offset + DIR_ENTRY_SIZE];
    entry.fill(0);

    entry[ENTRY_NAME..ENTRY_NAME + 11].copy_from_slice(name);
    entry[ENTRY_ATTR] = attr;
    entry[ENTRY_START_CLUSTER..ENTRY_START_CLUSTER + 2]
        .copy_from_slice(&start_cluster.to_le_bytes());
    entry[ENTRY_FILE_SIZE..ENTRY_FILE_SIZE + 4].copy_from_slice(&size.to_le_bytes());

    Ok(())
}

/// Decode the directory entry at `slot`: (name, attr, start cluster, size).
/// Returns None for a free slot. Used when verifying a finished image.
pub fn read_dir_entry(
    image: &[u8],
    geometry: &Geometry,
    slot: usize,
) -> Option<(String, u8, u16, u32)> {
    let offset = geometry.root_dir_start() + slot * DIR_ENTRY_SIZE;
    let entry = &image[offset..offset + DIR_ENTRY_SIZE];
    if entry[0] == 0x00 {
        return None;
    }

    let mut name = [0u8; 11];
    name.copy_from_slice(&entry[ENTRY_NAME..ENTRY_NAME + 11]);
    let attr = entry[ENTRY_ATTR];
    let start_cluster =
        u16::from_le_bytes([entry[ENTRY_START_CLUSTER], entry[ENTRY_START_CLUSTER + 1]]);
    let size = u32::from_le_bytes([
        entry[ENTRY_FILE_SIZE],
        entry[ENTRY_FILE_SIZE + 1],
        entry[ENTRY_FILE_SIZE + 2],
        entry[ENTRY_FILE_SIZE + 3],
    ]);

    Some((parse_83_name(&name), attr, start_cluster, size))
}
