//! Builder for the sealpac translation table.
//!
//! The device's localization layer looks translations up by the MD5 of the
//! source string, against a table stored on flash. Everything here is
//! big-endian.
//!
//! # Layout
//!
//! | Offset | Size | Field    | Description |
//! | ------ | ---- | -------- | ----------- |
//! | 0x00   | 4    | Magic    | `0x05EA19AC`. |
//! | 0x04   | 4    | Count    | Number of entries. |
//! | 0x08   | 8    | Reserved | Zero. |
//! | 0x10   | 16   | LangCode | NUL-padded language code. |
//! | 0x20   | 16   | MD5      | Digest of everything after the header. |
//! | 0x30   | 20·n | Entries  | Per entry: key MD5 (16) + absolute string offset (4), sorted by MD5. |
//! | ...    | ...  | Strings  | NUL-terminated translations in entry order. |

use std::collections::BTreeMap;

use byteorder::{BigEndian, ByteOrder};
use md5::{Digest, Md5};

pub const MAGIC: u32 = 0x05ea_19ac;
pub const HEADER_SIZE: usize = 0x30;
pub const ENTRY_SIZE: usize = 0x14;

/// Assembles a table from already-hashed keys.
///
/// The `BTreeMap` key order is the required table order: ascending by MD5.
pub fn generate_from_hashed(entries: &BTreeMap<[u8; 16], Vec<u8>>, langcode: &[u8]) -> Vec<u8> {
    let mut table = Vec::new();
    let mut strings = Vec::new();
    let mut offset = HEADER_SIZE + entries.len() * ENTRY_SIZE;
    for (md5, translation) in entries {
        table.extend_from_slice(md5);
        let mut word = [0u8; 4];
        BigEndian::write_u32(&mut word, offset as u32);
        table.extend_from_slice(&word);
        strings.extend_from_slice(translation);
        strings.push(0);
        offset += translation.len() + 1;
    }

    let mut out = Vec::with_capacity(offset);
    let mut word = [0u8; 4];
    BigEndian::write_u32(&mut word, MAGIC);
    out.extend_from_slice(&word);
    BigEndian::write_u32(&mut word, entries.len() as u32);
    out.extend_from_slice(&word);
    out.extend_from_slice(&[0u8; 8]);

    let mut code = [0u8; 16];
    let len = langcode.len().min(15);
    code[..len].copy_from_slice(&langcode[..len]);
    out.extend_from_slice(&code);

    let mut hasher = Md5::new();
    hasher.update(&table);
    hasher.update(&strings);
    let digest: [u8; 16] = hasher.finalize().into();
    out.extend_from_slice(&digest);

    out.extend_from_slice(&table);
    out.extend_from_slice(&strings);
    out
}

/// Hashes plain UTF-8 keys and assembles the table.
pub fn generate<'a>(
    dictionary: impl IntoIterator<Item = (&'a str, &'a str)>,
    langcode: &[u8],
) -> Vec<u8> {
    let hashed: BTreeMap<[u8; 16], Vec<u8>> = dictionary
        .into_iter()
        .map(|(original, translation)| {
            let digest: [u8; 16] = Md5::digest(original.as_bytes()).into();
            (digest, translation.as_bytes().to_vec())
        })
        .collect();
    generate_from_hashed(&hashed, langcode)
}
