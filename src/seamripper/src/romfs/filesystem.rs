use std::collections::BTreeMap;

use byteorder::LittleEndian;

use crate::compress::{lzma_decode, LzmaEncode};
use crate::cursor::write_u32_at;
use crate::diag::{self, Warning};
use crate::error::{Error, Result};

use super::dir::DirBlock;
use super::{Endianness, Entry, Superblock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    Data,
}

/// One filesystem object, keyed by its entry uid.
///
/// Names and parents come from directory listings, everything else from the
/// entry table; a node referenced by a listing but missing from the table
/// (or the other way round) is simply left half-filled.
pub struct Node {
    pub name: Option<String>,
    pub parent: Option<u32>,
    pub kind: NodeKind,
    pub raw_type: u32,
    pub nlink: u32,
    pub size: u32,
    pub ctime: u32,
    pub offset: u32,
    pub size_decompressed: u32,
    new_data: Option<Vec<u8>>,
}

impl Node {
    fn new() -> Node {
        Node {
            name: None,
            parent: None,
            kind: NodeKind::Data,
            raw_type: 0,
            nlink: 0,
            size: 0,
            ctime: 0,
            offset: 0,
            size_decompressed: 0,
            new_data: None,
        }
    }

    /// Whether the node showed up in some directory listing and therefore
    /// has a reconstructible path.
    pub fn is_listed(&self) -> bool {
        self.name.is_some() && self.parent.is_some()
    }
}

/// The read-only filesystem image: superblock, entry table and file bodies.
///
/// Parsing builds a uid-indexed tree; content substitutions are staged on
/// the nodes and applied by [`RomFs::rebuild`], which re-places every body
/// on a 32-byte boundary and recompresses what changed.
pub struct RomFs {
    pub(crate) data: Vec<u8>,
    pub superblock: Superblock,
    pub entries: BTreeMap<u32, Node>,
    pub warnings: Vec<Warning>,
    encoder: Box<dyn LzmaEncode>,
}

impl RomFs {
    pub const ALIGNMENT: usize = 0x20;

    /// Substituted content at or below this size is stored raw.
    pub const MAX_NOTCOMPRESSED: usize = 512;

    /// Dictionary size exponent handed to the encoder for file bodies.
    const DICT_BITS: u32 = 19;

    pub fn new(
        data: Vec<u8>,
        endianness: Endianness,
        encoder: Box<dyn LzmaEncode>,
    ) -> Result<RomFs> {
        if endianness == Endianness::Big {
            return Err(Error::BigEndianUnsupported);
        }
        let superblock = Superblock::from(&data)?;
        let mut fs = RomFs {
            data,
            superblock,
            entries: BTreeMap::new(),
            warnings: Vec::new(),
            encoder,
        };
        fs.process_all_entries();
        if fs.entries.len() as u32 != fs.superblock.entry_count {
            fs.warnings.push(Warning::EntryCountMismatch {
                parsed: fs.entries.len() as u32,
                declared: fs.superblock.entry_count,
            });
        }
        diag::report_all(&fs.warnings);
        Ok(fs)
    }

    /// The image as currently held, superblock first.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn process_all_entries(&mut self) {
        let mut offset = Superblock::SIZE;
        for index in 0..self.superblock.entry_count {
            let entry = self
                .data
                .get(offset..offset + Entry::SIZE)
                .map(|slot| Entry::from(slot.try_into().unwrap()));
            let entry = match entry {
                Some(Ok(entry)) => entry,
                _ => {
                    self.warnings.push(Warning::UnreadableEntry { index });
                    break;
                }
            };

            if entry.offset < Entry::SIZE as u32 * (entry.uid + 1) {
                self.warnings.push(Warning::MisplacedEntryData { uid: entry.uid });
            }

            {
                let node = self.entries.entry(entry.uid).or_insert_with(Node::new);
                node.offset = entry.offset;
                node.size = entry.size;
                node.raw_type = entry.type_flags;
                node.size_decompressed = entry.size_decompressed;
                node.ctime = entry.ctime;
                node.nlink = entry.nlink;
                node.kind = if entry.is_directory() { NodeKind::Directory } else { NodeKind::Data };
                if entry.uid == 0 {
                    node.name = Some("/".to_string());
                }
            }

            if entry.is_directory() {
                let start = (entry.offset as usize).min(self.data.len());
                let end = (entry.offset as usize + entry.size as usize).min(self.data.len());
                let block = DirBlock::from(&self.data[start..end]);
                let parent_uid = block.own_uid.unwrap_or(entry.uid);
                for (child_uid, child_name) in block.children {
                    let child = self.entries.entry(child_uid).or_insert_with(Node::new);
                    if child.parent.is_some() {
                        // Hard link: tolerated, the first binding wins.
                        let kept = child.name.clone().unwrap_or_default();
                        self.warnings.push(Warning::AliasedUid {
                            uid: child_uid,
                            kept,
                            other: child_name,
                        });
                    } else {
                        child.parent = Some(parent_uid);
                        child.name = Some(child_name);
                    }
                }
            }

            offset += Entry::SIZE;
        }
    }

    /// Returns the stored bytes of an entry, decompressed on request.
    ///
    /// Decompression trouble is never fatal here: a body that does not
    /// inflate comes back raw with a warning, and an inflated length that
    /// disagrees with the entry's record is also just a warning.
    pub fn get_data(&self, uid: u32, decompress: bool) -> Result<Vec<u8>> {
        let node = self.entries.get(&uid).ok_or(Error::UnknownUid(uid))?;
        let start = (node.offset as usize).min(self.data.len());
        let end = (node.offset as usize + node.size as usize).min(self.data.len());
        let raw = self.data[start..end].to_vec();
        if !decompress {
            return Ok(raw);
        }
        match lzma_decode(&raw) {
            Ok(plain) => {
                if plain.len() != node.size_decompressed as usize {
                    diag::report(&Warning::DecompressedSizeMismatch {
                        uid,
                        got: plain.len(),
                        declared: node.size_decompressed,
                    });
                }
                Ok(plain)
            }
            Err(_) => {
                diag::report(&Warning::DecompressFailed { uid });
                Ok(raw)
            }
        }
    }

    /// Walks parent links back to the root and rebuilds an absolute path.
    ///
    /// `..` sequences are scrubbed rather than resolved; nothing ever
    /// dereferences them.
    pub fn path(&self, uid: u32) -> Option<String> {
        let mut path = self.entries.get(&uid)?.name.clone()?;
        let mut current = uid;
        let mut hops = 0;
        while current != 0 {
            current = self.entries.get(&current)?.parent?;
            let name = self.entries.get(&current)?.name.clone()?;
            path = if name == "/" { format!("/{}", path) } else { format!("{}/{}", name, path) };
            // a corrupt image could link in a circle
            hops += 1;
            if hops > self.entries.len() {
                return None;
            }
        }
        Some(path.replace("..", ""))
    }

    /// Stages `data` as the new content of the regular file at `path`.
    ///
    /// The substitution only lands in the image on the next
    /// [`RomFs::rebuild`].
    pub fn modify_file(&mut self, data: Vec<u8>, path: &str) -> Result<()> {
        let wanted = path.trim_matches('/');
        let mut found = None;
        for (&uid, node) in &self.entries {
            if !node.is_listed() {
                continue;
            }
            let Some(candidate) = self.path(uid) else { continue };
            if candidate.trim_matches('/') == wanted {
                if node.kind == NodeKind::Directory {
                    return Err(Error::AttemptedDirectoryModify(wanted.to_string()));
                }
                found = Some(uid);
                break;
            }
        }
        let uid = found.ok_or_else(|| Error::PathNotFound(wanted.to_string()))?;
        self.entries.get_mut(&uid).expect("uid found above").new_data = Some(data);
        Ok(())
    }

    /// Re-lays out the whole image and applies staged substitutions.
    ///
    /// Bodies are emitted in ascending uid order, each aligned to 32 bytes.
    /// Substituted content above [`RomFs::MAX_NOTCOMPRESSED`] bytes goes
    /// through the encoder; at or below it is stored raw. Untouched bodies
    /// are carried over verbatim from the old image, directories included
    /// (their record blocks are never recomputed, which is why structural
    /// edits are off the table). Growth past the superblock's `max_size`
    /// patches the superblock and warns.
    pub fn rebuild(&mut self) -> Result<Vec<Warning>> {
        let mut warnings = Vec::new();
        let table_end = Superblock::SIZE + self.superblock.entry_count as usize * Entry::SIZE;
        let uids: Vec<u32> = self.entries.keys().copied().collect();

        let mut body: Vec<u8> = Vec::new();
        let mut offset = table_end;
        for uid in uids {
            let rem = offset % Self::ALIGNMENT;
            if rem != 0 {
                let pad = Self::ALIGNMENT - rem;
                body.resize(body.len() + pad, 0);
                offset += pad;
            }

            let pending = self.entries.get_mut(&uid).expect("uid from key walk").new_data.take();
            let blob = match pending {
                Some(new_data) => {
                    if new_data.len() > Self::MAX_NOTCOMPRESSED {
                        let packed = self.encoder.encode(&new_data, Self::DICT_BITS)?;
                        self.node_mut(uid).size_decompressed = new_data.len() as u32;
                        packed
                    } else {
                        self.node_mut(uid).size_decompressed = 0;
                        new_data
                    }
                }
                None => self.get_data(uid, false)?,
            };

            let node = self.node_mut(uid);
            node.size = blob.len() as u32;
            node.offset = offset as u32;
            self.patch_entry(uid, &mut warnings);

            offset += blob.len();
            body.extend_from_slice(&blob);
        }

        let mut total = table_end + body.len();
        if total % Self::ALIGNMENT != 0 {
            total += Self::ALIGNMENT - total % Self::ALIGNMENT;
        }
        if total as u32 > self.superblock.max_size {
            warnings.push(Warning::MaxSizeGrown { new_size: total as u32 });
            self.superblock.max_size = total as u32;
            write_u32_at::<LittleEndian>(
                &mut self.data,
                Superblock::MAX_SIZE_OFFSET,
                total as u32,
            )?;
        }

        self.data.truncate(table_end);
        self.data.extend_from_slice(&body);
        self.data.resize(total, 0);

        diag::report_all(&warnings);
        Ok(warnings)
    }

    fn node_mut(&mut self, uid: u32) -> &mut Node {
        self.entries.get_mut(&uid).expect("uid from key walk")
    }

    /// Re-reads the entry record behind `uid` and writes the node's current
    /// size, offset and decompressed size back into it.
    fn patch_entry(&mut self, uid: u32, warnings: &mut Vec<Warning>) {
        let node = &self.entries[&uid];
        let (size, offset, size_decompressed) = (node.size, node.offset, node.size_decompressed);

        let start = Superblock::SIZE + uid as usize * Entry::SIZE;
        let Some(slot) = self.data.get_mut(start..start + Entry::SIZE) else {
            warnings.push(Warning::UnreadableEntry { index: uid });
            return;
        };
        let slot: &mut [u8; Entry::SIZE] = slot.try_into().unwrap();
        let mut entry = match Entry::from(slot) {
            Ok(entry) => entry,
            Err(_) => {
                warnings.push(Warning::UnreadableEntry { index: uid });
                return;
            }
        };
        if entry.uid != uid {
            warnings.push(Warning::EntryUidMismatch { slot: uid, uid: entry.uid });
        }
        entry.size = size;
        entry.offset = offset;
        entry.size_decompressed = size_decompressed;
        entry.patch(slot);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::compress::InProcessEncoder;

    pub fn dir_record(uid: u32, name: &str) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&uid.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 4]);
        bytes.extend_from_slice(name.as_bytes());
        bytes.push(0);
        while bytes.len() % RomFs::ALIGNMENT != 0 {
            bytes.push(0);
        }
        bytes
    }

    pub fn entry_record(
        type_flags: u32,
        size: u32,
        offset: u32,
        size_decompressed: u32,
        uid: u32,
    ) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&type_flags.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes()); // nlink
        bytes.extend_from_slice(&[0u8; 4]); // uid/gid
        bytes.extend_from_slice(&size.to_le_bytes());
        bytes.extend_from_slice(&1_600_000_000u32.to_le_bytes());
        bytes.extend_from_slice(&offset.to_le_bytes());
        bytes.extend_from_slice(&size_decompressed.to_le_bytes());
        bytes.extend_from_slice(format!("{:04}", uid).as_bytes());
        bytes
    }

    /// Five entries: `/` with `a/`, `b/` and `notes.txt`, where both `a`
    /// and `b` list the same uid 3 as `three` (a hard link).
    pub fn sample_image(max_size: u32) -> Vec<u8> {
        let root_block: Vec<u8> = [
            dir_record(0, "."),
            dir_record(0, ".."),
            dir_record(1, "a"),
            dir_record(2, "b"),
            dir_record(4, "notes.txt"),
        ]
        .concat();
        let a_block: Vec<u8> =
            [dir_record(1, "."), dir_record(0, ".."), dir_record(3, "three")].concat();
        let b_block: Vec<u8> =
            [dir_record(2, "."), dir_record(0, ".."), dir_record(3, "three")].concat();
        let three = b"three-content!!";
        let notes = b"hello notes";

        let mut image = Vec::new();
        image.extend_from_slice(&0x2f52_4f4du32.to_le_bytes());
        image.extend_from_slice(&5u32.to_le_bytes());
        image.extend_from_slice(&max_size.to_le_bytes());
        image.extend_from_slice(&0x0102_0304u32.to_le_bytes());
        image.extend_from_slice(b"sample-signature");
        assert_eq!(image.len(), Superblock::SIZE);

        image.extend(entry_record(Entry::DIR_STRUCT_MASK, root_block.len() as u32, 0xc0, 0, 0));
        image.extend(entry_record(Entry::DIR_STRUCT_MASK, a_block.len() as u32, 0x160, 0, 1));
        image.extend(entry_record(Entry::DIR_STRUCT_MASK, b_block.len() as u32, 0x1c0, 0, 2));
        image.extend(entry_record(Entry::DATA_MASK, three.len() as u32, 0x220, 0, 3));
        image.extend(entry_record(Entry::DATA_MASK, notes.len() as u32, 0x240, 0, 4));
        assert_eq!(image.len(), 0xc0);

        image.extend_from_slice(&root_block);
        assert_eq!(image.len(), 0x160);
        image.extend_from_slice(&a_block);
        assert_eq!(image.len(), 0x1c0);
        image.extend_from_slice(&b_block);
        assert_eq!(image.len(), 0x220);
        image.extend_from_slice(three);
        image.resize(0x240, 0);
        image.extend_from_slice(notes);
        image.resize(0x260, 0);
        image
    }

    pub fn parse(image: Vec<u8>) -> RomFs {
        RomFs::new(image, Endianness::Little, Box::new(InProcessEncoder)).unwrap()
    }

    #[test]
    fn parse_builds_the_tree() {
        let fs = parse(sample_image(0x1000));
        assert_eq!(fs.entries.len(), 5);
        assert_eq!(fs.path(0).as_deref(), Some("/"));
        assert_eq!(fs.path(3).as_deref(), Some("/a/three"));
        assert_eq!(fs.path(4).as_deref(), Some("/notes.txt"));
        assert_eq!(fs.entries[&1].kind, NodeKind::Directory);
        assert_eq!(fs.entries[&3].kind, NodeKind::Data);
        assert_eq!(fs.entries[&3].parent, Some(1));
        // uid 3 appears under both a/ and b/; the first binding wins
        assert!(fs
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::AliasedUid { uid: 3, .. })));
    }

    #[test]
    fn get_data_reads_raw_bodies() {
        let fs = parse(sample_image(0x1000));
        assert_eq!(fs.get_data(3, false).unwrap(), b"three-content!!");
        assert!(matches!(fs.get_data(99, false), Err(Error::UnknownUid(99))));
    }

    #[test]
    fn big_endian_images_are_declined() {
        let result = RomFs::new(
            sample_image(0x1000),
            Endianness::Big,
            Box::new(InProcessEncoder),
        );
        assert!(matches!(result, Err(Error::BigEndianUnsupported)));
    }

    #[test]
    fn modify_rejects_directories_and_unknown_paths() {
        let mut fs = parse(sample_image(0x1000));
        assert!(matches!(
            fs.modify_file(b"x".to_vec(), "a"),
            Err(Error::AttemptedDirectoryModify(_))
        ));
        assert!(matches!(
            fs.modify_file(b"x".to_vec(), "a/missing"),
            Err(Error::PathNotFound(_))
        ));
    }

    #[test]
    fn rebuild_without_changes_is_an_identity_on_content() {
        let mut fs = parse(sample_image(0x1000));
        let before: Vec<Vec<u8>> =
            (0..5).map(|uid| fs.get_data(uid, false).unwrap()).collect();
        let warnings = fs.rebuild().unwrap();
        assert!(warnings.is_empty());

        let reparsed = parse(fs.as_bytes().to_vec());
        for uid in 0..5 {
            assert_eq!(reparsed.get_data(uid, false).unwrap(), before[uid as usize]);
            assert_eq!(reparsed.entries[&uid].offset % 32, 0);
        }
        assert_eq!(fs.as_bytes().len() % 32, 0);
        assert!(reparsed.superblock.max_size as usize >= fs.as_bytes().len());
        assert_eq!(reparsed.path(3).as_deref(), Some("/a/three"));
    }

    #[test]
    fn small_substitution_is_stored_raw_and_aliases_survive() {
        let mut fs = parse(sample_image(0x1000));
        fs.modify_file(b"X".to_vec(), "a/three").unwrap();
        fs.rebuild().unwrap();

        let reparsed = parse(fs.as_bytes().to_vec());
        assert_eq!(reparsed.get_data(3, false).unwrap(), b"X");
        assert_eq!(reparsed.entries[&3].size_decompressed, 0);
        // the second listing still points at the same uid, hence the same bytes
        let b_listing = reparsed.get_data(2, false).unwrap();
        let block = DirBlock::from(&b_listing);
        assert_eq!(block.children, vec![(3, "three".to_string())]);
    }

    #[test]
    fn large_substitution_is_compressed() {
        let content = b"abcdefgh".repeat(75); // 600 bytes
        let mut fs = parse(sample_image(0x1000));
        fs.modify_file(content.clone(), "notes.txt").unwrap();
        fs.rebuild().unwrap();

        let reparsed = parse(fs.as_bytes().to_vec());
        assert_eq!(reparsed.entries[&4].size_decompressed, 600);
        assert_ne!(reparsed.get_data(4, false).unwrap(), content);
        assert_eq!(reparsed.get_data(4, true).unwrap(), content);
    }

    #[test]
    fn threshold_substitution_stays_raw() {
        let content = vec![0x41u8; 400];
        let mut fs = parse(sample_image(0x1000));
        fs.modify_file(content.clone(), "/notes.txt").unwrap();
        fs.rebuild().unwrap();

        let reparsed = parse(fs.as_bytes().to_vec());
        assert_eq!(reparsed.entries[&4].size_decompressed, 0);
        assert_eq!(reparsed.get_data(4, false).unwrap(), content);
    }

    #[test]
    fn growth_past_max_size_patches_the_superblock() {
        // incompressible content so even the encoded body forces growth
        let content: Vec<u8> = (0..900u32).map(|i| (i * 31 + 7) as u8).collect();
        let mut fs = parse(sample_image(0x260));
        fs.modify_file(content, "notes.txt").unwrap();
        let warnings = fs.rebuild().unwrap();

        let total = fs.as_bytes().len() as u32;
        assert_eq!(total % 32, 0);
        assert!(warnings.contains(&Warning::MaxSizeGrown { new_size: total }));
        assert_eq!(fs.superblock.max_size, total);
        let stored = u32::from_le_bytes(fs.as_bytes()[0x8..0xc].try_into().unwrap());
        assert_eq!(stored, total);
    }

    #[test]
    fn compressed_bodies_round_trip_through_get_data() {
        let plain = b"configuration file contents ".repeat(40);
        let packed = InProcessEncoder.encode(&plain, 19).unwrap();

        let mut image = sample_image(0x1000);
        let offset = image.len() as u32;
        // splice a compressed body in as uid 4's content
        let slot = Superblock::SIZE + 4 * Entry::SIZE;
        image[slot + 0xc..slot + 0x10].copy_from_slice(&(packed.len() as u32).to_le_bytes());
        image[slot + 0x14..slot + 0x18].copy_from_slice(&offset.to_le_bytes());
        image[slot + 0x18..slot + 0x1c].copy_from_slice(&(plain.len() as u32).to_le_bytes());
        image.extend_from_slice(&packed);

        let fs = parse(image);
        assert_eq!(fs.get_data(4, true).unwrap(), plain);
        assert_eq!(fs.get_data(4, false).unwrap(), packed);
    }

    #[test]
    fn entry_data_inside_the_table_region_is_flagged() {
        let mut image = sample_image(0x1000);
        let slot = Superblock::SIZE + 4 * Entry::SIZE;
        image[slot + 0x14..slot + 0x18].copy_from_slice(&0x40u32.to_le_bytes());
        let fs = parse(image);
        assert!(fs
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::MisplacedEntryData { uid: 4 })));
    }
}
