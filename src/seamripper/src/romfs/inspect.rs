use super::{NodeKind, RomFs};

/// Printing probes backing the shell's `i` command. Each prints its findings
/// to stdout and returns the interesting number for programmatic use.
impl RomFs {
    /// Largest raw body and smallest compressed body across regular files,
    /// bracketing the compression threshold the image was built with.
    pub fn inspect_compression_threshold(&self) -> (u32, Option<u32>) {
        let mut max_notcompressed = 0;
        let mut min_compressed: Option<u32> = None;
        for (&uid, node) in &self.entries {
            if !node.is_listed() {
                continue;
            }
            if node.kind != NodeKind::Directory {
                if node.size_decompressed == 0 {
                    max_notcompressed = max_notcompressed.max(node.size);
                } else {
                    min_compressed = Some(match min_compressed {
                        Some(current) => current.min(node.size_decompressed),
                        None => node.size_decompressed,
                    });
                }
            } else if node.size_decompressed != 0 {
                let path = self.path(uid).unwrap_or_default();
                println!("Compressed directory: {}", path.trim_matches('/'));
            }
        }
        (max_notcompressed, min_compressed)
    }

    /// Walks bodies in offset order, reporting overlaps and gaps.
    ///
    /// Gap content is summarized: a run of one repeated byte prints as
    /// "`n` times 0xHH", anything else as a literal dump. Returns the
    /// largest gap seen.
    pub fn inspect_data_layout(&self) -> usize {
        let mut layout: Vec<(u32, u32, u32, String)> = self
            .entries
            .iter()
            .map(|(&uid, node)| {
                let path = if node.is_listed() {
                    self.path(uid).unwrap_or_default().trim_matches('/').to_string()
                } else {
                    String::new()
                };
                (node.offset, node.size, uid, path)
            })
            .collect();
        layout.sort();

        let mut max_gapsize = 0;
        for pair in layout.windows(2) {
            let (prev_offset, prev_size, prev_uid, prev_path) = &pair[0];
            let (offset, _, uid, path) = &pair[1];
            let prev_end = (prev_offset + prev_size) as usize;
            if prev_end > *offset as usize {
                println!("{} {} and {} {} overlap!", prev_uid, prev_path, uid, path);
            } else if prev_end < *offset as usize {
                let gapsize = *offset as usize - prev_end;
                let gap = &self.data[prev_end.min(self.data.len())
                    ..(prev_end + gapsize).min(self.data.len())];
                let value = match gap {
                    [first, rest @ ..] if rest.iter().all(|b| b == first) => {
                        format!("{} times {:#04x}", gapsize, first)
                    }
                    _ => format!("{:02x?}", gap),
                };
                println!(
                    "{} bytes gap between {} {} and {} {} at offset {:#x} ({})",
                    gapsize, prev_uid, prev_path, uid, path, prev_end, value
                );
                max_gapsize = max_gapsize.max(gapsize);
            }
        }

        if let Some((offset, size, uid, path)) = layout.last() {
            let end = (offset + size) as usize;
            if end > self.data.len() {
                println!("{} {} data after end of file!", uid, path);
            } else if end < self.data.len() {
                let gapsize = self.data.len() - end;
                println!(
                    "{} bytes gap between {} {} and end of file at offset {:#x}",
                    gapsize, uid, path, end
                );
                max_gapsize = max_gapsize.max(gapsize);
            }
        }
        println!("Maximal gap size is {} bytes", max_gapsize);
        max_gapsize
    }

    /// Counts bodies placed on the given alignment, listing the ones that
    /// are not.
    pub fn test_alignment(&self, alignment: u32) -> usize {
        println!("Testing alignment: {} byte", alignment);
        let mut count = 0;
        for (&uid, node) in &self.entries {
            if node.offset % alignment == 0 {
                count += 1;
            } else {
                let path = if node.is_listed() {
                    self.path(uid).unwrap_or_default().trim_matches('/').to_string()
                } else {
                    String::new()
                };
                println!(
                    "at {:#x} {} bytes ({}, {}) not aligned",
                    node.offset, node.size, uid, path
                );
            }
        }
        println!("{} entries aligned", count);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::super::filesystem::tests::{parse, sample_image};
    use super::super::{Entry, Superblock};

    #[test]
    fn threshold_probe_brackets_raw_and_compressed_sizes() {
        let mut image = sample_image(0x1000);
        // mark uid 3 (15 bytes on disk) as compressed with 700 plain bytes
        let slot = Superblock::SIZE + 3 * Entry::SIZE;
        image[slot + 0x18..slot + 0x1c].copy_from_slice(&700u32.to_le_bytes());
        let fs = parse(image);
        let (max_notcompressed, min_compressed) = fs.inspect_compression_threshold();
        assert_eq!(max_notcompressed, 11); // notes.txt stays raw
        assert_eq!(min_compressed, Some(700));
    }

    #[test]
    fn layout_probe_sees_only_padding_gaps() {
        let fs = parse(sample_image(0x1000));
        // 17 zero bytes pad uid 3 up to uid 4, 21 pad uid 4 to end of file
        assert_eq!(fs.inspect_data_layout(), 21);
        assert_eq!(fs.test_alignment(32), 5);
    }

    #[test]
    fn misaligned_offset_is_counted_out() {
        let mut image = sample_image(0x1000);
        let slot = Superblock::SIZE + 4 * Entry::SIZE;
        image[slot + 0x14..slot + 0x18].copy_from_slice(&0x241u32.to_le_bytes());
        let fs = parse(image);
        assert_eq!(fs.test_alignment(32), 4);
    }
}
