use std::fmt;

/// Recoverable findings raised while decoding or rebuilding an image.
///
/// Verification routines return these instead of failing so that a damaged
/// image can still be inspected and repaired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    SeamaMagic { found: u32 },
    SurplusData { len: usize },
    ShortData { have: usize, declared: u32 },
    Md5Mismatch,
    UimageMagic { found: u32 },
    ImageShort { have: usize, need: usize },
    HeaderCrcMismatch { stored: u32, computed: u32 },
    DataCrcMismatch { stored: u32, computed: u32 },
    EntryCountMismatch { parsed: u32, declared: u32 },
    UnreadableEntry { index: u32 },
    EntryUidMismatch { slot: u32, uid: u32 },
    MisplacedEntryData { uid: u32 },
    AliasedUid { uid: u32, kept: String, other: String },
    DecompressFailed { uid: u32 },
    DecompressedSizeMismatch { uid: u32, got: usize, declared: u32 },
    MaxSizeGrown { new_size: u32 },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::SeamaMagic { found } => {
                write!(f, "wrong SEAMA magic number: {:#010x}", found)
            }
            Warning::SurplusData { len } => {
                write!(f, "{} surplus bytes after SEAMA data length", len)
            }
            Warning::ShortData { have, declared } => {
                write!(f, "data length is {}, but SEAMA's data length is {}", have, declared)
            }
            Warning::Md5Mismatch => write!(f, "MD5 checksum does not match"),
            Warning::UimageMagic { found } => {
                write!(f, "wrong uImage magic number: {:#010x}", found)
            }
            Warning::ImageShort { have, need } => {
                write!(f, "image is {} bytes, shorter than {} from header", have, need)
            }
            Warning::HeaderCrcMismatch { stored, computed } => {
                write!(f, "uImage header CRC is {:#010x}, expected {:#010x}", stored, computed)
            }
            Warning::DataCrcMismatch { stored, computed } => {
                write!(f, "uImage data CRC is {:#010x}, expected {:#010x}", stored, computed)
            }
            Warning::EntryCountMismatch { parsed, declared } => {
                write!(f, "parsed {} entries, but superblock declares {}", parsed, declared)
            }
            Warning::UnreadableEntry { index } => {
                write!(f, "entry ({}) could not be read", index)
            }
            Warning::EntryUidMismatch { slot, uid } => {
                write!(f, "entry at slot {} carries uid {}", slot, uid)
            }
            Warning::MisplacedEntryData { uid } => {
                write!(f, "data of entry {} lies inside the entry table region", uid)
            }
            Warning::AliasedUid { uid, kept, other } => {
                write!(f, "multiple links to one file: {} also listed as {} (uid {})", kept, other, uid)
            }
            Warning::DecompressFailed { uid } => {
                write!(f, "could not uncompress entry {}", uid)
            }
            Warning::DecompressedSizeMismatch { uid, got, declared } => {
                write!(f, "entry {} decompressed to {} bytes, header says {}", uid, got, declared)
            }
            Warning::MaxSizeGrown { new_size } => {
                write!(f, "RomFS larger than max_size in header, increasing max_size to {}", new_size)
            }
        }
    }
}

/// Sends one warning to the diagnostic stream.
pub fn report(warning: &Warning) {
    log::warn!("{}", warning);
}

pub fn report_all(warnings: &[Warning]) {
    for warning in warnings {
        report(warning);
    }
}

/// Configures the diagnostic stream for the command-line tools: warnings come
/// out as `Warning: ...` on stderr, styled only when stderr is a terminal.
pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            use std::io::Write;
            let style = buf.default_level_style(record.level());
            match record.level() {
                log::Level::Warn => {
                    writeln!(buf, "{style}Warning: {}{style:#}", record.args())
                }
                log::Level::Error => {
                    writeln!(buf, "{style}Error: {}{style:#}", record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}
