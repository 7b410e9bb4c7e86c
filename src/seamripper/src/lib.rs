mod compress;
mod cursor;
pub mod diag;
mod envelope;
mod error;
mod romfs;
pub mod sealpac;

pub use compress::*;
pub use cursor::{write_u32_at, ByteCursor};
pub use diag::Warning;
pub use envelope::*;
pub use error::{Error, Result};
pub use romfs::*;
