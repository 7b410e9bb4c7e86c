pub mod gzip;
mod lzma;

pub use lzma::{lzma_decode, AloneEncoder, LzmaEncode};

#[cfg(test)]
pub(crate) use lzma::InProcessEncoder;
