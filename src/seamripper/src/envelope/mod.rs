mod seama;
mod uimage;

pub use seama::Seama;
pub use uimage::{locate_rootfs, UImage};
