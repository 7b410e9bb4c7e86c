//! Extracts and replaces the LZMA-packed rootfs inside the firmware image.

use std::io::Write;
use std::process::exit;
use std::{env, fs};

use anyhow::{Context, Result};
use seamripper::{diag, locate_rootfs, lzma_decode, AloneEncoder, LzmaEncode, Seama, UImage};

/// The rootfs payload uses a wider dictionary than RomFS file bodies.
const ROOTFS_DICT_BITS: u32 = 23;

fn usage(program: &str) -> ! {
    println!(
        "Firmware rootfs modifier usage:\n {0} e[xtract] <infw.bin> <outrootfs.bin>\n {0} r[eplace] <inrootfs.bin> <originalfw.bin> <outfw.bin>",
        program
    );
    exit(1);
}

fn main() -> Result<()> {
    diag::init();
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("firmware");
    match args.get(1).map(String::as_str) {
        Some(command) if "extract".starts_with(command) && args.len() == 4 => {
            extract(&args[2], &args[3])
        }
        Some(command) if "replace".starts_with(command) && args.len() == 5 => {
            replace(&args[2], &args[3], &args[4])
        }
        _ => usage(program),
    }
}

fn extract(infile: &str, outfile: &str) -> Result<()> {
    let bytes = fs::read(infile).with_context(|| format!("reading {}", infile))?;
    let seama = Seama::decode(&bytes)?;
    diag::report_all(&seama.verify());
    println!("{}", seama);

    let Some(offset) = locate_rootfs(&seama.data) else {
        println!("Could not find rootfs image");
        exit(1);
    };
    let image = UImage::new(seama.data[offset..].to_vec())?;
    let rootfs = lzma_decode(image.content())?;
    fs::File::create_new(outfile)
        .with_context(|| format!("creating {}", outfile))?
        .write_all(&rootfs)?;
    Ok(())
}

fn replace(infile: &str, original: &str, outfile: &str) -> Result<()> {
    let rootfs = fs::read(infile).with_context(|| format!("reading {}", infile))?;
    let packed = AloneEncoder::default().encode(&rootfs, ROOTFS_DICT_BITS)?;

    let bytes = fs::read(original).with_context(|| format!("reading {}", original))?;
    let seama = Seama::decode(&bytes)?;
    diag::report_all(&seama.verify());

    let Some(offset) = locate_rootfs(&seama.data) else {
        println!("Could not find rootfs image");
        exit(1);
    };
    let mut image = UImage::new(seama.data[offset..].to_vec())?;
    image.update_content(&packed);

    // Anything that followed the original rootfs image is dropped here; no
    // observed firmware carries payload there.
    let mut payload = seama.data[..offset].to_vec();
    payload.extend_from_slice(image.as_bytes());

    fs::File::create_new(outfile)
        .with_context(|| format!("creating {}", outfile))?
        .write_all(&Seama::encode(&payload, &seama.meta))?;
    Ok(())
}
