//! Extracts and rebuilds the gzipped XML configuration blob inside its
//! SEAMA envelope.

use std::io::Write;
use std::process::exit;
use std::{env, fs};

use anyhow::{Context, Result};
use seamripper::{diag, gzip, Seama};

fn usage(program: &str) -> ! {
    println!(
        "Usage:\n {0} e[xtract] <infile.bin> <outfile.xml>\n {0} r[ebuild] <infile.xml> <original.bin> <outfile.bin>",
        program
    );
    exit(1);
}

fn main() -> Result<()> {
    diag::init();
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("devconf");
    match args.get(1).map(String::as_str) {
        Some(command) if "extract".starts_with(command) && args.len() == 4 => {
            extract(&args[2], &args[3])
        }
        Some(command) if "rebuild".starts_with(command) && args.len() == 5 => {
            rebuild(&args[2], &args[3], &args[4])
        }
        _ => usage(program),
    }
}

fn extract(infile: &str, outfile: &str) -> Result<()> {
    let bytes = fs::read(infile).with_context(|| format!("reading {}", infile))?;
    let seama = Seama::decode(&bytes)?;
    diag::report_all(&seama.verify());
    println!("{}", seama);

    let xml = gzip::decompress(&seama.data)?;
    fs::File::create_new(outfile)
        .with_context(|| format!("creating {}", outfile))?
        .write_all(&xml)?;
    Ok(())
}

fn rebuild(infile: &str, original: &str, outfile: &str) -> Result<()> {
    let xml = fs::read(infile).with_context(|| format!("reading {}", infile))?;
    let packed = gzip::compress_for_device(&xml)?;

    let bytes = fs::read(original).with_context(|| format!("reading {}", original))?;
    let seama = Seama::decode(&bytes)?;
    diag::report_all(&seama.verify());

    fs::File::create_new(outfile)
        .with_context(|| format!("creating {}", outfile))?
        .write_all(&Seama::encode(&packed, &seama.meta))?;
    Ok(())
}
