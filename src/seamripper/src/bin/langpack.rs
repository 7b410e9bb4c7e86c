//! Generates a sealpac translation table from a tab-separated word list.

use std::io::Write;
use std::process::exit;
use std::{env, fs};

use anyhow::{Context, Result};
use seamripper::{diag, sealpac};

fn usage(program: &str) -> ! {
    println!(
        "Generate langpack/sealpac (for i18n):\n {} <translations.tsv> <outlangpack.lng> [langcode]\n\
         Each line in translations.tsv should contain tab separated:\n<original>\t<translation>",
        program
    );
    exit(1);
}

fn main() -> Result<()> {
    diag::init();
    let args: Vec<String> = env::args().collect();
    let (infile, outfile) = match (args.get(1), args.get(2)) {
        (Some(infile), Some(outfile)) => (infile, outfile),
        _ => usage(args.first().map(String::as_str).unwrap_or("langpack")),
    };
    let langcode = args.get(3).map(|code| code.as_bytes().to_vec()).unwrap_or_else(|| b"en".to_vec());

    let text = fs::read_to_string(infile).with_context(|| format!("reading {}", infile))?;
    let mut dictionary = Vec::new();
    for line in text.lines().filter(|line| !line.is_empty()) {
        let (original, translation) = line
            .split_once('\t')
            .with_context(|| format!("not a <original>\\t<translation> line: {:?}", line))?;
        dictionary.push((original, translation));
    }

    let table = sealpac::generate(dictionary, &langcode);
    fs::File::create_new(outfile)
        .with_context(|| format!("creating {}", outfile))?
        .write_all(&table)?;
    Ok(())
}
