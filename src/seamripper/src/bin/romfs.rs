//! Interactive RomFS shell: list files, probe the layout, stage content
//! replacements and write a rebuilt image.

use std::io::{self, BufRead, Write};
use std::process::exit;
use std::{env, fs};

use anyhow::{Context, Result};
use seamripper::{diag, AloneEncoder, Endianness, NodeKind, RomFs};

const HELP: &str = "Available commands:
l[s]                                        list RomFS modifiable files
m[v] <input modified file> <path in RomFS>  read replacing file
w <new RomFs file>                          write modified RomFS to new file
q                                           quit
i                                           inspect RomFS
";

fn main() -> Result<()> {
    diag::init();
    let args: Vec<String> = env::args().collect();
    let Some(infile) = args.get(1) else {
        println!("Usage: {} <input file>", args.first().map(String::as_str).unwrap_or("romfs"));
        exit(1);
    };
    let data = fs::read(infile).with_context(|| format!("reading {}", infile))?;
    let mut image = RomFs::new(data, Endianness::Little, Box::new(AloneEncoder::default()))?;

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            break;
        }
        let line = line.trim_end_matches(['\r', '\n']);
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));

        match command {
            "l" | "ls" => list(&image),
            "i" => inspect(&image),
            "m" | "mv" => modify(&mut image, command, rest),
            "w" => write(&mut image, rest),
            "q" => break,
            _ => print!("{}", HELP),
        }
    }
    Ok(())
}

fn list(image: &RomFs) {
    for (&uid, node) in &image.entries {
        if !node.is_listed() || node.kind == NodeKind::Directory {
            continue;
        }
        if let Some(path) = image.path(uid) {
            println!(
                "{} {} {} {}",
                uid,
                path.trim_matches('/'),
                node.size,
                node.size_decompressed
            );
        }
    }
}

fn inspect(image: &RomFs) {
    image.inspect_data_layout();
    let (max_notcompressed, min_compressed) = image.inspect_compression_threshold();
    println!("Maximal not compressed size: {} bytes", max_notcompressed);
    match min_compressed {
        Some(size) => println!("Minimal compressed size: {} bytes", size),
        None => println!("Minimal compressed size: no compressed entries"),
    }
    image.test_alignment(RomFs::ALIGNMENT as u32);
}

fn modify(image: &mut RomFs, command: &str, rest: &str) {
    let Some((infile, path)) = rest.split_once(' ') else {
        println!("{} <input modified file> <path in RomFS>", command);
        return;
    };
    let data = match fs::read(infile) {
        Ok(data) => data,
        Err(_) => {
            println!("Could not read <input modified file>");
            return;
        }
    };
    match image.modify_file(data, path) {
        Ok(()) => println!("Replacing /{} with {}", path.trim_matches('/'), infile),
        Err(error) => println!("{}", error),
    }
}

fn write(image: &mut RomFs, rest: &str) {
    if rest.is_empty() {
        println!("w <new RomFs file>");
        return;
    }
    let written = image.rebuild().and_then(|_| {
        println!("Writing modified RomFS to {}", rest);
        fs::File::create_new(rest)?.write_all(image.as_bytes())?;
        Ok(())
    });
    if let Err(error) = written {
        println!("{}", error);
    }
}
