//! Scan image files for QR codes from the command line.
//!
//! Usage:
//!   qrtool scan <image>...     decode every symbol found in each image
//!   qrtool info <image>...     per-stage candidate/decode breakdown

use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::process::exit;
use std::time::Instant;

use qrscan::{Scanner, decode_grayscale};

fn main() {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        usage();
    }

    let command = if args[0] == "scan" || args[0] == "info" {
        args.remove(0)
    } else {
        "scan".to_string()
    };
    if args.is_empty() {
        usage();
    }

    let files: Vec<PathBuf> = args.iter().map(PathBuf::from).collect();
    match command.as_str() {
        "scan" => scan_cmd(&files),
        "info" => {
            for file in &files {
                info_cmd(file);
            }
        }
        _ => usage(),
    }
}

fn usage() -> ! {
    eprintln!("usage: qrtool [scan|info] <image>...");
    exit(2);
}

fn load_gray(path: &Path) -> Result<(Vec<u8>, usize, usize), String> {
    let img = image::open(path).map_err(|e| e.to_string())?;
    let luma = img.to_luma8();
    let (w, h) = (luma.width() as usize, luma.height() as usize);
    Ok((luma.into_raw(), w, h))
}

fn scan_cmd(files: &[PathBuf]) {
    // Files are independent, so batch scans run one scanner per worker.
    let results: Vec<(usize, String)> = files
        .par_iter()
        .enumerate()
        .map(|(idx, path)| (idx, scan_one(path)))
        .collect();

    let mut ordered = results;
    ordered.sort_by_key(|(idx, _)| *idx);
    for (_, report) in ordered {
        print!("{}", report);
    }
}

fn scan_one(path: &Path) -> String {
    let mut out = String::new();
    match load_gray(path) {
        Ok((gray, width, height)) => {
            let start = Instant::now();
            let found = decode_grayscale(&gray, width, height, 8, true);
            let elapsed = start.elapsed();

            out.push_str(&format!(
                "{}: {}x{} -> {} symbol(s) ({:.2?})\n",
                path.display(),
                width,
                height,
                found.len(),
                elapsed
            ));
            for (i, symbol) in found.iter().enumerate() {
                out.push_str(&format!(
                    "  [{}] v{} ecc={:?} mask={} {:?}\n",
                    i,
                    symbol.data.version,
                    symbol.data.ecc_level,
                    symbol.data.mask,
                    symbol.data.text()
                ));
            }
        }
        Err(err) => {
            out.push_str(&format!("{}: load failed: {}\n", path.display(), err));
        }
    }
    out
}

fn info_cmd(path: &Path) {
    let (gray, width, height) = match load_gray(path) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("{}: load failed: {}", path.display(), err);
            return;
        }
    };

    println!("{}: {}x{}", path.display(), width, height);

    let mut scanner = Scanner::new();
    scanner.resize(width, height);
    scanner.begin().copy_from_slice(&gray);
    scanner.end(true);

    println!("  candidate grids: {}", scanner.count());
    for i in 0..scanner.count() {
        match scanner.extract(i) {
            Ok(code) => {
                print!("  grid {}: size={} corners={:?}", i, code.size, code.corners);
                match qrscan::decode(&code) {
                    Ok(data) => println!(" -> {:?}", data),
                    Err(err) => println!(" -> decode failed: {}", err),
                }
            }
            Err(err) => println!("  grid {}: extract failed: {}", i, err),
        }
    }
}
