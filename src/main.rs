// Command-line front end for scanning ID card photos

use cardverify::{
    models::{mask_identifier, MatchResult, ScanResult, VerificationRecord},
    processing::{generate_variants, prepare_base, ImageProcessor},
    CardScanner, ScanConfig, ScanError,
};
use clap::Parser;
use image::ImageFormat;
use log::info;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

/// Scan an institutional ID card photo and optionally verify the holder's name
#[derive(Parser, Debug)]
#[command(name = "cardverify", version)]
struct Args {
    /// Photo of the ID card (PNG, JPEG, ...)
    image: PathBuf,

    /// Profile name to verify against the scanned card
    #[arg(short = 'n', long)]
    profile_name: Option<String>,

    /// JSON file with scan configuration overrides
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the result as JSON instead of a report
    #[arg(long)]
    json: bool,

    /// Write the preprocessing variants of the upright image to this directory
    #[arg(long)]
    dump_variants: Option<PathBuf>,
}

#[derive(Serialize)]
struct Output<'a> {
    scan: &'a ScanResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    verification: Option<VerificationRecord>,
}

fn print_report(scan: &ScanResult, verification: Option<&(MatchResult, VerificationRecord)>) {
    println!("\n===============================================");
    println!("           ID CARD SCAN REPORT");
    println!("===============================================\n");

    println!("CARD INFORMATION:");
    println!("  Name: {}", scan.name.as_deref().unwrap_or("Could not read name"));
    println!(
        "  Register Number: {}",
        scan.identifier
            .as_deref()
            .map(mask_identifier)
            .unwrap_or_else(|| "Unknown ID".to_string())
    );
    println!(
        "  Institution: {}",
        scan.institution.as_deref().unwrap_or("Unknown College")
    );
    if scan.name_candidates.len() > 1 {
        println!("  Other name readings:");
        for candidate in scan.name_candidates.iter().skip(1) {
            println!("    - {} ({:?})", candidate.value, candidate.strategy);
        }
    }

    println!("\nRECOGNITION:");
    if let (Some(rotation), Some(variant)) = (scan.rotation, scan.variant) {
        println!("  Best pass: {} / {}", rotation, variant);
    }
    println!("  Score: {} ({} attempts)", scan.score, scan.attempts);
    println!("  Confidence: {:.0}%", scan.confidence * 100.0);

    if let Some(error) = &scan.error {
        println!("\nPROBLEM:\n  {}", error);
    }

    if let Some((outcome, record)) = verification {
        println!("\nNAME VERIFICATION:");
        if let Some(candidate) = &outcome.candidate {
            println!("  Compared against: {}", candidate);
        }
        println!("  Similarity: {:.0}%", outcome.similarity * 100.0);
        println!(
            "  Result: {}",
            if record.verified { "VERIFIED" } else { "NOT VERIFIED" }
        );
    }

    println!(
        "\nCard scan result: {}",
        if scan.is_valid { "VALID" } else { "INVALID" }
    );
}

fn dump_variants(image_path: &Path, dir: &Path, config: &ScanConfig) -> Result<(), ScanError> {
    fs::create_dir_all(dir)?;
    let bytes = fs::read(image_path)?;
    let base = prepare_base(ImageProcessor::decode(&bytes)?, &config.preprocessing);

    let variants = generate_variants(&base, &config.preprocessing);
    for (index, variant) in variants.into_iter().enumerate() {
        let path = dir.join(format!("{}-{}.png", index + 1, variant.kind.name()));
        variant
            .image
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| ScanError::Config(format!("Failed to write {}: {}", path.display(), e)))?;
        info!("Wrote {}", path.display());
    }
    Ok(())
}

fn run(args: Args) -> Result<bool, ScanError> {
    let config = match &args.config {
        Some(path) => ScanConfig::from_file(path)?,
        None => ScanConfig::default(),
    };
    config.validate()?;

    if let Some(dir) = &args.dump_variants {
        dump_variants(&args.image, dir, &config)?;
    }

    let bytes = fs::read(&args.image)?;
    let scanner = CardScanner::with_tesseract(config);
    info!("Attempting to scan ID card image at: {:?}", args.image);
    let scan = scanner.scan_card(&bytes);

    let verification = args.profile_name.as_deref().map(|profile_name| {
        let outcome = scanner.verify_name(profile_name, &scan);
        let record = VerificationRecord::new(&scan, &outcome);
        (outcome, record)
    });

    if args.json {
        let output = Output {
            scan: &scan,
            verification: verification.as_ref().map(|(_, record)| record.clone()),
        };
        let json = serde_json::to_string_pretty(&output)
            .map_err(|e| ScanError::Config(format!("Failed to serialize result: {}", e)))?;
        println!("{}", json);
    } else {
        print_report(&scan, verification.as_ref());
    }

    Ok(match &verification {
        Some((_, record)) => record.verified,
        None => scan.is_valid,
    })
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(args) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!("Error scanning ID card: {}", err);
            process::exit(2);
        }
    }
}
