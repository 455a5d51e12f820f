//! Layer composition CLI tool.
//!
//! Given a single layer file, composes it and prints the flattened result as
//! USDA text. Given a directory, composes every `.usda`/`.usd` file found
//! beneath it and reports which ones compose cleanly.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use walkdir::WalkDir;

use usd_compose::composition::{compose_file, extract_variants, CompositionOptions};
use usd_compose::usda::{self, TextReader};

/// Compose USD layers into a single flattened layer.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Layer file to compose, or a directory to check recursively.
    #[arg(value_name = "PATH")]
    path: PathBuf,

    /// Warn and continue on missing or unreadable assets instead of failing.
    #[arg(long, short = 'r')]
    relaxed: bool,

    /// Variant selection overriding the authored ones, as `set=variant`.
    #[arg(long = "variant", value_name = "SET=VARIANT", value_parser = parse_selection)]
    variants: Vec<(String, String)>,

    /// Additional directory to resolve asset paths against.
    #[arg(long = "search-path", short = 'I', value_name = "DIR")]
    search_paths: Vec<PathBuf>,

    /// Leave payload arcs unloaded.
    #[arg(long)]
    no_payload: bool,

    /// Maximum number of composition passes.
    #[arg(long, value_name = "N")]
    max_iterations: Option<usize>,

    /// List the variant sets authored in the layer instead of composing it.
    #[arg(long)]
    list_variants: bool,

    /// Write the flattened layer to this file instead of stdout.
    #[arg(long, short = 'o', value_name = "FILE")]
    output: Option<PathBuf>,

    /// Only show summary statistics (directory mode).
    #[arg(long, short = 's')]
    summary: bool,

    /// Skip files matching these patterns (can be specified multiple times).
    #[arg(long = "skip", short = 'x')]
    skip_patterns: Vec<String>,
}

fn parse_selection(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((set, variant)) if !set.is_empty() && !variant.is_empty() => Ok((set.to_owned(), variant.to_owned())),
        _ => Err(format!("expected SET=VARIANT, got '{raw}'")),
    }
}

impl Args {
    fn options(&self) -> CompositionOptions {
        let mut options = if self.relaxed {
            CompositionOptions::relaxed()
        } else {
            CompositionOptions::default()
        };
        options.load_payloads = !self.no_payload;
        options.search_paths.clone_from(&self.search_paths);
        if let Some(max_iterations) = self.max_iterations {
            options.max_iterations = max_iterations;
        }
        for (set, variant) in &self.variants {
            options = options.with_selection(set, variant);
        }
        options
    }
}

/// Result of composing one file in directory mode.
#[derive(Debug)]
enum CheckResult {
    Success { prims: usize, layers: usize, warnings: usize },
    Failed { error: String },
}

fn check_file(path: &Path, options: &CompositionOptions) -> CheckResult {
    match compose_file(path, options) {
        Ok(composition) => CheckResult::Success {
            prims: composition.layer.len(),
            layers: composition.layers.len(),
            warnings: composition.warnings.len(),
        },
        Err(e) => CheckResult::Failed {
            error: format!("{:#}", anyhow::Error::from(e)),
        },
    }
}

fn should_skip(path: &Path, patterns: &[String]) -> bool {
    let path_str = path.to_string_lossy();
    patterns.iter().any(|p| path_str.contains(p))
}

fn collect_layer_files(path: &Path, skip_patterns: &[String]) -> Vec<PathBuf> {
    WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            matches!(ext.to_lowercase().as_str(), "usda" | "usd")
        })
        .filter(|p| !should_skip(p, skip_patterns))
        .collect()
}

fn main() {
    let args = Args::parse();
    let start = Instant::now();

    if args.path.is_dir() {
        run_directory_check(&args);
        eprintln!("\nTime elapsed: {:.2}s", start.elapsed().as_secs_f64());
        return;
    }

    let result = if args.list_variants {
        list_variants(&args.path)
    } else {
        compose_single(&args)
    };
    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn list_variants(path: &Path) -> Result<()> {
    let layer = TextReader::read(path)?;
    let variants = extract_variants(&layer)?;

    if variants.is_empty() {
        println!("No variant sets in {}", path.display());
        return Ok(());
    }

    for (prim_path, info) in &variants {
        println!("{prim_path}");
        for set in &info.variant_sets {
            let names = info.variants.get(set).map(|names| names.join(", ")).unwrap_or_default();
            match info.selections.get(set) {
                Some(selected) => println!("  {set} = {selected} [{names}]"),
                None => println!("  {set} [{names}]"),
            }
        }
    }
    Ok(())
}

fn compose_single(args: &Args) -> Result<()> {
    let composition = compose_file(&args.path, &args.options())
        .with_context(|| format!("Failed to compose {}", args.path.display()))?;

    for warning in &composition.warnings {
        eprintln!("warning: {warning}");
    }

    let text = usda::write_layer(&composition.layer);
    match &args.output {
        Some(output) => {
            std::fs::write(output, text).with_context(|| format!("Failed to write {}", output.display()))?;
            eprintln!(
                "Composed {} layers into {}",
                composition.layers.len(),
                output.display()
            );
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn run_directory_check(args: &Args) {
    let files = collect_layer_files(&args.path, &args.skip_patterns);

    if files.is_empty() {
        eprintln!("No layer files found in: {}", args.path.display());
        std::process::exit(1);
    }

    println!("Composing {} layer files...\n", files.len());

    let progress = (!args.summary).then(|| {
        let pb = ProgressBar::new(files.len() as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    });

    let options = args.options();
    let results: Vec<(PathBuf, CheckResult)> = files
        .par_iter()
        .map(|file| {
            let result = check_file(file, &options);
            if let Some(pb) = &progress {
                pb.inc(1);
            }
            (file.clone(), result)
        })
        .collect();

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let mut failures = Vec::new();
    let mut warned = 0;
    for (file, result) in &results {
        let rel_path = file.strip_prefix(&args.path).unwrap_or(file);
        match result {
            CheckResult::Success { prims, layers, warnings } => {
                if *warnings > 0 {
                    warned += 1;
                }
                if !args.summary {
                    println!(
                        "[PASS] {} ({} root prims, {} layers, {} warnings)",
                        rel_path.display(),
                        prims,
                        layers,
                        warnings
                    );
                }
            }
            CheckResult::Failed { error } => {
                if !args.summary {
                    println!("[FAIL] {}", rel_path.display());
                    println!("       Error: {}", error);
                }
                failures.push((rel_path, error));
            }
        }
    }

    let total = results.len();
    let fail_count = failures.len();
    let pass_count = total - fail_count;

    println!();
    println!("================================================================================");
    println!("Composition Summary");
    println!("================================================================================");
    println!();
    println!("Total files:  {}", total);
    println!(
        "Passed:       {} ({:.1}%)",
        pass_count,
        (pass_count as f64 / total as f64) * 100.0
    );
    println!(
        "Failed:       {} ({:.1}%)",
        fail_count,
        (fail_count as f64 / total as f64) * 100.0
    );
    println!("With warnings: {}", warned);
    println!();

    if !failures.is_empty() {
        println!("Failed files:");
        for (path, error) in &failures {
            println!("  - {}", path.display());
            if args.summary {
                println!("    {}", error);
            }
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_variant_selections() {
        assert_eq!(parse_selection("look=wood"), Ok(("look".to_owned(), "wood".to_owned())));
        assert!(parse_selection("look").is_err());
        assert!(parse_selection("=wood").is_err());
    }

    #[test]
    fn args_build_options() {
        let args = Args::parse_from([
            "usdcompose",
            "scene.usda",
            "--relaxed",
            "--no-payload",
            "--variant",
            "look=metal",
            "-I",
            "/library",
            "--max-iterations",
            "4",
        ]);
        let options = args.options();
        assert!(!options.references.error_when_asset_not_found);
        assert!(!options.load_payloads);
        assert_eq!(options.max_iterations, 4);
        assert_eq!(options.variants.selections["look"], "metal");
        assert_eq!(options.search_paths, [PathBuf::from("/library")]);
    }
}
