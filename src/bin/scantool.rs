use clap::{Parser, Subcommand};
use rust_scan::preprocess::PreprocessingBank;
use rust_scan::quality::QualityAssessor;
use rust_scan::tools::{
    bench_limit_from_env, dataset_iter, dataset_root_from_env, grayscale_stats, load_image,
    smoke_from_env,
};
use rust_scan::{ImageResult, MetricsSink, Pathway, ScanConfig, Scanner};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Images decoded and scanned together in one parallel batch
const BATCH_CHUNK: usize = 16;

#[derive(Parser)]
#[command(name = "scantool", version, about = "Barcode and QR scanning tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect and read every code in one image
    Scan {
        #[arg(long)]
        image: PathBuf,
        /// JSON file layered over the default configuration
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Scan every image under a directory in parallel
    Batch {
        #[arg(long)]
        root: Option<PathBuf>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        smoke: bool,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print one JSON result per line
        #[arg(long)]
        json: bool,
    },
    /// Print quality triage and variant set for one image
    Inspect {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Scan {
            image,
            config,
            json,
        } => scan_cmd(&image, config.as_deref(), json),
        Command::Batch {
            root,
            limit,
            smoke,
            config,
            json,
        } => batch_cmd(root, limit, smoke, config.as_deref(), json),
        Command::Inspect { image, config } => inspect_cmd(&image, config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Option<ScanConfig> {
    let Some(path) = path else {
        return Some(ScanConfig::default().with_env_overrides());
    };
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("Failed to read config {}: {}", path.display(), err);
            return None;
        }
    };
    match ScanConfig::from_json_str(&text) {
        Ok(config) => Some(config.with_env_overrides()),
        Err(err) => {
            eprintln!("Failed to parse config {}: {}", path.display(), err);
            None
        }
    }
}

fn print_result(path: &Path, result: &ImageResult, json: bool) {
    if json {
        match serde_json::to_string(result) {
            Ok(line) => println!("{line}"),
            Err(err) => eprintln!("Failed to serialize result for {}: {}", path.display(), err),
        }
        return;
    }
    println!(
        "{}: {} codes, {} unrecognized ({:.1} ms, {:?} path)",
        path.display(),
        result.codes.len(),
        result.unrecognized.len(),
        result.elapsed_ms,
        result.quality.path
    );
    for (i, code) in result.codes.iter().enumerate() {
        let tl = code.polygon.top_left();
        let pathways: Vec<&str> = code.pathways.iter().map(Pathway::name).collect();
        println!(
            "  [{}] {} {} at ({:.0}, {:.0}) rot={}° via {} ({:.1} ms)",
            i,
            code.code_type,
            code.payload,
            tl.x,
            tl.y,
            code.orientation_deg,
            pathways.join("+"),
            code.decode_time_ms
        );
    }
}

fn scan_cmd(image: &Path, config: Option<&Path>, json: bool) {
    let Some(config) = load_config(config) else {
        return;
    };
    let img = match load_image(image) {
        Ok(img) => img,
        Err(err) => {
            eprintln!("Failed to load image {}: {}", image.display(), err);
            return;
        }
    };

    let scanner = Scanner::with_config(config);
    match scanner.detect_and_recognize(&img) {
        Ok(result) => print_result(image, &result, json),
        Err(err) => eprintln!("Failed to scan {}: {}", image.display(), err),
    }
}

fn batch_cmd(
    root: Option<PathBuf>,
    limit: Option<usize>,
    smoke: bool,
    config: Option<&Path>,
    json: bool,
) {
    let root = root.unwrap_or_else(dataset_root_from_env);
    let limit = limit.or_else(bench_limit_from_env);
    let smoke = smoke || smoke_from_env();
    let Some(config) = load_config(config) else {
        return;
    };

    if !root.exists() {
        eprintln!("Dataset root not found: {}", root.display());
        return;
    }
    let paths: Vec<PathBuf> = dataset_iter(&root, limit, smoke).collect();
    if paths.is_empty() {
        println!("No images found under {}", root.display());
        return;
    }

    let metrics = Arc::new(MetricsSink::new());
    let scanner = Scanner::with_config(config).with_sink(metrics.clone());
    let start = Instant::now();
    let mut images_with_codes = 0usize;
    let mut failed = 0usize;

    for chunk in paths.chunks(BATCH_CHUNK) {
        let mut loaded = Vec::with_capacity(chunk.len());
        let mut names = Vec::with_capacity(chunk.len());
        for path in chunk {
            match load_image(path) {
                Ok(img) => {
                    loaded.push(img);
                    names.push(path);
                }
                Err(err) => {
                    eprintln!("Failed to load {}: {}", path.display(), err);
                    failed += 1;
                }
            }
        }

        for (path, outcome) in names.into_iter().zip(scanner.scan_batch(&loaded)) {
            match outcome {
                Ok(result) => {
                    if !result.codes.is_empty() {
                        images_with_codes += 1;
                    }
                    print_result(path, &result, json);
                }
                Err(err) => {
                    eprintln!("Failed to scan {}: {}", path.display(), err);
                    failed += 1;
                }
            }
        }
    }

    if json {
        return;
    }
    let snapshot = metrics.snapshot();
    println!("\n=====================================");
    println!(
        "Images: {} ({} with codes, {} failed) in {:.2?}",
        paths.len(),
        images_with_codes,
        failed,
        start.elapsed()
    );
    for pathway in Pathway::ALL {
        println!(
            "  {:<10} {} candidates",
            pathway.name(),
            snapshot.candidates_for(pathway)
        );
    }
    println!(
        "Regions: {} recognized, {} unrecognized ({:.2}%), mean {:.1} ms",
        snapshot.recognized,
        snapshot.unrecognized,
        snapshot.recognition_rate() * 100.0,
        snapshot.mean_decode_ms()
    );
    for (code_type, count) in &snapshot.per_type {
        println!("  {code_type}: {count}");
    }
    println!("=====================================");
}

fn inspect_cmd(image: &Path, config: Option<&Path>) {
    let Some(config) = load_config(config) else {
        return;
    };
    let img = match load_image(image) {
        Ok(img) => img,
        Err(err) => {
            eprintln!("Failed to load image {}: {}", image.display(), err);
            return;
        }
    };

    let gray = img.to_luma8();
    println!("Image: {} ({}x{})", image.display(), gray.width(), gray.height());
    let stats = grayscale_stats(&gray);
    println!(
        "Grayscale range: {}-{}, average: {}",
        stats.min, stats.max, stats.avg
    );

    let verdict = QualityAssessor::new(config.quality.clone()).assess(&gray);
    println!(
        "Quality: blur={:.1} glare={:.4} std={:.1} glare_flag={} path={:?}",
        verdict.blur_score, verdict.glare_ratio, verdict.std_dev, verdict.has_glare, verdict.path
    );

    let variants = PreprocessingBank::new(config.preprocess.clone()).generate(&gray, &verdict);
    println!("Variants: {}", variants.len());
    for variant in &variants {
        println!(
            "  {} @ {:.2} ({}x{})",
            variant.descriptor,
            variant.scale,
            variant.image.width(),
            variant.image.height()
        );
    }
}
