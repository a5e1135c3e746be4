//! Render an inspection report to PDF, DOCX and HTML.
//!
//! Usage:
//!   cargo run --release --bin render_report -- --report rapport.json
//!   cargo run --release --bin render_report -- --report rapport.json \
//!       --images photos.json --assets branding/ --targets pdf,html --output-dir out

use report_oxide::{
    ComposeConfig, Composer, DirectoryAssets, ImageRecord, ReportRecord, Result, Target,
};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

struct RenderArgs {
    report: Option<PathBuf>,
    images: Option<PathBuf>,
    assets: Option<PathBuf>,
    config: Option<PathBuf>,
    targets: String,
    output_dir: PathBuf,
    verbose: bool,
}

impl RenderArgs {
    fn from_args() -> Self {
        Self::parse(&std::env::args().collect::<Vec<_>>())
    }

    fn parse(args: &[String]) -> Self {
        let mut parsed = Self {
            report: None,
            images: None,
            assets: None,
            config: None,
            targets: "pdf,docx,html".to_string(),
            output_dir: PathBuf::from("."),
            verbose: false,
        };

        let mut i = 1;
        while i < args.len() {
            let value = args.get(i + 1).cloned();
            match args[i].as_str() {
                "--report" => {
                    parsed.report = value.map(PathBuf::from);
                    i += 1;
                },
                "--images" => {
                    parsed.images = value.map(PathBuf::from);
                    i += 1;
                },
                "--assets" => {
                    parsed.assets = value.map(PathBuf::from);
                    i += 1;
                },
                "--config" => {
                    parsed.config = value.map(PathBuf::from);
                    i += 1;
                },
                "--targets" => {
                    if let Some(value) = value {
                        parsed.targets = value;
                    }
                    i += 1;
                },
                "--output-dir" => {
                    if let Some(value) = value {
                        parsed.output_dir = PathBuf::from(value);
                    }
                    i += 1;
                },
                "--verbose" | "-v" => {
                    parsed.verbose = true;
                },
                other => eprintln!("Ignoring unknown argument '{}'", other),
            }
            i += 1;
        }
        parsed
    }

    fn targets(&self) -> Result<BTreeSet<Target>> {
        self.targets
            .split(',')
            .filter(|t| !t.trim().is_empty())
            .map(str::parse)
            .collect()
    }
}

fn run(args: &RenderArgs) -> Result<bool> {
    let Some(report_path) = &args.report else {
        eprintln!("Missing --report <file>");
        return Ok(false);
    };
    let report = ReportRecord::from_json(&fs::read_to_string(report_path)?)?;
    let images = match &args.images {
        Some(path) => ImageRecord::list_from_json(&fs::read_to_string(path)?)?,
        None => Vec::new(),
    };
    let config = match &args.config {
        Some(path) => ComposeConfig::from_file(path)?,
        None => ComposeConfig::new(),
    };
    let targets = args.targets()?;

    let mut composer = Composer::new(config);
    if let Some(dir) = &args.assets {
        composer = composer.with_assets(DirectoryAssets::new(dir));
    }

    let start = Instant::now();
    let output = composer.compose(&report, &images, &targets)?;
    fs::create_dir_all(&args.output_dir)?;

    for (target, bytes) in &output.outputs {
        let path = args
            .output_dir
            .join(format!("rapport.{}", target.extension()));
        fs::write(&path, bytes)?;
        println!("{}: {} ({} bytes)", target, path.display(), bytes.len());
    }
    for (target, error) in &output.failures {
        eprintln!("{}: FAILED - {}", target, error);
    }
    if args.verbose {
        for diagnostic in &output.diagnostics {
            println!("  note: {}", diagnostic);
        }
        println!("Rendered in {:.2}s", start.elapsed().as_secs_f64());
    }
    Ok(output.is_complete())
}

fn main() {
    env_logger::init();

    let args = RenderArgs::from_args();
    match run(&args) {
        Ok(true) => {},
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(if e.is_input_error() { 2 } else { 1 });
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> RenderArgs {
        let args: Vec<String> = std::iter::once("render_report")
            .chain(line.split_whitespace())
            .map(String::from)
            .collect();
        RenderArgs::parse(&args)
    }

    #[test]
    fn test_defaults() {
        let args = parse("--report r.json");
        assert_eq!(args.report, Some(PathBuf::from("r.json")));
        assert_eq!(args.output_dir, PathBuf::from("."));
        assert_eq!(args.targets().unwrap(), Target::all());
        assert!(!args.verbose);
    }

    #[test]
    fn test_target_selection() {
        let args = parse("--report r.json --targets pdf,html -v --output-dir out");
        assert_eq!(
            args.targets().unwrap(),
            BTreeSet::from([Target::Canvas, Target::Markup])
        );
        assert_eq!(args.output_dir, PathBuf::from("out"));
        assert!(args.verbose);
    }

    #[test]
    fn test_unknown_target_is_rejected() {
        assert!(parse("--targets pdf,odt").targets().is_err());
    }
}
