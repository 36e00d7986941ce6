use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::{debug, error, info};
use predictables_report::config::{self, ConfigSource};
use predictables_report::fonts::FontConfig;
use predictables_report::manifest::Manifest;
use predictables_report::{numbering, ReportError, StyleMatch};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Debug)]
enum AppError {
    Report(ReportError),
    ConfigError(String),
    PathError(String),
    UsageError(String),
}

impl From<ReportError> for AppError {
    fn from(e: ReportError) -> Self {
        AppError::Report(e)
    }
}

/// Verbosity level for output
#[derive(Debug, Clone, Copy, PartialEq)]
enum Verbosity {
    Quiet,   // No output except errors
    Normal,  // Standard output
    Verbose, // Detailed output
}

/// Locates the style configuration.
///
/// Priority order:
/// 1. `--config` when given
/// 2. `reportrc.toml` in `cwd`
/// 3. `<config dir>/predictables-report/reportrc.toml`
///
/// `None` means the built-in defaults.
fn get_config_path(matches: &ArgMatches, cwd: &Path) -> Result<Option<PathBuf>, AppError> {
    if let Some(config_file) = matches.get_one::<String>("config") {
        let path = cwd.join(config_file);
        if !path.is_file() {
            return Err(AppError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        return Ok(Some(path));
    }
    Ok(config::find_config_file(cwd))
}

fn load_style(config_path: Option<&Path>) -> StyleMatch {
    match config_path {
        Some(path) => {
            debug!("Using configuration {}", path.display());
            let path = path.to_string_lossy();
            config::load_config_from_source(ConfigSource::File(&path))
        }
        None => config::load_config_from_source(ConfigSource::Default),
    }
}

/// `--output`, then the manifest's `[document].output`, then `output.pdf`,
/// relative to `cwd`.
fn get_output_path(matches: &ArgMatches, manifest_output: Option<&str>, cwd: &Path) -> PathBuf {
    matches
        .get_one::<String>("output")
        .map(String::as_str)
        .or(manifest_output)
        .map(|p| cwd.join(p))
        .unwrap_or_else(|| cwd.join("output.pdf"))
}

fn get_font_config(matches: &ArgMatches) -> Option<FontConfig> {
    if !(matches.contains_id("font-path")
        || matches.contains_id("default-font")
        || matches.contains_id("code-font"))
    {
        return None;
    }
    let defaults = FontConfig::default();
    Some(FontConfig {
        custom_paths: matches
            .get_many::<String>("font-path")
            .map(|values| values.map(PathBuf::from).collect())
            .unwrap_or_default(),
        default_font: matches.get_one::<String>("default-font").cloned(),
        code_font: matches
            .get_one::<String>("code-font")
            .cloned()
            .or(defaults.code_font),
    })
}

/// One label per line for `--labels STYLE --count N`.
fn format_labels(style: &str, count: usize) -> Result<String, AppError> {
    let labels = numbering::generate(count, style).map_err(ReportError::from)?;
    Ok(labels.collect::<Vec<_>>().join("\n"))
}

fn run(matches: ArgMatches) -> Result<(), AppError> {
    let verbosity = if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    };
    let dry_run = matches.get_flag("dry-run");

    let cwd = std::env::current_dir().map_err(|e| AppError::PathError(e.to_string()))?;
    let manifest_path = matches
        .get_one::<String>("manifest")
        .map(|p| cwd.join(p))
        .ok_or_else(|| AppError::UsageError("No manifest provided".to_string()))?;

    let manifest = Manifest::load(&manifest_path)?;
    let output_path = get_output_path(&matches, manifest.output(), &cwd);
    let config_path = get_config_path(&matches, &cwd)?;
    let style = load_style(config_path.as_deref());

    let mut report = manifest.to_report(&output_path, style)?;
    if let Some(font_config) = get_font_config(&matches) {
        if verbosity == Verbosity::Verbose {
            if let Some(font) = &font_config.default_font {
                info!("   Font: {}", font);
            }
        }
        report.fonts(font_config);
    }

    if dry_run {
        if verbosity != Verbosity::Quiet {
            println!(
                "✓ Dry-run complete: {} blocks, {} references. No PDF generated.",
                report.len(),
                report.references().len()
            );
        }
        return Ok(());
    }

    if verbosity == Verbosity::Verbose {
        info!("📄 Generating PDF with {} blocks...", report.len());
    }
    let written = report.build()?;

    if verbosity != Verbosity::Quiet {
        println!("✅ Successfully saved PDF to {}", written.display());

        if verbosity == Verbosity::Verbose {
            if let Ok(metadata) = fs::metadata(&written) {
                let size_kb = metadata.len() as f64 / 1024.0;
                if size_kb < 1024.0 {
                    println!("   Size: {:.1} KB", size_kb);
                } else {
                    println!("   Size: {:.2} MB", size_kb / 1024.0);
                }
            }
        }
    }

    Ok(())
}

fn build_cli() -> Command {
    Command::new("predictables-report")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Build PDF reports from TOML manifests")
        .after_help(
            "EXAMPLES:\n  \
            predictables-report -m report.toml -o summary.pdf\n  \
            predictables-report -m report.toml -c reportrc.toml --verbose\n  \
            predictables-report -m report.toml --dry-run\n  \
            predictables-report --labels upper-roman --count 12\n",
        )
        .arg(
            Arg::new("manifest")
                .short('m')
                .long("manifest")
                .value_name("FILE")
                .help("Path to the report manifest (TOML)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("OUTPUT_PATH")
                .help("Path to the output PDF file (defaults to the manifest's output or ./output.pdf)"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("CONFIG_FILE")
                .help("Path to a style configuration file (TOML). Auto-detects reportrc.toml if not specified"),
        )
        .arg(
            Arg::new("font-path")
                .long("font-path")
                .value_name("PATH")
                .help("Path to a custom font directory or font file")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("default-font")
                .long("default-font")
                .value_name("FONT_NAME")
                .help("Default font family to use (default: helvetica)"),
        )
        .arg(
            Arg::new("code-font")
                .long("code-font")
                .value_name("FONT_NAME")
                .help("Font for code blocks (default: courier)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Show detailed output including file size")
                .action(ArgAction::SetTrue)
                .conflicts_with("quiet"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Suppress all output except errors")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Parse and validate the manifest without generating a PDF")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("get-default-configuration")
                .long("get-default-configuration")
                .help("Print a default reportrc.toml to stdout and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("labels")
                .long("labels")
                .value_name("STYLE")
                .help("Print ordinal labels in STYLE (decimal, lower-roman, upper-roman, lower-alpha, upper-alpha) and exit"),
        )
        .arg(
            Arg::new("count")
                .long("count")
                .value_name("N")
                .help("Number of labels printed by --labels")
                .value_parser(value_parser!(usize))
                .default_value("10")
                .requires("labels"),
        )
}

fn main() {
    // Initialize logger with environment variable control (RUST_LOG)
    env_logger::Builder::from_default_env()
        .format_timestamp_millis()
        .init();

    let mut cmd = build_cli();
    let matches = cmd.clone().get_matches();

    // Print a default configuration TOML and exit if requested
    if matches.get_flag("get-default-configuration") {
        println!("{}", config::default_config_toml());
        process::exit(0);
    }

    if let Some(style) = matches.get_one::<String>("labels") {
        let count = matches.get_one::<usize>("count").copied().unwrap_or(10);
        match format_labels(style, count) {
            Ok(labels) => {
                if !labels.is_empty() {
                    println!("{}", labels);
                }
                process::exit(0);
            }
            Err(AppError::Report(e)) => {
                error!("[X] {}", e);
                process::exit(1);
            }
            Err(e) => {
                error!("[X] {:?}", e);
                process::exit(1);
            }
        }
    }

    if !matches.contains_id("manifest") {
        let _ = cmd.print_help();
        println!();
        process::exit(1);
    }

    if let Err(e) = run(matches) {
        match e {
            AppError::Report(e) => error!("[X] Report error:\n{}", e),
            AppError::ConfigError(e) => error!("[X] Configuration error: {}", e),
            AppError::PathError(e) => error!("[X] Path error: {}", e),
            AppError::UsageError(e) => error!("[X] {}", e),
        }
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_cli_definition_is_valid() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_get_output_path_priority() {
        let cwd = Path::new("/work");
        let matches = build_cli().get_matches_from(vec!["test"]);
        assert_eq!(get_output_path(&matches, None, cwd), cwd.join("output.pdf"));
        assert_eq!(
            get_output_path(&matches, Some("from_manifest.pdf"), cwd),
            cwd.join("from_manifest.pdf")
        );

        let matches = build_cli().get_matches_from(vec!["test", "-o", "my.pdf"]);
        assert_eq!(
            get_output_path(&matches, Some("from_manifest.pdf"), cwd),
            cwd.join("my.pdf")
        );
    }

    #[test]
    fn test_get_config_path_explicit_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("custom.toml"), "[text]\nsize = 12\n").unwrap();

        let matches = build_cli().get_matches_from(vec!["test", "--config", "custom.toml"]);
        let path = get_config_path(&matches, dir.path()).unwrap();
        assert_eq!(path, Some(dir.path().join("custom.toml")));

        let matches = build_cli().get_matches_from(vec!["test", "-c", "missing.toml"]);
        assert!(matches!(
            get_config_path(&matches, dir.path()),
            Err(AppError::ConfigError(_))
        ));
    }

    #[test]
    fn test_get_config_path_finds_local_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("reportrc.toml"), "[text]\nsize = 13\n").unwrap();
        let matches = build_cli().get_matches_from(vec!["test"]);
        let path = get_config_path(&matches, dir.path()).unwrap();
        assert_eq!(path, Some(dir.path().join("reportrc.toml")));
        assert_eq!(load_style(path.as_deref()).text.size, 13);
    }

    #[test]
    fn test_font_config_only_when_requested() {
        let matches = build_cli().get_matches_from(vec!["test"]);
        assert!(get_font_config(&matches).is_none());

        let matches = build_cli().get_matches_from(vec!["test", "--default-font", "times"]);
        let cfg = get_font_config(&matches).unwrap();
        assert_eq!(cfg.default_font.as_deref(), Some("times"));
        assert_eq!(cfg.code_font.as_deref(), Some("courier"));
    }

    #[test]
    fn test_format_labels() {
        assert_eq!(format_labels("lower-roman", 4).unwrap(), "i\nii\niii\niv");
        assert_eq!(format_labels("decimal", 0).unwrap(), "");
        assert!(matches!(
            format_labels("greek", 3),
            Err(AppError::Report(ReportError::Numbering(_)))
        ));
    }

    #[test]
    fn test_labels_flags() {
        let matches =
            build_cli().get_matches_from(vec!["test", "--labels", "upper-alpha", "--count", "3"]);
        assert_eq!(matches.get_one::<String>("labels").unwrap(), "upper-alpha");
        assert_eq!(*matches.get_one::<usize>("count").unwrap(), 3);
    }

    #[test]
    fn test_run_dry_run_returns_ok() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("report.toml");
        fs::write(
            &manifest,
            "[[block]]\nkind = \"heading\"\ntext = \"Small\"\n",
        )
        .unwrap();

        let matches = build_cli().get_matches_from(vec![
            "test",
            "-m",
            manifest.to_str().unwrap(),
            "-o",
            dir.path().join("never.pdf").to_str().unwrap(),
            "--dry-run",
            "-q",
        ]);
        assert!(run(matches).is_ok());
        assert!(!dir.path().join("never.pdf").exists());
    }

    #[test]
    fn test_run_reports_manifest_errors() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("bad.toml");
        fs::write(&manifest, "[[block]]\nkind = \"chart\"\n").unwrap();

        let matches = build_cli().get_matches_from(vec![
            "test",
            "-m",
            manifest.to_str().unwrap(),
            "--dry-run",
        ]);
        assert!(matches!(
            run(matches),
            Err(AppError::Report(ReportError::ManifestError { .. }))
        ));
    }
}
