use als_codec::als::serializer::pattern_text;
use als_codec::{
    AlsBody, AlsCompressor, AlsDocument, AlsError, AlsParser, CompressorConfig, PatternKind,
    SourceKind,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// ALS structural codec for CSV and JSON data
#[derive(Parser)]
#[command(name = "als")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Configuration file path (JSON)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Source formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Comma-separated table with a header row
    Csv,
    /// Any JSON value
    Json,
    /// Detect from file extension, document header or content
    Auto,
}

impl Format {
    fn as_str(&self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Json => "json",
            Format::Auto => "auto",
        }
    }

    fn source_kind(&self) -> Option<SourceKind> {
        match self {
            Format::Csv => Some(SourceKind::Csv),
            Format::Json => Some(SourceKind::Json),
            Format::Auto => None,
        }
    }
}

/// Overrides applied on top of the configuration file
#[derive(Debug, Default, Args)]
struct ConfigOverrides {
    /// Minimum structural ratio before falling back to generic compression
    #[arg(long, value_name = "RATIO")]
    threshold: Option<f64>,

    /// Minimum pattern length considered for the dictionary
    #[arg(long, value_name = "N")]
    min_pattern_length: Option<usize>,

    /// Fewest cells a column run may cover (0 disables runs)
    #[arg(long, value_name = "N")]
    min_run_length: Option<usize>,

    /// Pattern discovery workers (0 = auto)
    #[arg(short = 'j', long, value_name = "N")]
    parallelism: Option<usize>,

    /// zstd level for the fallback compressor (1-22)
    #[arg(long, value_name = "LEVEL")]
    fallback_level: Option<i32>,
}

impl ConfigOverrides {
    fn apply(&self, mut config: CompressorConfig) -> CompressorConfig {
        if let Some(threshold) = self.threshold {
            config = config.with_ctx_fallback_threshold(threshold);
        }
        if let Some(length) = self.min_pattern_length {
            config = config.with_min_pattern_length(length);
        }
        if let Some(length) = self.min_run_length {
            config = config.with_min_run_length(length);
        }
        if let Some(parallelism) = self.parallelism {
            config = config.with_parallelism(parallelism);
        }
        if let Some(level) = self.fallback_level {
            config = config.with_fallback_level(level);
        }
        config
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Encode CSV or JSON as ALS text
    Compress {
        /// Read from FILE, '-' for stdin
        #[arg(short, long, value_name = "FILE", default_value = "-")]
        input: String,

        /// Write to FILE, '-' for stdout
        #[arg(short, long, value_name = "FILE", default_value = "-")]
        output: String,

        /// Source format of the input
        #[arg(short, long, value_enum, default_value = "auto")]
        format: Format,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },

    /// Decode ALS text back to CSV or JSON
    Decompress {
        /// Read from FILE, '-' for stdin
        #[arg(short, long, value_name = "FILE", default_value = "-")]
        input: String,

        /// Write to FILE, '-' for stdout
        #[arg(short, long, value_name = "FILE", default_value = "-")]
        output: String,

        /// Output format: csv, json, or the format named in the document header
        #[arg(short, long, value_enum, default_value = "auto")]
        format: Format,
    },

    /// Describe an ALS document: body kind, dictionary and sizes
    Info {
        /// Read from FILE, '-' for stdin
        #[arg(short, long, value_name = "FILE", default_value = "-")]
        input: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(config_path) => load_config(config_path)?,
        None => CompressorConfig::default(),
    };

    match cli.command {
        Commands::Compress {
            input,
            output,
            format,
            overrides,
        } => {
            compress_command(&input, &output, format, overrides.apply(config), cli.quiet)?;
        }
        Commands::Decompress {
            input,
            output,
            format,
        } => {
            decompress_command(&input, &output, format, cli.quiet)?;
        }
        Commands::Info { input } => {
            info_command(&input, cli.verbose > 0, cli.quiet)?;
        }
    }

    Ok(())
}

/// `-q` wins over `-v`; `RUST_LOG` overrides both.
fn setup_logging(verbose: u8, quiet: bool) {
    let level = log_level(verbose, quiet);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    debug!("log level {}", level);
}

fn log_level(verbose: u8, quiet: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    }
}

/// Load configuration from a JSON file
///
/// Missing fields take their default values.
fn load_config(path: &Path) -> Result<CompressorConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: CompressorConfig = serde_json::from_str(&text)
        .with_context(|| format!("Invalid config file: {}", path.display()))?;
    debug!("Loaded configuration from {}: {:?}", path.display(), config);
    Ok(config)
}

/// Read a whole file, or stdin for `-`
fn read_input(input: &str) -> Result<Vec<u8>> {
    if input == "-" {
        let mut buffer = Vec::new();
        io::stdin()
            .read_to_end(&mut buffer)
            .context("Failed to read from stdin")?;
        Ok(buffer)
    } else {
        fs::read(input).with_context(|| format!("Failed to read input file: {}", input))
    }
}

/// Write to a file, or stdout for `-`
fn write_output(output: &str, content: &str) -> Result<()> {
    if output == "-" {
        let mut stdout = io::stdout().lock();
        stdout
            .write_all(content.as_bytes())
            .context("Failed to write to stdout")?;
        stdout.flush().context("Failed to flush stdout")?;
    } else {
        fs::write(output, content)
            .with_context(|| format!("Failed to write output file: {}", output))?;
    }
    Ok(())
}

/// Detect the source format of compress input from its extension or content
fn detect_format(input: &str, content: &[u8]) -> SourceKind {
    let extension = Path::new(input)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("csv") => return SourceKind::Csv,
        Some("json") => return SourceKind::Json,
        _ => {}
    }

    // JSON documents start with [ or {
    match content.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'[') | Some(b'{') => SourceKind::Json,
        _ => SourceKind::Csv,
    }
}

fn compress_command(
    input: &str,
    output: &str,
    format: Format,
    config: CompressorConfig,
    quiet: bool,
) -> Result<()> {
    let start_time = Instant::now();

    info!("compress {} -> {}", input, output);

    let compressor = AlsCompressor::with_config(config).map_err(|e| map_als_error(e, "Configuration"))?;

    let input_data = read_input(input)?;
    debug!("Read {} bytes from input", input_data.len());

    let kind = match format.source_kind() {
        Some(kind) => kind,
        None => {
            let detected = detect_format(input, &input_data);
            info!("Auto-detected format: {}", detected);
            detected
        }
    };

    let progress = create_progress_bar(quiet, "Compressing");
    let (compressed, report) = compressor
        .compress_with_report(kind, &input_data)
        .map_err(|e| map_als_error(e, &format!("{} compression", kind.as_str().to_uppercase())))?;
    progress.finish_and_clear();

    debug!("Compression report:\n{}", report);

    write_output(output, &compressed)?;

    let total_duration = start_time.elapsed();

    if !quiet {
        let input_size = report.input_bytes;
        let output_size = report.output_bytes;
        let savings = if input_size > 0 {
            ((1.0 - (output_size as f64 / input_size as f64)) * 100.0).max(0.0)
        } else {
            0.0
        };
        eprintln!(
            "{} -> {} {} body, {} -> {} ({:.2}x, {:.1}% saved, {} dictionary entries) in {:.3}s",
            input,
            kind,
            report.body_kind,
            format_bytes(input_size),
            format_bytes(output_size),
            report.compression_ratio(),
            savings,
            report.dictionary.total(),
            total_duration.as_secs_f64()
        );
    }

    Ok(())
}

fn decompress_command(input: &str, output: &str, format: Format, quiet: bool) -> Result<()> {
    let start_time = Instant::now();

    info!("decompress {} -> {}", input, output);
    debug!("Output format: {}", format.as_str());

    let als_data = read_input(input)?;
    let input_size = als_data.len();
    debug!("Read {} bytes from input", input_size);

    let parser = AlsParser::new();
    let kind = match format.source_kind() {
        Some(kind) => kind,
        None => {
            let text = std::str::from_utf8(&als_data)
                .map_err(|e| map_als_error(AlsError::from(e), "ALS decompression"))?;
            let (_, kind) = parser
                .header(text)
                .map_err(|e| map_als_error(e, "ALS decompression"))?;
            info!("Document header names format: {}", kind);
            kind
        }
    };

    let progress = create_progress_bar(quiet, "Decompressing");
    let decompressed = parser
        .decode_bytes_to(kind, &als_data)
        .map_err(|e| map_als_error(e, &format!("ALS decompression to {}", kind.as_str().to_uppercase())))?;
    progress.finish_and_clear();

    write_output(output, &decompressed)?;

    let total_duration = start_time.elapsed();

    if !quiet {
        let output_size = decompressed.len();
        let expansion_ratio = if input_size > 0 {
            output_size as f64 / input_size as f64
        } else {
            0.0
        };
        eprintln!(
            "{} -> {}, {} -> {} ({:.2}x) in {:.3}s",
            input,
            kind,
            format_bytes(input_size),
            format_bytes(output_size),
            expansion_ratio,
            total_duration.as_secs_f64()
        );
    }

    Ok(())
}

fn info_command(input: &str, verbose: bool, quiet: bool) -> Result<()> {
    info!("info {}", input);

    let als_data = read_input(input)?;
    let text = std::str::from_utf8(&als_data)
        .map_err(|e| map_als_error(AlsError::from(e), "ALS parsing"))?;

    let parser = AlsParser::new();
    let parse_start = Instant::now();
    let doc = parser.parse(text).map_err(|e| map_als_error(e, "ALS parsing"))?;
    let decoded = parser
        .decode_to(doc.source, text)
        .map_err(|e| map_als_error(e, "ALS decoding"))?;
    debug!("Parsed and decoded in {:.3}s", parse_start.elapsed().as_secs_f64());

    if !quiet {
        display_document_info(&doc, text.len(), decoded.len(), verbose);
    }

    Ok(())
}

/// Print the summary for a parsed document
fn display_document_info(doc: &AlsDocument, encoded_size: usize, decoded_size: usize, verbose: bool) {
    let body = if doc.is_fallback() {
        "fallback (zstd + base64)"
    } else {
        "structural"
    };
    println!("version:   {}", doc.version);
    println!("source:    {}", doc.source);
    println!("body:      {}", body);
    println!("encoded:   {}", format_bytes(encoded_size));
    println!("decoded:   {}", format_bytes(decoded_size));
    if encoded_size > 0 {
        println!("ratio:     {:.2}x", decoded_size as f64 / encoded_size as f64);
    }

    match &doc.body {
        AlsBody::Table { columns, rows } => {
            println!("columns:   {}", columns.join(", "));
            println!("rows:      {}", rows.len());
        }
        AlsBody::Tree(tokens) => println!("tokens:    {}", tokens.len()),
        AlsBody::Fallback(payload) => println!("payload:   {} base64 chars", payload.len()),
    }

    if doc.dictionary.is_empty() {
        return;
    }
    let composition: Vec<String> = [
        PatternKind::Literal,
        PatternKind::KeySet,
        PatternKind::RowSegment,
        PatternKind::Subtree,
    ]
    .into_iter()
    .filter_map(|kind| match doc.dictionary.count_of(kind) {
        0 => None,
        count => Some(format!("{} {}", count, kind)),
    })
    .collect();
    println!("dictionary: {} ({})", doc.dictionary.len(), composition.join(", "));
    if verbose {
        for (id, pattern) in doc.dictionary.iter().enumerate() {
            let text = pattern_text(pattern);
            let shown = if text.chars().count() > 50 {
                format!("{}...", text.chars().take(47).collect::<String>())
            } else {
                text
            };
            println!("  _{}: {}", id, shown);
        }
    }
}

/// Spinner on stderr, hidden with `-q`
fn create_progress_bar(quiet: bool, message: &str) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Binary-prefixed size, e.g. `1.50 KB`
fn format_bytes(bytes: usize) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Map AlsError to anyhow::Error with context and a hint where one helps
fn map_als_error(error: AlsError, context: &str) -> anyhow::Error {
    match error {
        AlsError::KindMismatch { requested, found } => anyhow::anyhow!(
            "{}: document was encoded from {}, not {} (use --format {} or --format auto)",
            context,
            found,
            requested,
            found
        ),
        AlsError::InvalidConfig(message) => {
            anyhow::anyhow!("{}: invalid configuration: {}", context, message)
        }
        other => anyhow::Error::new(other).context(context.to_string()),
    }
}
