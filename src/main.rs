use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use svgmin::{IdMatch, Options, minify_stream};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    Yes,
    No,
}

#[derive(Clone, Copy, ValueEnum)]
enum IdMatchArg {
    /// Drop ids starting with a listed prefix
    ValuePrefix,
    /// Drop ids that are a prefix of a listed entry
    PrefixValue,
}

#[derive(Parser)]
#[command(name = "svgmin")]
#[command(about = "A streaming SVG minifier", long_about = None)]
struct Cli {
    /// Input file (use - for stdin)
    #[arg(default_value = "-")]
    input: PathBuf,

    /// Output file (use - for stdout)
    #[arg(short, long, default_value = "-")]
    output: PathBuf,

    /// Convert style properties into XML attributes
    #[arg(long, value_enum, default_value = "yes")]
    style_to_xml: Toggle,

    /// Simplify style properties
    #[arg(long, value_enum, default_value = "yes")]
    simplify_style: Toggle,

    /// Keep metadata (default)
    #[arg(long, overrides_with = "remove_metadata")]
    keep_metadata: bool,

    /// Remove metadata
    #[arg(long, overrides_with = "keep_metadata")]
    remove_metadata: bool,

    /// Keep Inkscape/Sodipodi/Illustrator data
    #[arg(long, overrides_with = "remove_editor_data")]
    keep_editor_data: bool,

    /// Remove Inkscape/Sodipodi/Illustrator data (default)
    #[arg(long, overrides_with = "keep_editor_data")]
    remove_editor_data: bool,

    /// Remove ids on drawing elements matching this prefix (repeatable)
    #[arg(long = "remove-id", value_name = "PREFIX")]
    remove_ids: Vec<String>,

    /// Keep ids matching this prefix, overriding the defaults (repeatable)
    #[arg(long = "keep-id", value_name = "PREFIX")]
    keep_ids: Vec<String>,

    /// Remove every element with this name (repeatable)
    #[arg(long = "remove-tag", value_name = "NAME")]
    remove_tags: Vec<String>,

    /// Remove elements and attributes with this namespace prefix (repeatable)
    #[arg(long = "remove-namespace", value_name = "PREFIX")]
    remove_namespaces: Vec<String>,

    /// How ids are compared against the removal list
    #[arg(long, value_enum, default_value = "value-prefix")]
    id_match: IdMatchArg,

    /// Disable output indentation
    #[arg(long)]
    compact: bool,

    /// Print size comparison
    #[arg(short, long)]
    stats: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn options(&self) -> Options {
        let mut options = Options {
            convert_style: matches!(self.style_to_xml, Toggle::Yes),
            simplify_style: matches!(self.simplify_style, Toggle::Yes),
            keep_metadata: self.keep_metadata || !self.remove_metadata,
            keep_editor_data: self.keep_editor_data && !self.remove_editor_data,
            auto_format: !self.compact,
            id_match: match self.id_match {
                IdMatchArg::ValuePrefix => IdMatch::ValueStartsWithPrefix,
                IdMatchArg::PrefixValue => IdMatch::PrefixStartsWithValue,
            },
            ..Options::default()
        };

        for id in &self.remove_ids {
            options = options.remove_id(id.as_str());
        }
        for id in &self.keep_ids {
            options = options.keep_id(id);
        }
        for tag in &self.remove_tags {
            options = options.remove_tag(tag.as_str());
        }
        for prefix in &self.remove_namespaces {
            options = options.remove_namespace(prefix.as_str());
        }
        options
    }
}

/// Counts the bytes passing through a reader or writer.
struct Counted<T> {
    inner: T,
    bytes: usize,
}

impl<T> Counted<T> {
    fn new(inner: T) -> Self {
        Self { inner, bytes: 0 }
    }
}

impl<T: Read> Read for Counted<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bytes += n;
        Ok(n)
    }
}

impl<T: Write> Write for Counted<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.bytes += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = cli.options();

    let input: Box<dyn Read> = if cli.input.as_os_str() == "-" {
        Box::new(io::stdin().lock())
    } else {
        Box::new(File::open(&cli.input)?)
    };
    let output: Box<dyn Write> = if cli.output.as_os_str() == "-" {
        Box::new(io::stdout().lock())
    } else {
        Box::new(File::create(&cli.output)?)
    };

    let mut input = BufReader::new(Counted::new(input));
    let mut output = BufWriter::new(Counted::new(output));

    minify_stream(&mut input, &mut output, &options)?;
    output.flush()?;

    if cli.stats {
        let input_len = input.get_ref().bytes;
        let output_len = output.get_ref().bytes;
        let saved = input_len.saturating_sub(output_len);
        let percent = if input_len > 0 {
            (saved as f64 / input_len as f64) * 100.0
        } else {
            0.0
        };
        eprintln!(
            "{} -> {} bytes ({:.1}% smaller)",
            input_len, output_len, percent
        );
    }

    Ok(())
}
