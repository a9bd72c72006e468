use clap::{Parser, Subcommand};
use framefill::{config, output, run};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Rendering flags. Each one only overrides the config file when given.
#[derive(clap::Args, Clone, Default)]
struct RenderArgs {
    /// Enlarge images narrower than this many pixels
    #[arg(long)]
    minimum_width: Option<u32>,

    /// JPEG quality of rendered images (1-100)
    #[arg(long)]
    quality: Option<u8>,

    /// Leave images as stored, ignoring the EXIF orientation
    #[arg(long)]
    no_rotate: bool,

    /// Trim white scanner borders
    #[arg(long)]
    remove_border: bool,

    /// Do not write the directory name on each image
    #[arg(long)]
    no_directory: bool,

    /// Write the source filename on each image
    #[arg(long)]
    show_filename: bool,

    /// Write the output index on each image (disables the cache)
    #[arg(long)]
    show_index: bool,

    /// Write the EXIF capture date on each image
    #[arg(long)]
    date: bool,

    /// Reuse rendered images from the content cache
    #[arg(long)]
    cache: bool,

    /// Delete cache files no entry refers to
    #[arg(long)]
    prune_cache: bool,

    /// Skip the run when the input file count is unchanged
    #[arg(long)]
    check: bool,

    /// Record every copy in copy_list.txt
    #[arg(long)]
    copy_log: bool,
}

impl RenderArgs {
    /// Config overlay holding only the flags that were given.
    fn overrides(&self) -> toml::Value {
        let mut table = toml::Table::new();
        let mut annotate = toml::Table::new();
        let mut cache_settings = toml::Table::new();

        if let Some(width) = self.minimum_width {
            table.insert("minimum_width".into(), toml::Value::Integer(width.into()));
        }
        if let Some(quality) = self.quality {
            table.insert("quality".into(), toml::Value::Integer(quality.into()));
        }
        if self.no_rotate {
            table.insert("rotate".into(), toml::Value::Boolean(false));
        }
        for (flag, key) in [
            (self.remove_border, "remove_border"),
            (self.cache, "cache"),
            (self.check, "check"),
            (self.copy_log, "copy_log"),
        ] {
            if flag {
                table.insert(key.into(), toml::Value::Boolean(true));
            }
        }

        if self.no_directory {
            annotate.insert("directory".into(), toml::Value::Boolean(false));
        }
        for (flag, key) in [
            (self.show_filename, "filename"),
            (self.show_index, "index"),
            (self.date, "date"),
        ] {
            if flag {
                annotate.insert(key.into(), toml::Value::Boolean(true));
            }
        }
        if self.prune_cache {
            cache_settings.insert("prune_unreferenced".into(), toml::Value::Boolean(true));
        }

        if !annotate.is_empty() {
            table.insert("annotate".into(), toml::Value::Table(annotate));
        }
        if !cache_settings.is_empty() {
            table.insert("cache_settings".into(), toml::Value::Table(cache_settings));
        }
        toml::Value::Table(table)
    }
}

#[derive(Parser)]
#[command(name = "framefill")]
#[command(about = "Fill a digital photo frame from a tree of JPEGs")]
#[command(long_about = "\
Fill a digital photo frame from a tree of JPEGs

Every .jpg under the input tree is copied to the output tree in random
order, rotated upright, optionally trimmed, enlarged and annotated:

  output/
  ├── 000000/
  │   ├── 000000.jpg
  │   ├── ...
  │   └── 000099.jpg
  └── 000100/
      └── 000100.jpg

Exclusions:
  _photoframe_exclude.txt        skip the directory it is in, and below
  _photoframe_exclude_list.txt   skip the files it lists, one per line

Run 'framefill gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Config file (TOML); flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for the lock, cache, check file and run logs
    #[arg(long, default_value = ".framefill", global = true)]
    state_dir: PathBuf,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render the input tree into the output tree
    Run {
        /// Directory tree of source photos
        input: PathBuf,
        /// Photo frame directory (existing contents are replaced)
        output: PathBuf,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run {
            input,
            output: output_dir,
            json,
            render,
        } => {
            let config = config::load_config(cli.config.as_deref(), render.overrides())?;
            let paths = run::RunPaths {
                input,
                output: output_dir,
                state_dir: cli.state_dir,
            };
            let summary = run::run(&config, &paths)?;
            if json {
                output::print_run_summary_json(&summary)?;
            } else {
                output::print_run_summary(&summary);
            }
            if !summary.success() {
                std::process::exit(1);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr so `--json` output stays parseable.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
