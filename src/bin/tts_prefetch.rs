use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use tts_prefetch::cache::CacheStore;
use tts_prefetch::config::{ConfigLoader, Overrides, ResolvedOptions};
use tts_prefetch::error::PrefetchError;
use tts_prefetch::fetch::HttpAssetSource;
use tts_prefetch::output::{ConsoleOutput, JsonOutput, OutputMode};
use tts_prefetch::prefetch::{PrefetchOptions, Prefetcher, RunSummary};

#[derive(Parser)]
#[command(name = "tts-prefetch")]
#[command(about = "Download assets referenced by Tabletop Simulator save files into the mod cache")]
#[command(version, author)]
struct Cli {
    /// Save files to prefetch assets for.
    #[arg(required = true)]
    infiles: Vec<PathBuf>,

    /// Path to a config file (defaults to ./tts-prefetch.json when present).
    #[arg(long)]
    config: Option<String>,

    /// Download assets even when they are already cached.
    #[arg(long)]
    refetch: bool,

    /// Write assets whose content type does not match the expected type.
    #[arg(long)]
    relax: bool,

    /// Resolve and report without fetching or writing anything.
    #[arg(long)]
    dry_run: bool,

    /// Game mod cache directory (contains Images/, Models/, Assetbundles/).
    #[arg(long)]
    gamedata: Option<Utf8PathBuf>,

    /// Request timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// User-Agent header for asset requests.
    #[arg(long)]
    user_agent: Option<String>,

    /// Emit machine-readable JSON summaries instead of progress lines.
    #[arg(long)]
    non_interactive: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<PrefetchError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &PrefetchError) -> u8 {
    match error {
        PrefetchError::SaveNotFound(_)
        | PrefetchError::SaveRead { .. }
        | PrefetchError::MalformedSave { .. }
        | PrefetchError::ConfigRead(_)
        | PrefetchError::ConfigParse(_) => 2,
        PrefetchError::Http { .. }
        | PrefetchError::ContentTypeMismatch { .. }
        | PrefetchError::ExtensionUndeterminable(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let config = ConfigLoader::load(cli.config.as_deref()).into_diagnostic()?;
    let options = ConfigLoader::resolve(
        config,
        Overrides {
            refetch: cli.refetch,
            ignore_content_type: cli.relax,
            dry_run: cli.dry_run,
            gamedata_dir: cli.gamedata,
            timeout_seconds: cli.timeout,
            user_agent: cli.user_agent,
        },
    )
    .into_diagnostic()?;

    let store = CacheStore::new(options.gamedata_dir.clone());
    let source = HttpAssetSource::new(&options.user_agent, options.timeout).into_diagnostic()?;
    let prefetcher = Prefetcher::new(
        store,
        source,
        PrefetchOptions {
            refetch: options.refetch,
            ignore_content_type: options.ignore_content_type,
            dry_run: options.dry_run,
        },
    );

    // Any batch-fatal error (missing save, content-type mismatch without
    // --relax, missing cache directory) stops the whole run, remaining
    // files included.
    for infile in &cli.infiles {
        let summary = match output_mode {
            OutputMode::Interactive => prefetcher
                .prefetch_save(infile, &ConsoleOutput)
                .into_diagnostic()?,
            OutputMode::NonInteractive => {
                let summary = prefetcher
                    .prefetch_save(infile, &JsonOutput)
                    .into_diagnostic()?;
                JsonOutput::print_summary(&summary).into_diagnostic()?;
                summary
            }
        };
        if matches!(output_mode, OutputMode::Interactive) {
            print_summary(&options, &summary);
        }
    }

    Ok(())
}

fn print_summary(options: &ResolvedOptions, summary: &RunSummary) {
    println!(
        "{}: {} fetched, {} cached, {} duplicate, {} failed",
        summary.save_name,
        summary.fetched.len() + summary.dry_run.len(),
        summary.cached.len(),
        summary.duplicates.len(),
        summary.failed.len()
    );
    if options.dry_run && !summary.dry_run.is_empty() {
        println!("(dry run: nothing was downloaded)");
    }
    for failed in &summary.failed {
        eprintln!("failed: {} ({})", failed.url, failed.reason);
    }
}
