use std::io::Write;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use revdiff_core::config::EngineConfig;
use revdiff_core::localise::{localise_line_numbers, LineNumberTemplate};

/// Print the formatted diff of two text files.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Older text
    old: Option<Utf8PathBuf>,

    /// Newer text
    new: Option<Utf8PathBuf>,

    /// External diff tool, invoked as `<command> <old-file> <new-file>`
    #[arg(long)]
    external: Option<String>,

    /// Timeout for the external tool, in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Skip the in-process libgit2 backend
    #[arg(long)]
    no_in_process: bool,

    /// Append the generator trailer
    #[arg(long)]
    debug: bool,

    /// Print the backend chain as JSON and exit
    #[arg(long)]
    list_backends: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    revdiff_core::logging::init_tracing().context("failed to install tracing subscriber")?;

    let mut config = EngineConfig::from_env().context("failed to read configuration")?;
    if let Some(command) = cli.external {
        config.external_command = Some(command);
    }
    if let Some(timeout) = cli.timeout {
        config.external_timeout_secs = timeout;
    }
    if cli.no_in_process {
        config.in_process_backend = false;
    }
    config.debug_comments |= cli.debug;
    let chain = config.backend_chain();

    let mut stdout = std::io::stdout().lock();
    if cli.list_backends {
        serde_json::to_writer_pretty(&mut stdout, &chain.summaries())
            .context("failed to write backend list")?;
        writeln!(stdout)?;
        return Ok(());
    }

    let (Some(old_path), Some(new_path)) = (cli.old, cli.new) else {
        anyhow::bail!("both <OLD> and <NEW> are required");
    };
    let old = std::fs::read_to_string(&old_path)
        .with_context(|| format!("failed to read {old_path}"))?;
    let new = std::fs::read_to_string(&new_path)
        .with_context(|| format!("failed to read {new_path}"))?;

    let body = chain.compute(&old, &new);
    let body = localise_line_numbers(
        &body,
        &LineNumberTemplate::english(),
        config.reduced_line_numbers,
    );
    stdout
        .write_all(body.as_bytes())
        .context("failed to write diff")?;
    Ok(())
}
