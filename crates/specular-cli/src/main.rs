//! specular - mirror signed release channels to a local directory.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use specular_core::{Channel, ErrorVerdict, Mirror, MirrorOptions, Origin};

mod config;

#[derive(Parser)]
#[command(name = "specular", version, about = "Mirror signed release channels")]
struct Cli {
    /// Path to the JSON mirror configuration.
    config: PathBuf,

    /// Destination directory for the mirror.
    dest: PathBuf,

    /// Origin base URL; per-channel hosts are derived from its host.
    #[arg(long, default_value = Origin::DEFAULT_BASE)]
    base_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let conf = config::Config::load(&cli.config)?;

    // clean up in-flight scratch files on control-C
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, shutting down");
                cancel.cancel();
            }
        });
    }

    // Skipped failures still fail the process at the end, after making as
    // much progress as possible.
    let clean = Arc::new(AtomicBool::new(true));
    let filters = conf.filters;
    let options = MirrorOptions {
        channels: conf.channels.unwrap_or_else(Channel::all),
        filter: Box::new(move |name| filters.matches(name)),
        on_error: {
            let clean = Arc::clone(&clean);
            Box::new(move |_| {
                clean.store(false, Ordering::SeqCst);
                ErrorVerdict::Skip
            })
        },
    };

    let origin = Origin::new(&cli.base_url)?;
    let mirror = Mirror::new(origin, cli.dest, options);
    mirror.run(&cancel).await?;

    if !clean.load(Ordering::SeqCst) {
        anyhow::bail!("mirror finished with skipped failures");
    }
    Ok(())
}
