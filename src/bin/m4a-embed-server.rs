use clap::Parser;
use m4a_embed::{server, Config, TaggingPolicy};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "m4a-embed-server")]
#[command(about = "HTTP service that embeds metadata and cover art into M4A files", long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "M4A_EMBED_BIND", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// Directory for scratch audio files (defaults to the system temp dir)
    #[arg(long, env = "M4A_EMBED_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Timeout for fetching cover art, in seconds
    #[arg(long, env = "M4A_EMBED_IMAGE_TIMEOUT_SECS", default_value_t = 10)]
    image_timeout_secs: u64,

    /// Timeout for fetching audio, in seconds (no timeout if unset)
    #[arg(long, env = "M4A_EMBED_AUDIO_TIMEOUT_SECS")]
    audio_timeout_secs: Option<u64>,

    /// Fail the request instead of sending an untagged file when tagging fails
    #[arg(long, env = "M4A_EMBED_STRICT_TAGGING")]
    strict_tagging: bool,

    /// User-Agent for upstream requests
    #[arg(long, env = "M4A_EMBED_USER_AGENT")]
    user_agent: Option<String>,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        let mut config = Config::default()
            .with_image_timeout(Duration::from_secs(cli.image_timeout_secs))
            .with_audio_timeout(cli.audio_timeout_secs.map(Duration::from_secs))
            .with_tagging_policy(if cli.strict_tagging {
                TaggingPolicy::Strict
            } else {
                TaggingPolicy::BestEffort
            });

        config.bind = cli.bind;
        if let Some(dir) = cli.scratch_dir {
            config = config.with_scratch_dir(dir);
        }
        if let Some(user_agent) = cli.user_agent {
            config.user_agent = user_agent;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,m4a_embed=debug,tower_http=info")),
        )
        .init();

    let config = Config::from(cli);
    tracing::info!(
        "Scratch directory: {}, tagging policy: {:?}",
        config.scratch_dir.display(),
        config.tagging_policy
    );

    server::run(config).await?;

    Ok(())
}
