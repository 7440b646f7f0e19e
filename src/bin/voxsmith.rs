//! voxsmith CLI — text or SSML in, WAV out.
//!
//! ```text
//! voxsmith --config speaker.json --text "Hello, world." --output hello.wav
//! voxsmith --config speaker.json --input story.ssml --voice af_luna -v
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use voxsmith::{Speaker, SpeakerConfig};

/// Synthesize speech from text or SSML with a Kokoro-style ONNX voice model.
#[derive(Parser, Debug)]
#[command(name = "voxsmith")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Speaker config (JSON)
    #[arg(short, long, default_value = "speaker.json")]
    config: PathBuf,

    /// Text or SSML to speak
    #[arg(short, long, conflicts_with = "input")]
    text: Option<String>,

    /// File holding text or SSML to speak
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output WAV path
    #[arg(short, long, default_value = "output.wav")]
    output: PathBuf,

    /// Voice name or alias (overrides the config's default voice)
    #[arg(long)]
    voice: Option<String>,

    /// Speed multiplier
    #[arg(long)]
    speed: Option<f32>,

    /// Global emotion expressiveness
    #[arg(long)]
    expressiveness: Option<f32>,

    /// List the voices in the archive and exit
    #[arg(long)]
    list_voices: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = SpeakerConfig::load(&cli.config)?;
    let mut speaker = Speaker::from_config(&config)?;

    if cli.list_voices {
        for voice in speaker.voices() {
            println!("{}", voice);
        }
        return Ok(());
    }

    if let Some(voice) = cli.voice {
        speaker.set_voice(voice);
    }
    if let Some(speed) = cli.speed {
        speaker.set_speed(speed);
    }
    if let Some(expressiveness) = cli.expressiveness {
        speaker.set_expressiveness(expressiveness);
    }

    let input = match (cli.text, cli.input) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Cannot read input: {}", path.display()))?,
        (None, None) => bail!("nothing to say: pass --text or --input"),
    };

    info!(voice = speaker.voice(), output = %cli.output.display(), "synthesizing");
    speaker.say_to_file(&input, &cli.output)
}
