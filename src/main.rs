//! tts-studio: batch script and web UI for text-to-speech with waveform plots.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tts_studio::catalog::VoiceCatalog;
use tts_studio::config::{EngineConfig, StudioConfig};
use tts_studio::engines::coqui;
use tts_studio::script;
use tts_studio::studio::Studio;
use tts_studio::SynthesisEngine;

#[derive(Parser)]
#[command(name = "tts-studio")]
#[command(author, version, about = "Text-to-speech studio with waveform plots", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON config file (missing file = defaults)
    #[arg(short, long, default_value = "studio.json", global = true)]
    config: PathBuf,

    /// Engine to synthesize with (overrides the config file)
    #[arg(short, long, value_enum, global = true)]
    engine: Option<EngineKind>,

    /// Path to the engine's binary
    #[arg(short, long, global = true)]
    binary: Option<PathBuf>,

    /// Coqui model name, e.g. "tts_models/en/ljspeech/vits" (default: first listed)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Path to Coqui's `tts-server` binary
    #[arg(long, global = true)]
    server_binary: Option<PathBuf>,

    /// Agree to the Coqui model license (sets COQUI_TOS_AGREED=1)
    #[arg(long, global = true)]
    accept_license: bool,

    /// Directory for generated audio and plots
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize the fixed demo sentence to <output-dir>/output.wav
    Script,

    /// Serve the interactive studio in the browser
    App {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List the speakers and localizations the engine offers
    Voices,

    /// List the Coqui models the `tts` tool knows about
    Models,
}

#[derive(ValueEnum, Clone, Copy)]
enum EngineKind {
    Coqui,
    Espeak,
}

impl Cli {
    /// The config file with command-line overrides applied.
    fn resolve_config(&self) -> Result<StudioConfig, Box<dyn std::error::Error>> {
        let mut config = StudioConfig::load(&self.config)?;

        if let Some(kind) = self.engine {
            config.engine = match kind {
                EngineKind::Coqui => EngineConfig::Coqui {
                    binary: PathBuf::from(coqui::DEFAULT_BINARY),
                    server_binary: PathBuf::from(coqui::DEFAULT_SERVER_BINARY),
                    model: None,
                    accept_license: false,
                },
                EngineKind::Espeak => EngineConfig::Espeak {
                    binary: PathBuf::from(tts_studio::engines::espeak::DEFAULT_BINARY),
                    data_path: None,
                },
            };
        }

        match &mut config.engine {
            EngineConfig::Coqui {
                binary,
                server_binary,
                model,
                accept_license,
            } => {
                if let Some(b) = &self.binary {
                    *binary = b.clone();
                }
                if let Some(b) = &self.server_binary {
                    *server_binary = b.clone();
                }
                if self.model.is_some() {
                    *model = self.model.clone();
                }
                *accept_license |= self.accept_license;
            }
            EngineConfig::Espeak { binary, .. } => {
                if let Some(b) = &self.binary {
                    *binary = b.clone();
                }
            }
        }

        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    match cli.command {
        Commands::Script => {
            let mut engine = config.build_engine()?;
            let path = script::run(engine.as_mut(), &config.output_dir)?;
            log::info!("Wrote {}", path.display());
            println!("{}", script::SCRIPT_DONE);
        }

        Commands::App { host, port } => {
            let mut engine = config.build_engine()?;
            engine.prepare()?;
            let studio = Studio::new(engine, &config.output_dir)
                .with_waveform_options(config.waveform_options()?);
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            run_app(studio, &host, port)?;
        }

        Commands::Voices => {
            let mut engine = config.build_engine()?;
            let catalog = VoiceCatalog::discover(engine.as_mut());
            println!("Voices ({}):", engine.name());
            for speaker in catalog.speakers() {
                println!("  • {speaker}");
            }
            println!("Localizations:");
            for localization in catalog.localizations() {
                println!("  • {} ({})", localization.label, localization.code);
            }
        }

        Commands::Models => {
            let binary = match &config.engine {
                EngineConfig::Coqui { binary, .. } => binary.clone(),
                EngineConfig::Espeak { .. } => PathBuf::from(coqui::DEFAULT_BINARY),
            };
            for (i, model) in coqui::list_models(&binary)?.iter().enumerate() {
                println!("{:>3}: {model}", i + 1);
            }
        }
    }

    Ok(())
}

#[cfg(feature = "server")]
fn run_app(studio: Studio, host: &str, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(tts_studio::server::serve(studio, host, port))
}

#[cfg(not(feature = "server"))]
fn run_app(_studio: Studio, _host: &str, _port: u16) -> Result<(), Box<dyn std::error::Error>> {
    Err("tts-studio was built without the `server` feature; rebuild with --features server".into())
}
