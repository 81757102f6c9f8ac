use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tonegate::session::{InteractionMode, Tone};

/// `tonegate` - tone analysis and email drafting behind admission control.
#[derive(Parser, Debug)]
#[command(name = "tonegate")]
#[command(version)]
#[command(about = "Tone and sentiment analysis with cooldowns, daily quotas and retries.", long_about = None)]
pub struct Cli {
    /// Log at debug level regardless of config
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze text and print the structured report
    Analyze {
        /// Text to analyze (reads stdin when omitted)
        text: Option<String>,

        /// Interaction mode (draft, respond, analyze)
        #[arg(short, long)]
        mode: Option<InteractionMode>,

        /// Also generate this tone variant (proofread, professional, formal, casual, friendly)
        #[arg(short, long)]
        tone: Option<Tone>,

        /// Print the final session snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Transcribe an audio file
    Transcribe {
        /// Audio file (webm, wav, mp3, m4a, ogg, flac)
        path: PathBuf,

        /// Run a base analysis on the transcript afterwards
        #[arg(long)]
        analyze: bool,

        /// Interaction mode used with --analyze
        #[arg(short, long)]
        mode: Option<InteractionMode>,
    },

    /// Show remaining daily quota and active cooldowns
    Quota,

    /// Interactive session: analyze, switch modes and tones
    Shell {
        /// Starting interaction mode
        #[arg(short, long)]
        mode: Option<InteractionMode>,
    },

    /// Show configuration and storage paths
    Status,
}
