//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to the command handlers.

use crate::commands::{self, PlayArgs};
use crate::logging;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process;

/// Terminal audio player with tempo-locked amplitude bars
#[derive(Parser)]
#[command(name = "beatbars")]
#[command(version)]
#[command(about = "Terminal audio player with tempo-locked amplitude bars")]
#[command(long_about = "Terminal audio player with tempo-locked amplitude bars.\n\nEach bar shows the track's loudness for one slice of a beat: with 32 bars the\nrow scrolls through exactly one beat, sampled at a cadence derived from the tempo.\n\nDEFAULT COMMAND:\n    If no command is specified, 'play' is used by default.\n\nKEYS:\n    Space      play / pause\n    q, Esc     quit\n\nEXAMPLES:\n    # Play a track at the configured tempo\n    $ beatbars song.wav\n\n    # Override tempo and bar count\n    $ beatbars play song.mp3 --bpm 128 --bars 16\n\n    # Toggle playback from another terminal\n    $ pkill -USR1 beatbars")]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/beatbars/beatbars.toml\n    Logs:               ~/.local/state/beatbars/beatbars.log.*"
)]
struct Cli {
    #[command(flatten)]
    play: PlayFlags,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options shared by the default command and `play`.
#[derive(Args, Clone)]
struct PlayFlags {
    /// Audio file to play (WAV, or anything ffmpeg can decode)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Song tempo in beats per minute
    #[arg(long, value_name = "BPM")]
    bpm: Option<f64>,

    /// Number of bars (samples per beat)
    #[arg(long, value_name = "N")]
    bars: Option<usize>,

    /// Output device: "default", an index or a name from list-devices
    #[arg(short, long, value_name = "DEVICE")]
    device: Option<String>,
}

impl PlayFlags {
    fn into_args(self) -> Option<PlayArgs> {
        Some(PlayArgs {
            file: self.file?,
            bpm: self.bpm,
            bars: self.bars,
            device: self.device,
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Play a track with the live bar display (default)
    ///
    /// Press Space to start, pause or resume, Escape/q to quit.
    #[command(visible_alias = "p")]
    Play {
        #[command(flatten)]
        flags: PlayFlags,
    },

    /// Open configuration file in your preferred editor
    ///
    /// Uses $EDITOR environment variable or falls back to nano/vi.
    #[command(visible_alias = "c")]
    Config,

    /// List available audio output devices
    #[command(name = "list-devices")]
    ListDevices,

    /// Show recent log entries
    Logs,

    /// Generate shell completion script
    ///
    /// Examples:
    ///   beatbars completions bash > beatbars.bash
    ///   beatbars completions zsh > _beatbars
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the application based on command-line arguments.
///
/// # Exit Codes
/// - 0: Success
/// - 1: General error
/// - 2: Usage error (missing file)
///
/// # Errors
/// - If logging initialization fails
/// - If command execution fails
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Commands that print to the terminal and need no logging
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "beatbars", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::ListDevices) => return commands::handle_list_devices(),
        Some(Commands::Logs) => return commands::handle_logs(),
        _ => {}
    }

    logging::init_logging()?;

    match cli.command {
        None | Some(Commands::Play { .. }) => {
            let flags = match cli.command {
                Some(Commands::Play { flags }) => flags,
                _ => cli.play,
            };
            let Some(args) = flags.into_args() else {
                eprintln!("Error: no audio file given\n");
                let _ = Cli::command().print_help();
                process::exit(2);
            };
            commands::handle_play(args)?;
        }
        Some(Commands::Config) => {
            commands::handle_config()?;
        }
        Some(Commands::Completions { .. }) | Some(Commands::ListDevices) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_bare_file_defaults_to_play() {
        let cli = Cli::try_parse_from(["beatbars", "song.wav", "--bpm", "128"]).unwrap();
        assert!(cli.command.is_none());

        let args = cli.play.into_args().unwrap();
        assert_eq!(args.file, PathBuf::from("song.wav"));
        assert_eq!(args.bpm, Some(128.0));
        assert_eq!(args.bars, None);
    }

    #[test]
    fn test_play_subcommand_flags() {
        let cli = Cli::try_parse_from(["beatbars", "play", "a.mp3", "--bars", "16", "-d", "2"])
            .unwrap();
        let Some(Commands::Play { flags }) = cli.command else {
            panic!("expected play command");
        };

        let args = flags.into_args().unwrap();
        assert_eq!(args.bars, Some(16));
        assert_eq!(args.device.as_deref(), Some("2"));
    }

    #[test]
    fn test_no_file_yields_no_args() {
        let cli = Cli::try_parse_from(["beatbars"]).unwrap();
        assert!(cli.play.into_args().is_none());
    }
}
