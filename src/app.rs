//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to appropriate command handlers.

use crate::commands;
use crate::logging;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process;

/// A terminal voice recorder with countdown and real-time waveform display
#[derive(Parser)]
#[command(name = "tapedeck")]
#[command(version)]
#[command(about = "Record microphone audio in the terminal, with a countdown and a live waveform")]
#[command(
    long_about = "A terminal voice recorder. Press Enter to arm a short countdown, record with a\nreal-time waveform display, and press Enter again to stop.\n\nDEFAULT COMMAND:\n    If no command is specified, 'record' is used by default.\n    Record options (-d, -o, --countdown) can be used without explicitly saying 'record'.\n\nEXAMPLES:\n    # Record interactively\n    $ tapedeck\n\n    # Record and save the take as WAV\n    $ tapedeck -o take.wav\n\n    # Record from a specific device with a 5 second countdown\n    $ tapedeck -d 2 --countdown 5\n\n    # List audio input devices\n    $ tapedeck list-devices\n\n    # Edit configuration file\n    $ tapedeck config"
)]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/tapedeck/tapedeck.toml\n    Logs:               ~/.local/state/tapedeck/tapedeck.log.*"
)]
struct Cli {
    /// Audio input device: "default", an index, or a name (record default command)
    #[arg(short, long, value_name = "DEVICE", global = true)]
    device: Option<String>,

    /// Write the finished take as a WAV file (record default command)
    #[arg(short, long, value_name = "FILE", global = true)]
    output: Option<PathBuf>,

    /// Countdown seconds before capture starts (record default command)
    #[arg(long, value_name = "SECONDS", global = true)]
    countdown: Option<u32>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record audio with countdown and real-time waveform (default)
    ///
    /// Enter/Space starts a countdown and then recording; Enter/Space stops;
    /// c or Escape cancels the countdown; q quits.
    #[command(visible_alias = "r")]
    Record {
        /// Audio input device: "default", an index, or a name
        #[arg(short, long, value_name = "DEVICE")]
        device: Option<String>,

        /// Write the finished take as a WAV file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Countdown seconds before capture starts
        #[arg(long, value_name = "SECONDS")]
        countdown: Option<u32>,
    },

    /// Open configuration file in your preferred editor
    ///
    /// Edit audio and countdown settings. Uses $EDITOR or falls back to
    /// nano/vim.
    #[command(visible_alias = "c")]
    Config,

    /// List available audio input devices
    ///
    /// Shows device IDs, names, and configurations to help configure
    /// the correct input device in tapedeck.toml.
    #[command(name = "list-devices")]
    ListDevices,

    /// Show recent log entries from the application
    ///
    /// Display the last 50 lines of the most recent log file.
    /// Useful for troubleshooting issues.
    Logs,

    /// Generate shell completion script
    ///
    /// Generate completion script for your shell. Save the output to your
    /// shell's completion directory or source it directly.
    ///
    /// Examples:
    ///   tapedeck completions bash > tapedeck.bash
    ///   tapedeck completions zsh > _tapedeck
    ///   tapedeck completions fish > tapedeck.fish
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the main application based on command-line arguments.
///
/// # Errors
/// - If logging initialization fails
/// - If command execution fails
pub fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Handle commands that don't need logging setup
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "tapedeck", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::ListDevices) => {
            return match commands::handle_list_devices() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        Some(Commands::Logs) => {
            return match commands::handle_logs() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        _ => {}
    }

    // Initialize logging for all other commands
    logging::init_logging()?;

    match cli.command {
        None | Some(Commands::Record { .. }) => {
            // Default command is record
            // Top-level options apply unless the explicit record command
            // provided its own
            let (device, output, countdown) = match cli.command {
                Some(Commands::Record {
                    device,
                    output,
                    countdown,
                }) => (
                    device.or(cli.device),
                    output.or(cli.output),
                    countdown.or(cli.countdown),
                ),
                None => (cli.device, cli.output, cli.countdown),
                _ => unreachable!(),
            };
            commands::handle_record(device, output, countdown)?;
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
