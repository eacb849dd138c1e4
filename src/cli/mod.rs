use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "caption-archiver",
    about = "Panopto Caption Archiver - Download every caption or transcript in a Panopto folder as one zip",
    version,
    long_about = "A CLI tool that lists all sessions in a Panopto folder, downloads each session's captions, optionally converts SRT/VTT captions into clean transcripts, and saves them together in a single zip archive."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download all captions in a folder into a zip archive
    Download {
        /// Folder GUID, or a folder page URL containing `#folderID="GUID"`
        #[arg(value_name = "FOLDER")]
        folder: String,

        /// What to store for each session
        #[arg(short, long, value_enum)]
        mode: Option<Mode>,

        /// Directory the archive is written to (defaults to the configured output dir)
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Panopto site origin, e.g. https://example.hosted.panopto.com
        #[arg(long, value_name = "URL", env = "PANOPTO_BASE_URL")]
        base_url: Option<String>,

        /// Cookie header carrying an existing Panopto login
        #[arg(long, value_name = "COOKIE", env = "PANOPTO_COOKIE", hide_env_values = true)]
        cookie: Option<String>,

        /// Maximum number of caption downloads in flight at once
        #[arg(long, value_name = "COUNT")]
        concurrency: Option<usize>,
    },

    /// Convert a local SRT/VTT caption file into a plain transcript
    Normalize {
        /// Caption file to convert
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Show or locate the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

/// Archive content selector
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Raw caption files as served by Panopto
    Captions,
    /// Captions stripped down to plain transcript text
    Transcripts,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Captions => "captions",
            Mode::Transcripts => "transcripts",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_download_command() {
        let cli = Cli::try_parse_from([
            "caption-archiver",
            "download",
            "0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0",
            "--mode",
            "captions",
            "--concurrency",
            "4",
        ])
        .unwrap();

        match cli.command {
            Commands::Download { folder, mode, concurrency, .. } => {
                assert_eq!(folder, "0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0");
                assert_eq!(mode, Some(Mode::Captions));
                assert_eq!(concurrency, Some(4));
            }
            _ => panic!("expected download command"),
        }
    }

    #[test]
    fn test_mode_tags() {
        assert_eq!(Mode::Captions.to_string(), "captions");
        assert_eq!(Mode::Transcripts.to_string(), "transcripts");
    }
}
