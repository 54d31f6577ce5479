// bases/download_cli/src/args.rs
use clap::{Args as ClapArgs, Parser, Subcommand};
use media_downloader::{YtDlpConfig, DEFAULT_USER_AGENT};
use std::path::PathBuf;

/// List video qualities and download them with yt-dlp
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Directory for the download records
    #[arg(long, env = "VIDEO_FETCH_DATA_DIR", default_value = "data", global = true)]
    pub data_dir: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub extractor: ExtractorArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the available qualities for a URL
    Formats { url: String },

    /// Print the direct media URL for one format
    Resolve { url: String, format_id: String },

    /// Download one or more URLs, asking for a quality unless told
    Get {
        #[arg(required = true)]
        urls: Vec<String>,

        /// Format id to download for every URL (e.g. 137+140)
        #[arg(short, long, conflicts_with = "best")]
        format: Option<String>,

        /// Skip the prompt and take yt-dlp's best mp4 pairing
        #[arg(long)]
        best: bool,

        /// Directory to store downloaded files
        #[arg(
            short,
            long,
            env = "VIDEO_FETCH_DOWNLOAD_DIR",
            default_value = "downloads"
        )]
        output_dir: PathBuf,
    },

    /// List past downloads, newest first
    History,
}

/// Options passed through to yt-dlp
#[derive(ClapArgs, Debug, Clone)]
pub struct ExtractorArgs {
    /// yt-dlp executable
    #[arg(long = "yt-dlp", env = "VIDEO_FETCH_YT_DLP", default_value = "yt-dlp", global = true)]
    pub yt_dlp: PathBuf,

    /// Netscape cookie file for sites that need a session
    #[arg(long, env = "VIDEO_FETCH_COOKIES", global = true)]
    pub cookies: Option<PathBuf>,

    /// Network timeout in seconds
    #[arg(long, default_value_t = 30, global = true)]
    pub socket_timeout: u32,

    #[arg(long, default_value_t = 3, global = true)]
    pub extractor_retries: u32,

    #[arg(long, env = "VIDEO_FETCH_USER_AGENT", default_value = DEFAULT_USER_AGENT, global = true)]
    pub user_agent: String,
}

impl From<ExtractorArgs> for YtDlpConfig {
    fn from(args: ExtractorArgs) -> Self {
        YtDlpConfig {
            binary: args.yt_dlp,
            user_agent: args.user_agent,
            socket_timeout_secs: args.socket_timeout,
            extractor_retries: args.extractor_retries,
            cookie_file: args.cookies,
        }
    }
}

/// How `get` picks a format for each URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatChoice {
    Fixed(String),
    ExtractorDefault,
    Prompt,
}

impl FormatChoice {
    pub fn from_flags(format: Option<&str>, best: bool) -> Self {
        match (format, best) {
            (Some(id), _) => FormatChoice::Fixed(id.to_string()),
            (None, true) => FormatChoice::ExtractorDefault,
            (None, false) => FormatChoice::Prompt,
        }
    }
}
