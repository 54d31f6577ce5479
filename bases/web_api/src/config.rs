// bases/web_api/src/config.rs
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::{Args, Parser};
use media_downloader::{YtDlpConfig, DEFAULT_USER_AGENT};

/// Web API configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    /// Holds `downloads.json`
    pub data_dir: PathBuf,
    pub download_dir: PathBuf,
    pub extractor: YtDlpConfig,
}

/// Video Fetch - list qualities and resolve direct media URLs over HTTP
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Address to listen on
    #[arg(long, env = "VIDEO_FETCH_HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "VIDEO_FETCH_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Directory for the download records
    #[arg(long, env = "VIDEO_FETCH_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory local downloads are written to
    #[arg(long, env = "VIDEO_FETCH_DOWNLOAD_DIR", default_value = "downloads")]
    pub download_dir: PathBuf,

    #[command(flatten)]
    pub extractor: ExtractorArgs,
}

/// Options passed through to yt-dlp
#[derive(Args, Debug, Clone)]
pub struct ExtractorArgs {
    /// yt-dlp executable
    #[arg(long = "yt-dlp", env = "VIDEO_FETCH_YT_DLP", default_value = "yt-dlp")]
    pub yt_dlp: PathBuf,

    /// Netscape cookie file for sites that need a session
    #[arg(long, env = "VIDEO_FETCH_COOKIES")]
    pub cookies: Option<PathBuf>,

    /// Network timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub socket_timeout: u32,

    #[arg(long, default_value_t = 3)]
    pub extractor_retries: u32,

    #[arg(long, env = "VIDEO_FETCH_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
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

impl Config {
    /// Create configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Self {
        Self {
            bind: SocketAddr::new(args.host, args.port),
            data_dir: args.data_dir,
            download_dir: args.download_dir,
            extractor: args.extractor.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let argv = std::iter::once("web_api").chain(args.iter().copied());
        Config::from_args(CliArgs::try_parse_from(argv).unwrap())
    }

    #[test]
    fn defaults_listen_locally() {
        let config = parse(&[]);
        assert_eq!(config.bind, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.download_dir, PathBuf::from("downloads"));
    }

    #[test]
    fn extractor_defaults() {
        let config = parse(&[]);
        assert_eq!(config.extractor.binary, PathBuf::from("yt-dlp"));
        assert_eq!(config.extractor.socket_timeout_secs, 30);
        assert_eq!(config.extractor.extractor_retries, 3);
        assert_eq!(config.extractor.user_agent, DEFAULT_USER_AGENT);
        assert!(config.extractor.cookie_file.is_none());
    }

    #[test]
    fn custom_address_and_extractor_options() {
        let config = parse(&[
            "--host",
            "0.0.0.0",
            "--port",
            "3000",
            "--yt-dlp",
            "/opt/bin/yt-dlp",
            "--cookies",
            "cookies.txt",
            "--socket-timeout",
            "5",
        ]);
        assert_eq!(config.bind, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.extractor.binary, PathBuf::from("/opt/bin/yt-dlp"));
        assert_eq!(config.extractor.cookie_file, Some(PathBuf::from("cookies.txt")));
        assert_eq!(config.extractor.socket_timeout_secs, 5);
    }

    #[test]
    fn invalid_host_is_rejected() {
        assert!(CliArgs::try_parse_from(["web_api", "--host", "not-an-ip"]).is_err());
    }
}
