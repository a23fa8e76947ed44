//! Service configuration from command line flags and environment

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use deck_store::{ContainerLimits, ParseLimits};

use crate::error::{Error, Result};

#[derive(Parser, Debug, Clone)]
#[command(name = "deckgen-server")]
#[command(about = "Parse presentation templates and generate decks from data")]
pub struct Config {
    /// Host to bind to
    #[arg(short = 'H', long, env = "DECKGEN_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short = 'P', long, env = "DECKGEN_PORT", default_value = "3000")]
    pub port: u16,

    /// Directory generated decks are written to
    #[arg(long, env = "DECKGEN_STORAGE_DIR", default_value = "generated")]
    pub storage_dir: PathBuf,

    /// Base URL under which stored decks are reachable
    #[arg(long, env = "DECKGEN_PUBLIC_BASE_URL", default_value = "http://127.0.0.1:3000/files")]
    pub public_base_url: String,

    /// JSON file listing templates as {id, url, fileName}
    #[arg(long, env = "DECKGEN_TEMPLATE_CATALOG")]
    pub template_catalog: Option<PathBuf>,

    /// Accepted bearer tokens. Can be given multiple times or comma separated.
    #[arg(long = "api-token", env = "DECKGEN_API_TOKENS", value_name = "TOKEN=USER", value_delimiter = ',')]
    pub api_tokens: Vec<String>,

    /// JSON file of extra system fields layered over the builtin catalog
    #[arg(long, env = "DECKGEN_FIELD_CATALOG")]
    pub field_catalog: Option<PathBuf>,

    /// Deflate level (0-9) for rewritten parts
    #[arg(long, env = "DECKGEN_COMPRESSION_LEVEL", value_parser = clap::value_parser!(i64).range(0..=9))]
    pub compression_level: Option<i64>,

    /// Timeout for fetching template files, in seconds
    #[arg(long, env = "DECKGEN_FETCH_TIMEOUT_SECS", default_value = "30")]
    pub fetch_timeout_secs: u64,

    /// Largest template file accepted, in bytes
    #[arg(long, env = "DECKGEN_MAX_TEMPLATE_BYTES", default_value = "104857600")]
    pub max_template_bytes: u64,

    /// Largest uncompressed part read from a template, in bytes
    #[arg(long, env = "DECKGEN_MAX_PART_BYTES", default_value = "67108864")]
    pub max_part_bytes: u64,

    /// Highest slide master index enumerated
    #[arg(long, env = "DECKGEN_MAX_MASTERS", default_value = "20")]
    pub max_masters: usize,

    /// Highest slide layout index enumerated
    #[arg(long, env = "DECKGEN_MAX_LAYOUTS", default_value = "200")]
    pub max_layouts: usize,

    /// Highest slide index enumerated
    #[arg(long, env = "DECKGEN_MAX_SLIDES", default_value = "1000")]
    pub max_slides: usize,
}

impl Config {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn parse_limits(&self) -> ParseLimits {
        ParseLimits::default()
            .with_max_masters(self.max_masters)
            .with_max_layouts(self.max_layouts)
            .with_max_slides(self.max_slides)
    }

    pub fn container_limits(&self) -> ContainerLimits {
        ContainerLimits::default()
            .with_max_package_size(self.max_template_bytes)
            .with_max_part_size(self.max_part_bytes)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Token table from `TOKEN=USER` entries
    pub fn token_table(&self) -> Result<HashMap<String, String>> {
        self.api_tokens
            .iter()
            .filter(|entry| !entry.trim().is_empty())
            .map(|entry| match entry.split_once('=') {
                Some((token, user)) if !token.trim().is_empty() && !user.trim().is_empty() => {
                    Ok((token.trim().to_string(), user.trim().to_string()))
                }
                _ => Err(Error::InvalidTokenEntry(entry.clone())),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["deckgen-server"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.parse_limits(), ParseLimits::default());
        assert_eq!(config.fetch_timeout(), Duration::from_secs(30));
        assert!(config.compression_level.is_none());
        assert_eq!(config.max_template_bytes, 100 * 1024 * 1024);
        assert_eq!(config.container_limits().max_part_size, 64 * 1024 * 1024);
    }

    #[test]
    fn test_size_limits() {
        let config = parse(&["--max-template-bytes", "2048", "--max-part-bytes", "512"]);
        let limits = config.container_limits();
        assert_eq!(limits.max_package_size, 2048);
        assert_eq!(limits.max_part_size, 512);
        assert_eq!(limits.max_total_size, ContainerLimits::default().max_total_size);
    }

    #[test]
    fn test_token_table() {
        let config = parse(&["--api-token", "abc=alice,def=bob", "--api-token", "ghi=carol"]);
        let table = config.token_table().unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table["def"], "bob");

        let config = parse(&["--api-token", "no-user"]);
        assert!(matches!(config.token_table(), Err(Error::InvalidTokenEntry(_))));
    }

    #[test]
    fn test_compression_level_range() {
        assert_eq!(parse(&["--compression-level", "9"]).compression_level, Some(9));
        let argv = ["deckgen-server", "--compression-level", "12"];
        assert!(Config::try_parse_from(argv).is_err());
    }
}
