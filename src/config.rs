use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "broker.toml";

const DEFAULT_MAX_SEGMENT_BYTES: u64 = 50 * 1024 * 1024;

/// Startup configuration, layered from built-in defaults, an optional TOML
/// file and `KIROKU_`-prefixed environment variables.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrokerConfig {
    pub data_dir: PathBuf,
    pub max_segment_bytes: u64,
    pub bootstrap_topic_name: Option<String>,
    pub bootstrap_partition_count: u32,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            max_segment_bytes: DEFAULT_MAX_SEGMENT_BYTES,
            bootstrap_topic_name: None,
            bootstrap_partition_count: 3,
        }
    }
}

impl BrokerConfig {
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let config = Figment::from(Serialized::defaults(BrokerConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("KIROKU_"))
            .extract()?;
        Ok(config)
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BrokerConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.max_segment_bytes, 50 * 1024 * 1024);
        assert_eq!(config.bootstrap_topic_name, None);
        assert_eq!(config.bootstrap_partition_count, 3);
    }

    #[test]
    fn test_layered_sources() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "broker.toml",
                r#"
                    data_dir = "/var/lib/kiroku"
                    bootstrap_topic_name = "orders"
                "#,
            )?;
            jail.set_env("KIROKU_MAX_SEGMENT_BYTES", "1024");

            let config = BrokerConfig::load(Path::new("broker.toml")).expect("config loads");
            assert_eq!(config.data_dir, PathBuf::from("/var/lib/kiroku"));
            assert_eq!(config.bootstrap_topic_name.as_deref(), Some("orders"));
            assert_eq!(config.max_segment_bytes, 1024);
            assert_eq!(config.bootstrap_partition_count, 3);
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        figment::Jail::expect_with(|_jail| {
            let config =
                BrokerConfig::load(Path::new("does-not-exist.toml")).expect("config loads");
            assert_eq!(config.max_segment_bytes, 50 * 1024 * 1024);
            Ok(())
        });
    }
}
