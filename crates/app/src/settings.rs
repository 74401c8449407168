use config::{Config, ConfigError, Environment, File, FileFormat};
use kura_core::config::AppConfig;
use std::path::{Path, PathBuf};

/// 指定配置文件路径的环境变量
pub const CONFIG_PATH_VAR: &str = "KURA_CONFIG";

/// 未指定路径时在工作目录下查找的文件名 (可缺省)
const DEFAULT_CONFIG_NAME: &str = "kura";

/// # Summary
/// 按 "默认值 -> 配置文件 -> 环境变量" 的优先级加载配置。
///
/// # Logic
/// 1. `KURA_CONFIG` 指定的文件必须存在；否则尝试可缺省的 `kura.toml`。
/// 2. `KURA__SECTION__KEY` 形式的环境变量覆盖同名字段，`KURA__FEED__PAIRS` 以逗号分隔。
///
/// # Returns
/// 合并后的 `AppConfig`。
pub fn load() -> Result<AppConfig, ConfigError> {
    let file = std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from);
    load_from(file.as_deref(), environment())
}

fn environment() -> Environment {
    Environment::with_prefix("KURA")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("feed.pairs")
}

fn load_from(file: Option<&Path>, env: Environment) -> Result<AppConfig, ConfigError> {
    let file_source = match file {
        Some(path) => File::from(path).format(FileFormat::Toml).required(true),
        None => File::with_name(DEFAULT_CONFIG_NAME)
            .format(FileFormat::Toml)
            .required(false),
    };

    Config::builder()
        .add_source(Config::try_from(&AppConfig::default())?)
        .add_source(file_source)
        .add_source(env)
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kura_core::config::{BackoffKind, DedupKey};
    use std::io::Write;

    fn env_of(vars: &[(&str, &str)]) -> Environment {
        let map = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(map))
    }

    #[test]
    fn test_defaults_without_sources() {
        let config = load_from(Some(Path::new("/nonexistent/kura.toml")), env_of(&[]));
        assert!(config.is_err(), "explicit config path must exist");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kura.toml");
        std::fs::write(&path, "").unwrap();
        let config = load_from(Some(&path), env_of(&[])).unwrap();
        assert_eq!(config.ingest.record_cap, 50_000);
        assert_eq!(config.ingest.window_permille, 990);
        assert_eq!(config.retry.max_attempts, None);
        assert!(config.feed.pairs.is_empty());
        assert_eq!(config.log.dir, None);
    }

    #[test]
    fn test_file_then_env_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kura.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[ingest]
record_cap = 1000
dedup_key = "trade_id"

[retry]
backoff = "exponential"
max_attempts = 5

[feed]
pairs = ["BTC_XMR"]
"#
        )
        .unwrap();

        let config = load_from(
            Some(&path),
            env_of(&[
                ("KURA__INGEST__RECORD_CAP", "2000"),
                ("KURA__FEED__PAIRS", "BTC_ETH,BTC_LTC"),
                ("KURA__LOG__LEVEL", "debug"),
            ]),
        )
        .unwrap();

        assert_eq!(config.ingest.record_cap, 2000);
        assert_eq!(config.ingest.dedup_key, DedupKey::TradeId);
        assert_eq!(config.retry.backoff, BackoffKind::Exponential);
        assert_eq!(config.retry.max_attempts, Some(5));
        let pairs: Vec<&str> = config.feed.pairs.iter().map(|p| p.as_str()).collect();
        assert_eq!(pairs, vec!["BTC_ETH", "BTC_LTC"]);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.ingest.history_start, 1_262_304_000);
    }

    #[test]
    fn test_invalid_pair_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kura.toml");
        std::fs::write(&path, "[feed]\npairs = [\"BTC-XMR\"]\n").unwrap();
        assert!(load_from(Some(&path), env_of(&[])).is_err());
    }
}
