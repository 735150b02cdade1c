use serde::Deserialize;
use typed_builder::TypedBuilder;

/// セッションの設定
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, TypedBuilder)]
#[serde(default)]
pub struct SessionConfig {
    /// 実行するクエリを `debug!` で出力する
    #[builder(default = false)]
    pub show_sql: bool,

    /// クエリ実行の前に未反映の挿入を書き出す
    #[builder(default = true)]
    pub auto_flush: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            show_sql: false,
            auto_flush: true,
        }
    }
}

impl SessionConfig {
    /// `RUSTYDSL_SHOW_SQL` と `RUSTYDSL_AUTO_FLUSH` から読む。未設定や解釈できない値は既定値。
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            show_sql: env_flag("RUSTYDSL_SHOW_SQL").unwrap_or(defaults.show_sql),
            auto_flush: env_flag("RUSTYDSL_AUTO_FLUSH").unwrap_or(defaults.auto_flush),
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|value| parse_flag(&value))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("true", Some(true))]
    #[test_case("1", Some(true))]
    #[test_case(" FALSE ", Some(false))]
    #[test_case("0", Some(false))]
    #[test_case("yes", None)]
    fn parses_flags(value: &str, expected: Option<bool>) {
        assert_eq!(parse_flag(value), expected);
    }

    #[test]
    fn builder_defaults_match_default() {
        assert_eq!(SessionConfig::builder().build(), SessionConfig::default());
        assert!(SessionConfig::builder().show_sql(true).build().show_sql);
    }

    #[test]
    fn deserializes_partial_config() {
        let config: SessionConfig = serde_json::from_str(r#"{"show_sql": true}"#).unwrap();
        assert_eq!(config, SessionConfig { show_sql: true, auto_flush: true });
    }
}
