use crate::DeviceRequest;
use std::str::FromStr;
use std::sync::OnceLock;

/// How a pending view is materialized on first access.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ViewPolicy {
    /// Compose the selector into strides and offset; the view keeps aliasing its source buffer.
    #[default]
    Alias,
    /// Gather the selected elements into a freshly allocated contiguous buffer.
    Gather,
}

/// Process-wide settings, read from the environment.
///
/// | variable                          | values           | default |
/// |-----------------------------------|------------------|---------|
/// | `STRIDER_DEVICE`                  | `cpu`, `gpu`     | `cpu`   |
/// | `STRIDER_VIEW_POLICY`             | `alias`, `gather`| `alias` |
/// | `STRIDER_FORCE_FALLBACK_ADAPTER`  | set / unset      | unset   |
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub device: DeviceRequest,
    pub view_policy: ViewPolicy,
    pub force_fallback_adapter: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            device: parse_var("STRIDER_DEVICE"),
            view_policy: parse_var("STRIDER_VIEW_POLICY"),
            force_fallback_adapter: std::env::var("STRIDER_FORCE_FALLBACK_ADAPTER").is_ok(),
        }
    }

    pub fn global() -> &'static Config {
        static CONFIG: OnceLock<Config> = OnceLock::new();
        CONFIG.get_or_init(Config::from_env)
    }
}

fn parse_var<T: FromStr + Default + std::fmt::Display>(key: &str) -> T {
    match std::env::var(key) {
        Ok(value) => T::from_str(&value).unwrap_or_else(|_| {
            let fallback = T::default();
            log::warn!("Ignoring {}={}, using {}", key, value, fallback);
            fallback
        }),
        Err(_) => T::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_policy_parse() {
        assert_eq!(ViewPolicy::from_str("Gather").unwrap(), ViewPolicy::Gather);
        assert_eq!(ViewPolicy::from_str("alias").unwrap(), ViewPolicy::Alias);
        assert!(ViewPolicy::from_str("copy").is_err());
    }

    #[test]
    fn test_unset_var_defaults() {
        let policy: ViewPolicy = parse_var("STRIDER_TEST_UNSET_VARIABLE");
        assert_eq!(policy, ViewPolicy::Alias);
    }
}
