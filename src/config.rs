use std::collections::BTreeMap;
use std::path::PathBuf;

/// Learning rate used when no `alpha=` pair is given.
pub const DEFAULT_ALPHA: f32 = 0.1;

/// Errors that can occur when parsing or querying agent configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing configuration key '{0}'")]
    MissingKey(String),

    #[error("invalid value for '{key}': {value:?}")]
    Invalid { key: String, value: String },
}

/// Agent configuration parsed from a flat `key=value` string.
///
/// The typed fields are derived from the raw pairs at parse time; every pair,
/// recognized or not, stays available through [`AgentConfig::property`].
///
/// ```
/// use threes_tdl::config::AgentConfig;
/// let cfg = AgentConfig::parse("name=tdl role=player", "alpha=0.05 save=w.bin").unwrap();
/// assert_eq!(cfg.name(), "tdl");
/// assert_eq!(cfg.alpha, 0.05);
/// assert!(cfg.load.is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub alpha: f32,
    /// Placer seed; must be a non-negative integer, so `seed=-3` is rejected.
    pub seed: Option<u64>,
    pub load: Option<PathBuf>,
    pub save: Option<PathBuf>,
    meta: BTreeMap<String, String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        let mut meta = BTreeMap::new();
        meta.insert("name".to_string(), "unknown".to_string());
        meta.insert("role".to_string(), "unknown".to_string());
        AgentConfig { alpha: DEFAULT_ALPHA, seed: None, load: None, save: None, meta }
    }
}

impl AgentConfig {
    /// Parse `args` layered over an agent's own `defaults`; later pairs win.
    pub fn parse(defaults: &str, args: &str) -> Result<Self, ConfigError> {
        let mut config = AgentConfig::default();
        for pair in defaults.split_whitespace().chain(args.split_whitespace()) {
            config.notify(pair)?;
        }
        Ok(config)
    }

    /// Apply one `key=value` pair. A pair without `=` uses the whole text as key and value.
    pub fn notify(&mut self, msg: &str) -> Result<(), ConfigError> {
        let (key, value) = msg.split_once('=').unwrap_or((msg, msg));
        match key {
            "alpha" => self.alpha = parse_value(key, value)?,
            "seed" => self.seed = Some(parse_value(key, value)?),
            "load" => self.load = Some(PathBuf::from(value)),
            "save" => self.save = Some(PathBuf::from(value)),
            _ => {}
        }
        self.meta.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Raw value of `key`.
    pub fn property(&self, key: &str) -> Result<&str, ConfigError> {
        self.meta
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::MissingKey(key.to_string()))
    }

    pub fn name(&self) -> &str { self.property("name").unwrap_or("unknown") }

    pub fn role(&self) -> &str { self.property("role").unwrap_or("unknown") }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid { key: key.to_string(), value: value.to_string() })
}
