use std::error::Error;
use std::fmt;

use facet::Facet;
use mdb_types::{INDEX_MAX, Mode};

use crate::filter::EventCategoryFilter;

pub const MODE_ENV: &str = "MDB_MODE";
pub const MAX_DEPTH_ENV: &str = "MDB_MAX_DEPTH";
pub const TRACE_CAPACITY_ENV: &str = "MDB_TRACE_CAPACITY";
pub const PREPROCESSOR_MODE_ENV: &str = "MDB_PREPROCESSOR_MODE";

const DEFAULT_TRACE_CAPACITY: usize = 1024;

/// Session settings for building and walking instantiation graphs.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct MdbConfig {
    pub mode: Mode,
    /// Default depth bound for forward traces; `None` is unbounded.
    pub max_depth: Option<usize>,
    /// Initial arena reservation for vertices and edges.
    pub trace_capacity: usize,
    /// Show preprocessor activations instead of template instantiations.
    pub preprocessor_mode: bool,
}

impl Default for MdbConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Normal,
            max_depth: None,
            trace_capacity: DEFAULT_TRACE_CAPACITY,
            preprocessor_mode: false,
        }
    }
}

impl MdbConfig {
    /// Reads `MDB_*` variables, falling back to defaults for unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`MdbConfig::from_env`], with variables resolved by `lookup`.
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(value) = get(MODE_ENV) {
            config.mode = value
                .parse::<Mode>()
                .map_err(|reason| ConfigError::InvalidMode { value, reason })?;
        }
        if let Some(value) = get(MAX_DEPTH_ENV) {
            config.max_depth = Some(parse_usize(MAX_DEPTH_ENV, value)?);
        }
        if let Some(value) = get(TRACE_CAPACITY_ENV) {
            let capacity = parse_usize(TRACE_CAPACITY_ENV, value)?;
            if capacity > INDEX_MAX {
                return Err(ConfigError::OutOfRange {
                    var: TRACE_CAPACITY_ENV,
                    value: capacity,
                    max: INDEX_MAX,
                });
            }
            config.trace_capacity = capacity;
        }
        if let Some(value) = get(PREPROCESSOR_MODE_ENV) {
            config.preprocessor_mode = parse_bool(PREPROCESSOR_MODE_ENV, value)?;
        }
        Ok(config)
    }

    /// The edge filter traversals use by default.
    pub fn edge_filter(&self) -> EventCategoryFilter {
        if self.preprocessor_mode {
            EventCategoryFilter::preprocessor()
        } else {
            EventCategoryFilter::templates()
        }
    }
}

fn parse_usize(var: &'static str, value: String) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(parsed) => Ok(parsed),
        Err(_) => Err(ConfigError::InvalidInteger { var, value }),
    }
}

fn parse_bool(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool { var, value }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidMode { value: String, reason: String },
    InvalidInteger { var: &'static str, value: String },
    InvalidBool { var: &'static str, value: String },
    OutOfRange {
        var: &'static str,
        value: usize,
        max: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMode { value, reason } => {
                write!(f, "invalid {MODE_ENV}={value:?}: {reason}")
            }
            Self::InvalidInteger { var, value } => {
                write!(f, "invalid {var}={value:?}: expected a non-negative integer")
            }
            Self::OutOfRange { var, value, max } => {
                write!(f, "invalid {var}={value}: must be <= {max}")
            }
            Self::InvalidBool { var, value } => {
                write!(
                    f,
                    "invalid {var}={value:?}: expected one of 1, 0, true, false, yes, no, on, off"
                )
            }
        }
    }
}

impl Error for ConfigError {}
