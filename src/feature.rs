//! Feature resolution.
//!
//! A feature is one layer of the diversity metric (Shannon index, richness, ...). Clients select
//! it either by ordinal or by name; the token is parsed once into a [FeatureToken] and resolved
//! against a variable's [FeatureCatalog].

use crate::dataset::{VariableInfo, FEATURE};
use crate::error::DataServerError;

use serde::Deserialize;

/// A user supplied feature selector.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(from = "String")]
pub enum FeatureToken {
    /// The token parsed as an integer. The raw token is kept for the name fallback.
    ByIndex { index: i64, token: String },
    /// The token is not an integer.
    ByName(String),
}

impl FeatureToken {
    /// Parse a raw token. Integers are always treated as indices first.
    pub fn parse(token: &str) -> Self {
        match token.parse::<i64>() {
            Ok(index) => FeatureToken::ByIndex {
                index,
                token: token.to_string(),
            },
            Err(_) => FeatureToken::ByName(token.to_string()),
        }
    }

    /// The raw token as supplied.
    pub fn as_str(&self) -> &str {
        match self {
            FeatureToken::ByIndex { token, .. } => token,
            FeatureToken::ByName(name) => name,
        }
    }
}

impl From<String> for FeatureToken {
    fn from(token: String) -> Self {
        Self::parse(&token)
    }
}

impl From<&str> for FeatureToken {
    fn from(token: &str) -> Self {
        Self::parse(token)
    }
}

impl From<usize> for FeatureToken {
    fn from(index: usize) -> Self {
        let token = index.to_string();
        Self::parse(&token)
    }
}

/// A resolved feature.
#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    pub index: usize,
    pub name: String,
}

/// Feature metadata for one variable.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureCatalog {
    /// Display names, possibly empty
    pub names: Vec<String>,
    /// Number of features, if known
    pub count: Option<usize>,
}

impl FeatureCatalog {
    pub fn new(names: Vec<String>, count: Option<usize>) -> Self {
        Self { names, count }
    }

    /// Build the catalog of a variable.
    ///
    /// The count comes from the feature dimension, or from the names if the variable has no
    /// such dimension.
    pub fn from_variable(info: &VariableInfo) -> Self {
        let count = info.dimension_len(FEATURE).or_else(|| {
            if info.feature_names.is_empty() {
                None
            } else {
                Some(info.feature_names.len())
            }
        });
        Self::new(info.feature_names.clone(), count)
    }

    /// Name of the feature at `index`, synthesised if there is no metadata for it.
    pub fn name(&self, index: usize) -> String {
        self.names
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("feature_{}", index))
    }

    /// All features in index order.
    pub fn features(&self) -> Vec<Feature> {
        let count = self.count.unwrap_or(self.names.len());
        (0..count)
            .map(|index| Feature {
                index,
                name: self.name(index),
            })
            .collect()
    }

    fn in_range(&self, index: i64) -> Option<usize> {
        let index = usize::try_from(index).ok()?;
        match self.count {
            Some(count) if index >= count => None,
            _ => Some(index),
        }
    }

    /// Resolve a token to a feature.
    ///
    /// * No token: the first feature.
    /// * An integer token within range: that index.
    /// * Otherwise the raw token is matched literally against the names.
    pub fn resolve(&self, token: Option<&FeatureToken>) -> Result<Feature, DataServerError> {
        let token = match token {
            None => {
                return Ok(Feature {
                    index: 0,
                    name: self.name(0),
                })
            }
            Some(token) => token,
        };
        if let FeatureToken::ByIndex { index, .. } = token {
            if let Some(index) = self.in_range(*index) {
                return Ok(Feature {
                    index,
                    name: self.name(index),
                });
            }
        }
        let raw = token.as_str();
        match self.names.iter().position(|name| name == raw) {
            Some(index) => Ok(Feature {
                index,
                name: raw.to_string(),
            }),
            None => Err(DataServerError::UnknownFeature {
                token: raw.to_string(),
                expected: self.names.clone(),
            }),
        }
    }
}
