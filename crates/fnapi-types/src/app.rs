use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named application. Routes and calls hang off an app.
///
/// `name` is the user-facing unique key. `id` is the storage identity and is
/// assigned by the backend on insert when left empty.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct App {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl App {
    /// An app carrying only a name, as used for lookups.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder-style setter for a config entry.
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// The all-empty app stands in for "no app supplied".
    pub fn is_absent(&self) -> bool {
        self.name.is_empty() && self.id.is_empty()
    }

    /// Merge a patch into this app.
    ///
    /// Config entries with an empty value are removed; annotations set to
    /// JSON `null` are removed. Identity fields and timestamps are untouched.
    pub fn apply_patch(&mut self, patch: &App) {
        for (key, value) in &patch.config {
            if value.is_empty() {
                self.config.remove(key);
            } else {
                self.config.insert(key.clone(), value.clone());
            }
        }
        for (key, value) in &patch.annotations {
            if value.is_null() {
                self.annotations.remove(key);
            } else {
                self.annotations.insert(key.clone(), value.clone());
            }
        }
    }
}
