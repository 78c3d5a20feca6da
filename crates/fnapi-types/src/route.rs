use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Default memory limit in MiB for a new route.
pub const DEFAULT_MEMORY: u64 = 128;
/// Default execution timeout in seconds.
pub const DEFAULT_TIMEOUT: u32 = 30;
/// Default idle timeout in seconds for hot functions.
pub const DEFAULT_IDLE_TIMEOUT: u32 = 30;

/// How a route is invoked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    #[default]
    Sync,
    Async,
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync => write!(f, "sync"),
            Self::Async => write!(f, "async"),
        }
    }
}

impl FromStr for RouteKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sync" => Ok(Self::Sync),
            "async" => Ok(Self::Async),
            other => Err(TypeError::InvalidRouteKind(other.to_string())),
        }
    }
}

/// A path within an app, bound to a function image.
///
/// `(app_id, path)` is the route's identity; `path` is unique within an app.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, rename = "type")]
    pub kind: RouteKind,
    #[serde(default = "default_memory")]
    pub memory: u64,
    #[serde(default = "default_timeout")]
    pub timeout: u32,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_memory() -> u64 {
    DEFAULT_MEMORY
}

fn default_timeout() -> u32 {
    DEFAULT_TIMEOUT
}

fn default_idle_timeout() -> u32 {
    DEFAULT_IDLE_TIMEOUT
}

impl Default for Route {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            path: String::new(),
            image: String::new(),
            kind: RouteKind::default(),
            memory: DEFAULT_MEMORY,
            timeout: DEFAULT_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            config: BTreeMap::new(),
            annotations: BTreeMap::new(),
            created_at: None,
            updated_at: None,
        }
    }
}

impl Route {
    /// Create a route with default limits. The path is normalized.
    pub fn new(app_id: impl Into<String>, path: &str, image: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            path: Self::normalize_path(path),
            image: image.into(),
            ..Default::default()
        }
    }

    /// Ensure a non-empty path starts with exactly one `/` and has no
    /// trailing slash. The empty path stays empty.
    pub fn normalize_path(path: &str) -> String {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            if path.is_empty() {
                String::new()
            } else {
                "/".to_string()
            }
        } else {
            format!("/{trimmed}")
        }
    }

    /// The all-empty route stands in for "no route supplied".
    pub fn is_absent(&self) -> bool {
        self.app_id.is_empty() && self.path.is_empty()
    }

    /// Merge a full update into this route. Identity fields are never changed.
    ///
    /// `kind` is always taken from `patch`. An empty image and zero limits
    /// mean "leave as is"; config entries with an empty value and `null`
    /// annotations are removed. Build partial client updates with
    /// [`RoutePatch::onto`] so omitted fields keep their stored values.
    pub fn apply_patch(&mut self, patch: &Route) {
        if !patch.image.is_empty() {
            self.image = patch.image.clone();
        }
        self.kind = patch.kind;
        if patch.memory != 0 {
            self.memory = patch.memory;
        }
        if patch.timeout != 0 {
            self.timeout = patch.timeout;
        }
        if patch.idle_timeout != 0 {
            self.idle_timeout = patch.idle_timeout;
        }
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

/// A partial route update as sent by a client.
///
/// Only fields that are present change. `path` identifies the route and is
/// never applied; callers compare it against the addressed route.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<RouteKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_timeout: Option<u32>,
    /// Empty values remove the key.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, String>,
    /// `null` values remove the key.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, serde_json::Value>,
}

impl RoutePatch {
    /// The update to hand to [`Route::apply_patch`] for `current`: every
    /// field the patch leaves out carries `current`'s value, and config and
    /// annotations carry only the patch's own entries so removals survive
    /// the merge.
    pub fn onto(&self, current: &Route) -> Route {
        Route {
            app_id: current.app_id.clone(),
            path: current.path.clone(),
            image: self.image.clone().unwrap_or_else(|| current.image.clone()),
            kind: self.kind.unwrap_or(current.kind),
            memory: self.memory.unwrap_or(current.memory),
            timeout: self.timeout.unwrap_or(current.timeout),
            idle_timeout: self.idle_timeout.unwrap_or(current.idle_timeout),
            config: self.config.clone(),
            annotations: self.annotations.clone(),
            created_at: None,
            updated_at: None,
        }
    }
}
