use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single leaf or sub-tree of the settings tree.
pub type ConfigValue = Value;

/// A mapping node of the settings tree.
pub type ConfigMap = serde_json::Map<String, Value>;

/// Separator between path segments, e.g. `providers/demo/values/port`.
pub const PATH_SEPARATOR: char = '/';

/// In-memory settings tree addressed by slash-delimited paths.
///
/// Intermediate segments must be mappings. Writes create missing intermediate
/// mappings; reads and removals never create anything and treat a missing or
/// non-mapping intermediate segment as "absent".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigTree {
    root: ConfigMap,
}

impl ConfigTree {
    /// Create a new empty tree
    pub fn new() -> Self {
        Self { root: ConfigMap::new() }
    }

    /// Wrap an existing root mapping
    pub fn from_map(root: ConfigMap) -> Self {
        Self { root }
    }

    pub fn as_map(&self) -> &ConfigMap {
        &self.root
    }

    pub fn as_map_mut(&mut self) -> &mut ConfigMap {
        &mut self.root
    }

    pub fn into_map(self) -> ConfigMap {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Raw lookup; an explicitly stored null is returned as `Some(Null)`.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split(PATH_SEPARATOR);
        let last = segments.next_back()?;
        let mut parent = &self.root;
        for segment in segments {
            parent = parent.get(segment)?.as_object()?;
        }
        parent.get(last)
    }

    /// Get the value at `path`; absent and null values both read as `None`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.lookup(path).filter(|value| !value.is_null())
    }

    /// Get the value at `path` or the given default
    pub fn get_or(&self, path: &str, default: Value) -> Value {
        self.get(path).cloned().unwrap_or(default)
    }

    /// Get a typed value; values that do not deserialize into `T` read as `None`.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        self.get(path).and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Whether anything, including an explicit null, is stored at `path`
    pub fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    /// Set the value at `path`, creating intermediate mappings as needed.
    pub fn set(&mut self, path: &str, value: Value) {
        let mut segments = path.split(PATH_SEPARATOR);
        let last = segments.next_back().unwrap_or_default();
        let mut parent = &mut self.root;
        for segment in segments {
            let entry = parent
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(ConfigMap::new()));
            parent = ensure_mapping(entry, segment);
        }
        parent.insert(last.to_string(), value);
    }

    /// Set the value at `path` only if nothing (not even null) is stored there.
    /// Returns whether the value was written.
    pub fn set_default(&mut self, path: &str, value: Value) -> bool {
        if self.contains(path) {
            return false;
        }
        self.set(path, value);
        true
    }

    /// Remove the value at `path`; a missing segment makes this a no-op.
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        let mut segments = path.split(PATH_SEPARATOR);
        let last = segments.next_back()?;
        let mut parent = &mut self.root;
        for segment in segments {
            parent = parent.get_mut(segment)?.as_object_mut()?;
        }
        parent.remove(last)
    }

    /// Top-level keys
    pub fn keys(&self) -> Vec<String> {
        self.root.keys().cloned().collect()
    }
}

fn ensure_mapping<'a>(entry: &'a mut Value, segment: &str) -> &'a mut ConfigMap {
    match entry {
        Value::Object(map) => map,
        other => {
            log::warn!("Replacing non-mapping value at path segment '{}' with a mapping", segment);
            *other = Value::Object(ConfigMap::new());
            ensure_mapping(other, segment)
        }
    }
}
