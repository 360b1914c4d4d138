use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{numeric, Segment};
use crate::error::UnresolvedSourceError;

/// Current state of one data source: a primary `state` plus named attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceState {
    pub state: Value,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl SourceState {
    pub fn new(state: impl Into<Value>) -> Self {
        Self {
            state: state.into(),
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// All source states known to the host at one point in time, keyed by source id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataSnapshot {
    sources: HashMap<String, SourceState>,
}

impl DataSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, id: impl Into<String>, state: SourceState) -> Self {
        self.insert(id, state);
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, state: SourceState) {
        self.sources.insert(id.into(), state);
    }

    pub fn get(&self, id: &str) -> Option<&SourceState> {
        self.sources.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// A segment's value for one update. `NoData` is kept apart from zero: it adds
/// nothing to the stack and is displayed as `-`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Value(f64),
    NoData,
}

impl Reading {
    fn from_raw(raw: Option<&Value>) -> Self {
        raw.and_then(numeric).map_or(Reading::NoData, Reading::Value)
    }
}

/// Reads the state of `source_id`, or the named attribute when one is given.
pub fn resolve(
    snapshot: &DataSnapshot,
    source_id: &str,
    attribute: Option<&str>,
) -> Result<Reading, UnresolvedSourceError> {
    let source = snapshot
        .get(source_id)
        .ok_or_else(|| UnresolvedSourceError::new([source_id]))?;

    Ok(match attribute {
        None => Reading::from_raw(Some(&source.state)),
        Some(name) => Reading::from_raw(source.attributes.get(name)),
    })
}

/// Resolves a whole ring, reporting every missing source rather than the first.
pub fn resolve_segments(
    segments: &[Segment],
    snapshot: &DataSnapshot,
) -> Result<Vec<Reading>, UnresolvedSourceError> {
    let mut readings = Vec::with_capacity(segments.len());
    let mut missing = Vec::new();
    for segment in segments {
        match resolve(snapshot, &segment.entity, segment.attribute.as_deref()) {
            Ok(reading) => readings.push(reading),
            Err(err) => missing.extend(err.sources),
        }
    }
    if missing.is_empty() {
        Ok(readings)
    } else {
        Err(UnresolvedSourceError::new(missing))
    }
}

impl UnresolvedSourceError {
    /// Builds the error from source ids, dropping repeats but keeping first-seen order.
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for source in sources {
            let source = source.into();
            if !unique.contains(&source) {
                unique.push(source);
            }
        }
        Self { sources: unique }
    }
}
