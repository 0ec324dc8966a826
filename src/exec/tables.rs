// src/exec/tables.rs

use std::collections::BTreeMap;

use crate::exec::outcome::Payload;

/// Ordered mapping from exit code to success payload.
///
/// Code `0` maps to `true` unless the caller overrides or removes it. A code
/// absent from the table is a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitCodeTable {
    entries: Vec<(i32, Payload)>,
}

impl ExitCodeTable {
    /// Table with no entries at all (not even `0`).
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build from explicit entries, adding `0 => true` if `0` is absent.
    pub fn from_entries<I, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = (i32, P)>,
        P: Into<Payload>,
    {
        let mut table = Self::empty();
        for (code, payload) in entries {
            table = table.with(code, payload);
        }
        if table.lookup(0).is_none() {
            table.entries.insert(0, (0, Payload::Bool(true)));
        }
        table
    }

    /// Insert or replace the payload for `code`, keeping its position.
    pub fn with(mut self, code: i32, payload: impl Into<Payload>) -> Self {
        let payload = payload.into();
        match self.entries.iter_mut().find(|(c, _)| *c == code) {
            Some(entry) => entry.1 = payload,
            None => self.entries.push((code, payload)),
        }
        self
    }

    pub fn without(mut self, code: i32) -> Self {
        self.entries.retain(|(c, _)| *c != code);
        self
    }

    pub fn lookup(&self, code: i32) -> Option<&Payload> {
        self.entries.iter().find(|(c, _)| *c == code).map(|(_, p)| p)
    }

    pub fn codes(&self) -> impl Iterator<Item = i32> + '_ {
        self.entries.iter().map(|(c, _)| *c)
    }
}

impl Default for ExitCodeTable {
    fn default() -> Self {
        Self {
            entries: vec![(0, Payload::Bool(true))],
        }
    }
}

/// Error kind raised for a specific exit code, with caller-chosen fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Translation {
    pub kind: String,
    pub fields: BTreeMap<String, String>,
}

impl Translation {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorTranslationTable {
    entries: BTreeMap<i32, Translation>,
}

impl ErrorTranslationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, code: i32, translation: Translation) -> Self {
        self.entries.insert(code, translation);
        self
    }

    pub fn lookup(&self, code: i32) -> Option<&Translation> {
        self.entries.get(&code)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
