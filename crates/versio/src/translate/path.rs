use crate::translate::TranslateError;
use std::{collections::BTreeMap, fmt};

///
/// PathSegment
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PathSegment {
    Field(&'static str),
    Index(usize),
    Key(String),
}

impl From<&'static str> for PathSegment {
    fn from(s: &'static str) -> Self {
        Self::Field(s)
    }
}

impl From<usize> for PathSegment {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

/// Render segments as `a.b[2].c`; keyed entries render as `a[Fi]`.
#[must_use]
pub fn render_path(path: &[PathSegment]) -> String {
    use std::fmt::Write;

    let mut out = String::new();

    for seg in path {
        match seg {
            PathSegment::Field(s) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(s);
            }
            PathSegment::Index(i) => {
                let _ = write!(out, "[{i}]");
            }
            PathSegment::Key(k) => {
                let _ = write!(out, "[{k}]");
            }
        }
    }

    out
}

// Join an already-rendered prefix with a nested rendered path.
fn join(prefix: &str, nested: &str) -> String {
    if prefix.is_empty() {
        nested.to_string()
    } else if nested.is_empty() {
        prefix.to_string()
    } else if nested.starts_with('[') {
        format!("{prefix}{nested}")
    } else {
        format!("{prefix}.{nested}")
    }
}

///
/// Issues
///
/// Non-fatal translation failures keyed by rendered field path.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Issues(BTreeMap<String, Vec<String>>);

impl Issues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.entry(path.into()).or_default().push(message.into());
    }

    /// Fold a non-fatal error in under `prefix`. Nested issue sets keep
    /// their own paths, re-rooted below the prefix.
    pub(crate) fn absorb(&mut self, prefix: &str, err: TranslateError) {
        match err {
            TranslateError::Issues(nested) => {
                for (path, messages) in nested.0 {
                    self.0
                        .entry(join(prefix, &path))
                        .or_default()
                        .extend(messages);
                }
            }
            other => self.add(prefix, other.to_string()),
        }
    }

    /// `Ok(value)` when empty, otherwise the collected issues.
    pub(crate) fn into_result<T>(self, value: T) -> Result<T, TranslateError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(TranslateError::Issues(self))
        }
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&[String]> {
        self.0.get(path).map(Vec::as_slice)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(path, messages)| (path.as_str(), messages.as_slice()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Issues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (path, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                first = false;

                if path.is_empty() {
                    write!(f, "{message}")?;
                } else {
                    write!(f, "{path}: {message}")?;
                }
            }
        }

        Ok(())
    }
}

///
/// TESTS
///
