use crate::error::{ErrorClass, ErrorOrigin, InternalError};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

///
/// LookupError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum LookupError {
    #[error("code table '{table}' has a conflicting entry at code '{code}'")]
    DuplicateCode { table: &'static str, code: String },

    #[error("code table '{table}' has no key for code '{code}'")]
    UnknownCode { table: &'static str, code: String },

    #[error("code table '{table}' has no code for key {key}")]
    UnknownKey { table: &'static str, key: String },
}

impl LookupError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::DuplicateCode { .. } => ErrorClass::InvariantViolation,
            Self::UnknownCode { .. } | Self::UnknownKey { .. } => ErrorClass::NotFound,
        }
    }
}

impl From<LookupError> for InternalError {
    fn from(err: LookupError) -> Self {
        Self::new(err.class(), ErrorOrigin::Translate, err.to_string())
    }
}

///
/// CodeTable
///
/// Read-only code <-> key mapping for one enumeration (category codes,
/// service kinds). Built once, then shared with translators.
///

#[derive(Clone, Debug)]
pub struct CodeTable<K> {
    name: &'static str,
    by_code: BTreeMap<String, K>,
    by_key: BTreeMap<K, String>,
}

impl<K> CodeTable<K>
where
    K: Clone + Ord + std::fmt::Debug,
{
    /// Build a table; duplicate codes or keys are rejected.
    pub fn new<C>(
        name: &'static str,
        entries: impl IntoIterator<Item = (C, K)>,
    ) -> Result<Self, LookupError>
    where
        C: Into<String>,
    {
        let mut by_code = BTreeMap::new();
        let mut by_key = BTreeMap::new();

        for (code, key) in entries {
            let code = code.into();
            if by_code.contains_key(&code) || by_key.contains_key(&key) {
                return Err(LookupError::DuplicateCode { table: name, code });
            }
            by_key.insert(key.clone(), code.clone());
            by_code.insert(code, key);
        }

        Ok(Self {
            name,
            by_code,
            by_key,
        })
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub fn key(&self, code: &str) -> Result<K, LookupError> {
        self.by_code
            .get(code)
            .cloned()
            .ok_or_else(|| LookupError::UnknownCode {
                table: self.name,
                code: code.to_string(),
            })
    }

    pub fn code(&self, key: &K) -> Result<&str, LookupError> {
        self.by_key
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| LookupError::UnknownKey {
                table: self.name,
                key: format!("{key:?}"),
            })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

///
/// TESTS
///
