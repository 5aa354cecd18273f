use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use crate::error::{SetVarError, SetVarErrorKind};

/// Destination for loaded environment variables.
///
/// A target is shared by reference between all workers of a run, so every
/// operation takes `&self`.
#[derive(Debug)]
pub struct TargetEnv {
    kind: TargetEnvKind,
}

#[derive(Debug)]
enum TargetEnvKind {
    /// Apply entries to the current process environment.
    ///
    /// This writes through [`std::env::set_var`], which serialises writers
    /// made through `std` but is not safe against concurrent reads from
    /// foreign code (C libraries calling `getenv`).
    Process,
    /// Apply entries to an in-memory map.
    Memory(Mutex<BTreeMap<String, String>>),
}

impl Default for TargetEnv {
    fn default() -> Self {
        Self::memory()
    }
}

impl TargetEnv {
    /// Create a process-environment target.
    ///
    /// # Safety
    ///
    /// The caller must ensure no other threads concurrently read or write the
    /// process environment for the duration of operations that may mutate this
    /// target. The loader's own workers are exempt: their writes all go
    /// through `std`.
    pub unsafe fn process() -> Self {
        Self {
            kind: TargetEnvKind::Process,
        }
    }

    /// Create an in-memory environment target.
    ///
    /// Use this to avoid mutating the process environment.
    pub fn memory() -> Self {
        Self::from_memory(BTreeMap::new())
    }

    /// Create an in-memory environment target from an existing map.
    pub fn from_memory(map: BTreeMap<String, String>) -> Self {
        Self {
            kind: TargetEnvKind::Memory(Mutex::new(map)),
        }
    }

    pub fn is_process(&self) -> bool {
        matches!(self.kind, TargetEnvKind::Process)
    }

    /// Copy of the in-memory map, or `None` for a process target.
    pub fn snapshot(&self) -> Option<BTreeMap<String, String>> {
        match &self.kind {
            TargetEnvKind::Memory(map) => {
                Some(map.lock().unwrap_or_else(PoisonError::into_inner).clone())
            }
            TargetEnvKind::Process => None,
        }
    }

    pub fn into_memory(self) -> Option<BTreeMap<String, String>> {
        match self.kind {
            TargetEnvKind::Memory(map) => {
                Some(map.into_inner().unwrap_or_else(PoisonError::into_inner))
            }
            TargetEnvKind::Process => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        match &self.kind {
            TargetEnvKind::Process => std::env::var_os(key).is_some(),
            TargetEnvKind::Memory(map) => map
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains_key(key),
        }
    }

    pub fn get_var(&self, key: &str) -> Option<String> {
        match &self.kind {
            TargetEnvKind::Process => {
                std::env::var_os(key).map(|value| value.to_string_lossy().into_owned())
            }
            TargetEnvKind::Memory(map) => map
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(key)
                .cloned(),
        }
    }

    /// Apply one assignment.
    ///
    /// Both targets reject the same inputs, which are exactly the ones
    /// [`std::env::set_var`] would panic on.
    pub fn set_var(&self, key: &str, value: &str) -> Result<(), SetVarError> {
        validate(key, value)?;
        match &self.kind {
            TargetEnvKind::Process => unsafe { std::env::set_var(key, value) },
            TargetEnvKind::Memory(map) => {
                map.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(key.to_owned(), value.to_owned());
            }
        }
        Ok(())
    }
}

pub(crate) fn validate(key: &str, value: &str) -> Result<(), SetVarError> {
    let kind = if key.is_empty() {
        SetVarErrorKind::EmptyKey
    } else if key.contains('=') {
        SetVarErrorKind::KeyContainsEquals
    } else if key.contains('\0') {
        SetVarErrorKind::KeyContainsNul
    } else if value.contains('\0') {
        SetVarErrorKind::ValueContainsNul
    } else {
        return Ok(());
    };
    Err(SetVarError::new(key, kind))
}
