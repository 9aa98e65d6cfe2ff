//! Locating and reading network definition files, and the name tables used
//! while resolving them.
//!
//! A definition lives in `{base}.ron`, `{base}.toml` or `{base}.json`; at
//! most one of those may exist in a directory. Every name declared in the
//! file belongs to a namespace (templates, nodes, modifiers) tracked by a
//! [`NameTable`], so duplicate and dangling names are reported with the
//! namespace they belong to.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

use gridwork_core::fixed::{Fixed64, f64_to_fixed64};
use serde::de::DeserializeOwned;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while loading a network definition.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("no {base}.ron, {base}.toml or {base}.json in {dir}")]
    NotFound { base: String, dir: PathBuf },

    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// More than one format of the same definition exists side by side.
    #[error("{base} is defined more than once: {}", join_paths(.candidates))]
    AmbiguousSource {
        base: String,
        candidates: Vec<PathBuf>,
    },

    #[error("{format} parse error in {file}: {detail}")]
    Parse {
        file: PathBuf,
        format: Format,
        detail: String,
    },

    #[error("unknown {kind} '{name}' in {file}")]
    UnknownName {
        file: PathBuf,
        kind: &'static str,
        name: String,
    },

    #[error("{kind} '{name}' declared twice in {file}")]
    DuplicateName {
        file: PathBuf,
        kind: &'static str,
        name: String,
    },

    /// A value parsed but cannot be used (non-finite number, self-link).
    #[error("invalid value for '{name}' in {file}: {detail}")]
    InvalidValue {
        file: PathBuf,
        name: String,
        detail: String,
    },

    #[error("cannot read {file}: {source}")]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// ===========================================================================
// Formats
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

impl Format {
    /// Every supported format, in lookup order.
    pub const ALL: [Format; 3] = [Format::Ron, Format::Toml, Format::Json];

    pub fn extension(self) -> &'static str {
        match self {
            Format::Ron => "ron",
            Format::Toml => "toml",
            Format::Json => "json",
        }
    }

    /// Pick the format matching `path`'s extension.
    pub fn from_path(path: &Path) -> Result<Self, DataLoadError> {
        let ext = path.extension().and_then(OsStr::to_str);
        Self::ALL
            .into_iter()
            .find(|f| Some(f.extension()) == ext)
            .ok_or_else(|| DataLoadError::UnsupportedFormat {
                file: path.to_path_buf(),
            })
    }

    /// Deserialize `content`. `origin` is only used in error messages.
    pub fn parse<T: DeserializeOwned>(self, content: &str, origin: &Path) -> Result<T, DataLoadError> {
        let parsed = match self {
            Format::Ron => ron::from_str(content).map_err(|e| e.to_string()),
            Format::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            Format::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|detail| DataLoadError::Parse {
            file: origin.to_path_buf(),
            format: self,
            detail,
        })
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Ron => "RON",
            Format::Toml => "TOML",
            Format::Json => "JSON",
        })
    }
}

// ===========================================================================
// Sources
// ===========================================================================

/// A definition file on disk and the format it will be read with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub path: PathBuf,
    pub format: Format,
}

impl Source {
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, DataLoadError> {
        let path = path.into();
        let format = Format::from_path(&path)?;
        Ok(Self { path, format })
    }

    /// Look for `{base}.<ext>` in `dir` for every supported format.
    /// Finding none is `Ok(None)`; finding several is an error.
    pub fn locate(dir: &Path, base: &str) -> Result<Option<Self>, DataLoadError> {
        let mut found: Vec<Source> = Format::ALL
            .into_iter()
            .map(|format| Source {
                path: dir.join(format!("{base}.{}", format.extension())),
                format,
            })
            .filter(|source| source.path.is_file())
            .collect();

        if found.len() > 1 {
            return Err(DataLoadError::AmbiguousSource {
                base: base.to_string(),
                candidates: found.into_iter().map(|s| s.path).collect(),
            });
        }
        Ok(found.pop())
    }

    /// [`locate`](Self::locate), treating absence as an error.
    pub fn require(dir: &Path, base: &str) -> Result<Self, DataLoadError> {
        Self::locate(dir, base)?.ok_or_else(|| DataLoadError::NotFound {
            base: base.to_string(),
            dir: dir.to_path_buf(),
        })
    }

    pub fn read<T: DeserializeOwned>(&self) -> Result<T, DataLoadError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| DataLoadError::Io {
            file: self.path.clone(),
            source,
        })?;
        self.format.parse(&content, &self.path)
    }
}

// ===========================================================================
// Name tables
// ===========================================================================

/// Names declared in one namespace of a definition file.
#[derive(Debug)]
pub struct NameTable<'f, V> {
    kind: &'static str,
    file: &'f Path,
    entries: HashMap<String, V>,
}

impl<'f, V> NameTable<'f, V> {
    /// `kind` names the namespace in error messages ("node", "template").
    pub fn new(kind: &'static str, file: &'f Path) -> Self {
        Self {
            kind,
            file,
            entries: HashMap::new(),
        }
    }

    /// Declare `name`. A second declaration of the same name is an error.
    pub fn declare(&mut self, name: &str, value: V) -> Result<(), DataLoadError> {
        match self.entries.entry(name.to_string()) {
            Entry::Occupied(_) => Err(DataLoadError::DuplicateName {
                file: self.file.to_path_buf(),
                kind: self.kind,
                name: name.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Result<&V, DataLoadError> {
        self.entries.get(name).ok_or_else(|| DataLoadError::UnknownName {
            file: self.file.to_path_buf(),
            kind: self.kind,
            name: name.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_map(self) -> HashMap<String, V> {
        self.entries
    }
}

// ===========================================================================
// Field checks
// ===========================================================================

/// One named record being validated, for attributing bad values.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    pub file: &'a Path,
    pub name: &'a str,
}

impl<'a> Record<'a> {
    pub fn new(file: &'a Path, name: &'a str) -> Self {
        Self { file, name }
    }

    /// Convert a numeric field to fixed point. NaN and infinities are
    /// rejected before conversion.
    pub fn fixed(&self, field: &str, value: f64) -> Result<Fixed64, DataLoadError> {
        if value.is_finite() {
            Ok(f64_to_fixed64(value))
        } else {
            Err(self.invalid(format!("{field} must be finite, got {value}")))
        }
    }

    pub fn invalid(&self, detail: impl Into<String>) -> DataLoadError {
        DataLoadError::InvalidValue {
            file: self.file.to_path_buf(),
            name: self.name.to_string(),
            detail: detail.into(),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
