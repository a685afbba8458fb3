//! In-memory jar contents and deterministic jar I/O.
//!
//! A [`JarContents`] maps entry names to bytes in sorted order, which keeps
//! written jars byte-for-byte reproducible: entries are stored with a fixed
//! timestamp and `META-INF/MANIFEST.MF` always comes first.

pub mod manifest;
pub mod merge;

use camino::Utf8Path;
use log::debug;
use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Seek, Write};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// Jar entry holding the manifest.
pub const MANIFEST_ENTRY: &str = "META-INF/MANIFEST.MF";

/// Errors raised while reading or writing jars and class directories.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JarError {
    /// A file or directory could not be read or written.
    #[error("I/O error on {path}: {reason}")]
    Io {
        /// The path involved.
        path: String,
        /// Description of the underlying I/O error.
        reason: String,
    },

    /// A jar is not a valid zip archive.
    #[error("invalid jar {path}: {reason}")]
    Archive {
        /// The jar path.
        path: String,
        /// Description of the zip error.
        reason: String,
    },

    /// A directory walk produced a path that is not valid UTF-8.
    #[error("entry path is not valid UTF-8 under {root}")]
    NonUtf8Entry {
        /// The directory being walked.
        root: String,
    },
}

impl JarError {
    fn io(path: impl AsRef<str>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_owned(),
            reason: err.to_string(),
        }
    }

    fn archive(path: impl AsRef<str>, err: &zip::result::ZipError) -> Self {
        Self::Archive {
            path: path.as_ref().to_owned(),
            reason: err.to_string(),
        }
    }
}

/// Result type for jar operations.
pub type Result<T> = std::result::Result<T, JarError>;

/// Named binary entries of a jar, sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JarContents {
    entries: BTreeMap<String, Vec<u8>>,
}

impl JarContents {
    /// An empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every file entry of the jar at `path`. Directory entries are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns [`JarError`] when the file cannot be opened or is not a
    /// valid archive.
    pub fn read(path: &Utf8Path) -> Result<Self> {
        let file = fs::File::open(path).map_err(|err| JarError::io(path, &err))?;
        Self::from_reader(file, path.as_str())
    }

    /// Read entries from any seekable zip stream; `label` names the source
    /// in errors.
    ///
    /// # Errors
    ///
    /// Returns [`JarError::Archive`] for malformed input.
    pub fn from_reader<R: Read + Seek>(reader: R, label: &str) -> Result<Self> {
        let mut archive = ZipArchive::new(reader).map_err(|err| JarError::archive(label, &err))?;
        let mut entries = BTreeMap::new();
        for index in 0..archive.len() {
            let mut file = archive
                .by_index(index)
                .map_err(|err| JarError::archive(label, &err))?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_owned();
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes)
                .map_err(|err| JarError::io(format!("{label}!{name}"), &err))?;
            entries.insert(name, bytes);
        }
        debug!("read {} entries from {label}", entries.len());
        Ok(Self { entries })
    }

    /// Collect every file below `root`, keyed by its slash-separated
    /// relative path. A missing directory yields an empty jar.
    ///
    /// # Errors
    ///
    /// Returns [`JarError`] when the directory cannot be walked or a file
    /// cannot be read.
    pub fn from_directory(root: &Utf8Path) -> Result<Self> {
        let mut contents = Self::new();
        if !root.is_dir() {
            debug!("{root} does not exist; treating as empty");
            return Ok(contents);
        }
        contents.add_directory(root)?;
        Ok(contents)
    }

    /// Add every file below `root`, replacing entries with the same name.
    ///
    /// # Errors
    ///
    /// Returns [`JarError`] when the directory cannot be walked or a file
    /// cannot be read.
    pub fn add_directory(&mut self, root: &Utf8Path) -> Result<()> {
        let escaped = glob::Pattern::escape(root.as_str());
        let pattern = format!("{escaped}/**/*");
        let paths = glob::glob(&pattern).map_err(|err| JarError::Io {
            path: root.to_string(),
            reason: err.to_string(),
        })?;
        for entry in paths {
            let path = entry.map_err(|err| JarError::Io {
                path: root.to_string(),
                reason: err.to_string(),
            })?;
            if !path.is_file() {
                continue;
            }
            let relative = path
                .strip_prefix(root.as_std_path())
                .ok()
                .and_then(|relative| relative.to_str())
                .ok_or_else(|| JarError::NonUtf8Entry {
                    root: root.to_string(),
                })?;
            let name = relative.replace('\\', "/");
            let bytes = fs::read(&path).map_err(|err| JarError::io(&name, &err))?;
            self.entries.insert(name, bytes);
        }
        Ok(())
    }

    /// Insert or replace an entry, returning the previous bytes.
    pub fn insert(&mut self, name: impl Into<String>, bytes: Vec<u8>) -> Option<Vec<u8>> {
        self.entries.insert(name.into(), bytes)
    }

    /// Remove an entry.
    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        self.entries.remove(name)
    }

    /// Bytes of an entry.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Whether an entry exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the jar has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries
            .iter()
            .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
    }

    /// Names of entries ending in `.class`, excluding module descriptors.
    pub fn class_entries(&self) -> impl Iterator<Item = &str> {
        self.entries
            .keys()
            .map(String::as_str)
            .filter(|name| is_class_entry(name))
    }

    /// Write the jar to `writer` with deflate compression and fixed
    /// timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`JarError`] when writing fails.
    pub fn write_to<W: Write + Seek>(&self, writer: W, label: &str) -> Result<()> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());
        let mut zip = ZipWriter::new(writer);

        let manifest = self.entries.get_key_value(MANIFEST_ENTRY);
        let rest = self
            .entries
            .iter()
            .filter(|(name, _)| name.as_str() != MANIFEST_ENTRY);
        for (name, bytes) in manifest.into_iter().chain(rest) {
            zip.start_file(name.as_str(), options)
                .map_err(|err| JarError::archive(label, &err))?;
            zip.write_all(bytes)
                .map_err(|err| JarError::io(format!("{label}!{name}"), &err))?;
        }
        zip.finish().map_err(|err| JarError::archive(label, &err))?;
        Ok(())
    }

    /// Write the jar to `path`, creating parent directories.
    ///
    /// The archive is written to a temporary file beside `path` and renamed
    /// into place once complete, so a failed write leaves any previous jar
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns [`JarError`] when the file cannot be created or written.
    pub fn write(&self, path: &Utf8Path) -> Result<()> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|err| JarError::io(parent, &err))?;
        let mut staged =
            tempfile::NamedTempFile::new_in(parent).map_err(|err| JarError::io(parent, &err))?;
        self.write_to(staged.as_file_mut(), path.as_str())?;
        staged
            .persist(path)
            .map_err(|err| JarError::io(path, &err.error))?;
        debug!("wrote {} entries to {path}", self.entries.len());
        Ok(())
    }
}

impl FromIterator<(String, Vec<u8>)> for JarContents {
    fn from_iter<I: IntoIterator<Item = (String, Vec<u8>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Whether an entry name is a class file other than a module descriptor.
#[must_use]
pub fn is_class_entry(name: &str) -> bool {
    name.ends_with(".class") && !name.ends_with("module-info.class")
}
