//! Directory-backed folder of entries.
//!
//! Each entry is one file named `{state}_{id}{extension}`, where `state`
//! is `N` (new) or `O` (old) and `id` is the 44-character message id.
//! Changing the state renames the file; the contents are never touched.
//!
//! Writes go to a temporary file in the same directory which is then
//! renamed into place, so a crash never leaves a half-written entry
//! under a valid key.

use std::fs;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use postern_mail::message::MESSAGE_ID_STRING_LEN;
use postern_mail::MessageId;
use tracing::{debug, trace, warn};

use crate::entry::StoreEntry;
use crate::{Result, StoreError};

/// Prefix of in-flight temporary files.
const TEMP_PREFIX: &str = ".tmp_";

/// New/old state of a stored entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryState {
    /// Unread (incoming) or unsent (outgoing).
    New,
    /// Read or sent.
    Old,
}

impl EntryState {
    /// The single-character tag used in storage keys.
    pub fn tag(self) -> char {
        match self {
            Self::New => 'N',
            Self::Old => 'O',
        }
    }

    /// Parse a storage key tag.
    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            'N' => Some(Self::New),
            'O' => Some(Self::Old),
            _ => None,
        }
    }

    /// State for a new flag.
    pub fn from_new(is_new: bool) -> Self {
        if is_new {
            Self::New
        } else {
            Self::Old
        }
    }

    /// Whether this is [`EntryState::New`].
    pub fn is_new(self) -> bool {
        self == Self::New
    }
}

/// A folder of entries of type `T`, stored in one directory.
///
/// Operations on different ids are safe to run concurrently. Concurrent
/// mutation of the same id is not supported.
#[derive(Debug)]
pub struct Folder<T> {
    dir: PathBuf,
    _entry: PhantomData<fn() -> T>,
}

impl<T: StoreEntry> Folder<T> {
    /// Open a folder, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        debug!(path = %dir.display(), "Opened folder");
        Ok(Self {
            dir,
            _entry: PhantomData,
        })
    }

    /// The folder directory.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Storage key for an id in a state.
    pub fn key(id: &MessageId, state: EntryState) -> String {
        format!("{}_{}{}", state.tag(), id.to_base64(), T::EXTENSION)
    }

    /// Parse a storage key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`] if the key does not follow the
    /// layout.
    pub fn parse_key(key: &str) -> Result<(EntryState, MessageId)> {
        let invalid = || StoreError::InvalidKey(key.to_string());

        let stem = key.strip_suffix(T::EXTENSION).ok_or_else(invalid)?;
        let (tag, id) = stem.split_once('_').ok_or_else(invalid)?;

        let mut chars = tag.chars();
        let state = match (chars.next(), chars.next()) {
            (Some(c), None) => EntryState::from_tag(c).ok_or_else(invalid)?,
            _ => return Err(invalid()),
        };
        if id.len() != MESSAGE_ID_STRING_LEN {
            return Err(invalid());
        }
        let id = MessageId::from_base64(id).ok_or_else(invalid)?;
        Ok((state, id))
    }

    fn entry_path(&self, id: &MessageId, state: EntryState) -> PathBuf {
        self.dir.join(Self::key(id, state))
    }

    fn find(&self, id: &MessageId) -> Option<(EntryState, PathBuf)> {
        [EntryState::New, EntryState::Old]
            .into_iter()
            .map(|state| (state, self.entry_path(id, state)))
            .find(|(_, path)| path.is_file())
    }

    /// Store an entry under its id and new flag.
    ///
    /// Returns `false` without writing when an entry with the same id is
    /// already stored (first write wins).
    pub fn add(&self, entry: &T) -> Result<bool> {
        let id = entry.id();
        if self.contains(&id) {
            debug!(%id, "Entry already stored");
            return Ok(false);
        }

        let key = Self::key(&id, EntryState::from_new(entry.is_new()));
        let write_failed = |e: std::io::Error| StoreError::WriteFailed {
            key: key.clone(),
            reason: e.to_string(),
        };

        let mut temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.dir)
            .map_err(write_failed)?;
        temp.write_all(&entry.to_bytes()).map_err(write_failed)?;
        temp.as_file().sync_all().map_err(write_failed)?;

        let temp_name = temp.path().display().to_string();
        temp.persist(self.dir.join(&key))
            .map_err(|e| StoreError::RenameFailed {
                from: temp_name,
                to: key.clone(),
                reason: e.error.to_string(),
            })?;

        trace!(%key, "Stored entry");
        Ok(true)
    }

    /// Whether an entry with this id is stored.
    pub fn contains(&self, id: &MessageId) -> bool {
        self.find(id).is_some()
    }

    /// The stored state of an entry.
    pub fn state(&self, id: &MessageId) -> Result<EntryState> {
        self.find(id)
            .map(|(state, _)| state)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Read an entry. Its new flag reflects the stored state.
    pub fn get(&self, id: &MessageId) -> Result<T> {
        let (state, path) = self
            .find(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let bytes = fs::read(&path)?;
        let mut entry = T::from_bytes(*id, &bytes)?;
        entry.set_new(state.is_new());
        Ok(entry)
    }

    /// Remove an entry.
    pub fn delete(&self, id: &MessageId) -> Result<()> {
        let (state, path) = self
            .find(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        fs::remove_file(&path).map_err(|e| StoreError::DeleteFailed {
            key: Self::key(id, state),
            reason: e.to_string(),
        })?;
        debug!(%id, "Deleted entry");
        Ok(())
    }

    /// Change the stored state of an entry without touching its contents.
    pub fn set_new(&self, id: &MessageId, is_new: bool) -> Result<()> {
        let (state, path) = self
            .find(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let target = EntryState::from_new(is_new);
        if state == target {
            return Ok(());
        }

        fs::rename(&path, self.entry_path(id, target)).map_err(|e| StoreError::RenameFailed {
            from: Self::key(id, state),
            to: Self::key(id, target),
            reason: e.to_string(),
        })?;
        trace!(%id, state = ?target, "Changed entry state");
        Ok(())
    }

    /// Ids and states of all stored entries, ordered by id.
    ///
    /// Files that do not follow the key layout are logged and skipped.
    pub fn entries(&self) -> Result<Vec<(MessageId, EntryState)>> {
        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(&self.dir)? {
            let dir_entry = dir_entry?;
            let name = dir_entry.file_name();
            let Some(name) = name.to_str() else {
                warn!(path = %dir_entry.path().display(), "Skipping non-UTF-8 file name");
                continue;
            };
            if name.starts_with(TEMP_PREFIX) {
                continue;
            }
            match Self::parse_key(name) {
                Ok((state, id)) => entries.push((id, state)),
                Err(e) => warn!(error = %e, "Skipping unrecognized file"),
            }
        }
        entries.sort_by_key(|(id, _)| *id);
        Ok(entries)
    }

    /// All readable entries ordered by `field`.
    ///
    /// Entries that cannot be read are logged and left out.
    pub fn list(&self, field: T::SortField, descending: bool) -> Result<Vec<T>> {
        let mut items: Vec<T> = self
            .entries()?
            .into_iter()
            .filter_map(|(id, _)| match self.get(&id) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(%id, error = %e, "Skipping unreadable entry");
                    None
                }
            })
            .collect();

        if descending {
            items.sort_by(|a, b| b.compare(a, field));
        } else {
            items.sort_by(|a, b| a.compare(b, field));
        }
        Ok(items)
    }

    /// Number of stored entries.
    pub fn len(&self) -> Result<usize> {
        Ok(self.entries()?.len())
    }

    /// Whether the folder is empty.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Number of entries in the new state.
    pub fn count_new(&self) -> Result<usize> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|(_, state)| state.is_new())
            .count())
    }
}
