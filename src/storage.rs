use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::ChatError;
use crate::events::Message;
use crate::store::Transcript;

/// Durable key-value slot that holds the serialized transcript.
pub trait StorageBackend: Send {
    /// Returns `Ok(None)` when nothing has been stored yet.
    fn read(&self) -> Result<Option<String>, ChatError>;

    /// Replaces the stored value.
    fn write(&self, contents: &str) -> Result<(), ChatError>;
}

/// Stores the transcript as `<dir>/<key>.json`.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    /// The key must name a file directly inside `dir`.
    pub fn new(dir: &Path, key: &str) -> Result<Self, ChatError> {
        let is_plain = !key.trim().is_empty()
            && !key.contains("..")
            && !key.contains(['/', '\\']);
        if !is_plain {
            return Err(ChatError::InvalidStorageKey(key.to_string()));
        }

        Ok(Self {
            path: dir.join(format!("{}.json", key)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for FileBackend {
    fn read(&self) -> Result<Option<String>, ChatError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ChatError::PersistenceRead(format!(
                "{}: {}",
                self.path.display(),
                err
            ))),
        }
    }

    fn write(&self, contents: &str) -> Result<(), ChatError> {
        let write_err = |err: std::io::Error| {
            ChatError::PersistenceWrite(format!("{}: {}", self.path.display(), err))
        };

        let parent = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty());

        if let Some(dir) = parent {
            fs::create_dir_all(dir).map_err(write_err)?;
        }

        let mut temp_file = match parent {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new(),
        }
        .map_err(write_err)?;

        temp_file.write_all(contents.as_bytes()).map_err(write_err)?;
        temp_file.as_file_mut().sync_all().map_err(write_err)?;
        temp_file
            .persist(&self.path)
            .map_err(|err| write_err(err.error))?;
        Ok(())
    }
}

/// Process-local slot, used for `--ephemeral` runs and tests.
#[derive(Default)]
pub struct MemoryBackend {
    slot: Mutex<Option<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(contents.into())),
        }
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self) -> Result<Option<String>, ChatError> {
        let slot = self
            .slot
            .lock()
            .map_err(|e| ChatError::PersistenceRead(format!("slot lock poisoned: {}", e)))?;
        Ok(slot.clone())
    }

    fn write(&self, contents: &str) -> Result<(), ChatError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| ChatError::PersistenceWrite(format!("slot lock poisoned: {}", e)))?;
        *slot = Some(contents.to_string());
        Ok(())
    }
}

/// Makes the transcript outlive a single run.
///
/// The whole transcript is the unit of storage: no partial writes, no
/// versioning.
pub struct PersistenceAdapter {
    backend: Box<dyn StorageBackend>,
    greeting: String,
}

impl PersistenceAdapter {
    pub fn new(backend: Box<dyn StorageBackend>, greeting: impl Into<String>) -> Self {
        Self {
            backend,
            greeting: greeting.into(),
        }
    }

    /// Load the stored transcript, or the seeded greeting if there is none.
    ///
    /// Never fails: unreadable or malformed data is logged and treated the
    /// same as absent data.
    pub fn restore(&self) -> Transcript {
        match self.load() {
            Ok(Some(transcript)) => {
                debug!(messages = transcript.len(), "restored transcript");
                transcript
            }
            Ok(None) => {
                debug!("no stored transcript, seeding greeting");
                self.seeded()
            }
            Err(err) => {
                warn!(error = %err, "discarding stored transcript");
                self.seeded()
            }
        }
    }

    /// Overwrite the stored transcript.
    pub fn persist(&self, transcript: &Transcript) -> Result<(), ChatError> {
        let contents = serde_json::to_string(transcript)
            .map_err(|e| ChatError::PersistenceWrite(e.to_string()))?;
        self.backend.write(&contents)
    }

    fn load(&self) -> Result<Option<Transcript>, ChatError> {
        let Some(contents) = self.backend.read()? else {
            return Ok(None);
        };

        let transcript: Transcript = serde_json::from_str(&contents)
            .map_err(|e| ChatError::PersistenceRead(e.to_string()))?;

        // A session always starts with the greeting, so an empty list can
        // only come from a foreign or truncated write.
        if transcript.is_empty() {
            return Err(ChatError::PersistenceRead(
                "stored transcript is empty".to_string(),
            ));
        }

        Ok(Some(transcript))
    }

    fn seeded(&self) -> Transcript {
        Transcript::new(vec![Message::assistant(self.greeting.clone())])
    }
}
