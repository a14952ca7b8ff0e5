use anyhow::Result;
use tracing::info;

use crate::answer::AnswerClient;
use crate::config::Config;
use crate::orchestrator::AnswerOrchestrator;
use crate::storage::{FileBackend, MemoryBackend, PersistenceAdapter, StorageBackend};

/// Everything one conversation needs: the restored state machine and the
/// client it sends questions through
pub struct Session {
    pub config: Config,
    pub orchestrator: AnswerOrchestrator,
    pub client: AnswerClient,
}

impl Session {
    /// Restore the stored conversation (or start a fresh one) for `config`.
    ///
    /// With `ephemeral` set nothing touches the disk and the conversation
    /// always starts from the greeting.
    pub fn open(config: Config, ephemeral: bool) -> Result<Self> {
        let backend: Box<dyn StorageBackend> = if ephemeral {
            Box::new(MemoryBackend::new())
        } else {
            config.ensure_home()?;
            let backend = FileBackend::new(&config.garai_home, &config.storage_key)?;
            info!(path = %backend.path().display(), "using transcript file");
            Box::new(backend)
        };

        let persistence = PersistenceAdapter::new(backend, config.greeting.clone());
        let orchestrator = AnswerOrchestrator::restore(persistence, config.failure_message.clone());
        let client = AnswerClient::new(&config)?;

        info!(
            endpoint = %client.endpoint(),
            messages = orchestrator.transcript().len(),
            "session ready"
        );

        Ok(Self {
            config,
            orchestrator,
            client,
        })
    }
}
