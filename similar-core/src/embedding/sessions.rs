use std::{fmt::Display, sync::{Arc, Mutex, MutexGuard, PoisonError}};
use camino::Utf8Path;
use log::debug;
use ort::session::{builder::GraphOptimizationLevel, Session};

use crate::embedding::EmbeddingError;

pub type SessionPool = Arc<Vec<Mutex<Session>>>;

pub trait SessionPoolExt {
    fn get_session(&'_ self) -> MutexGuard<'_, Session>;
}

impl SessionPoolExt for SessionPool {
    fn get_session(&'_ self) -> MutexGuard<'_, Session> {
        for session_mutex in self.iter() {
            if let Ok(session) = session_mutex.try_lock() {
                return session;
            }
        }
        // Fallback to waiting for any available session, poisoned or not
        self[0].lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub fn create_session_pool(pool_size: u32, model_path: &Utf8Path) -> Result<SessionPool, EmbeddingError> {
    debug!("Creating session pool of size {} for model at path: {}", pool_size, model_path);
    if !model_path.is_file() {
        return Err(EmbeddingError::Initialization {
            model_path: model_path.to_string(),
            source: anyhow::anyhow!("model file does not exist"),
        });
    }

    let sessions = (0..pool_size.max(1))
        .map(|_| {
            let session = Session::builder()
                .map_err(|e| init_error(model_path, e))?
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .map_err(|e| init_error(model_path, e))?
                .with_intra_threads(4)
                .map_err(|e| init_error(model_path, e))?
                .commit_from_file(model_path)
                .map_err(|e| init_error(model_path, e))?;

            Ok(Mutex::new(session))
        })
        .collect::<Result<Vec<_>, EmbeddingError>>()?;

    Ok(Arc::new(sessions))
}

fn init_error(model_path: &Utf8Path, e: impl Display) -> EmbeddingError {
    EmbeddingError::Initialization {
        model_path: model_path.to_string(),
        source: anyhow::anyhow!("{e}"),
    }
}
