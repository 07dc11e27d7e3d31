//! Resolution of backend resources from handles, paths and model names.

use crate::{EmbeddingError, EmbeddingResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Environment variable overriding the directory named models live in.
pub const MODEL_HOME_ENV: &str = "LANGVEC_HOME";

/// A backend resource that can be read from disk.
pub trait LoadResource: Sized {
    /// Human-readable kind, used in error messages.
    const KIND: &'static str;

    fn load(path: &Path) -> EmbeddingResult<Self>;
}

/// Where an adapter gets its backend from.
#[derive(Debug, Clone)]
pub enum Source<T> {
    /// An already loaded, externally owned handle. Never reloaded.
    Loaded(Arc<T>),
    /// A file or directory on disk.
    Path(PathBuf),
    /// A model name resolved under [`model_home`].
    Named(String),
}

impl<T: LoadResource> Source<T> {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Source::Path(path.into())
    }

    pub fn named(name: impl Into<String>) -> Self {
        Source::Named(name.into())
    }

    /// Produce a ready-to-use handle, loading from disk if needed.
    pub fn resolve(self) -> EmbeddingResult<Arc<T>> {
        match self {
            Source::Loaded(handle) => Ok(handle),
            Source::Path(path) => load_checked::<T>(&path),
            Source::Named(name) => {
                let home = model_home().ok_or_else(|| {
                    EmbeddingError::Resource(format!(
                        "Cannot resolve {} model {:?}: no model home. Set {}.",
                        T::KIND,
                        name,
                        MODEL_HOME_ENV
                    ))
                })?;
                let path = home.join(&name);
                if !path.exists() {
                    return Err(EmbeddingError::Resource(format!(
                        "Unknown {} model {:?} (looked in {})",
                        T::KIND,
                        name,
                        home.display()
                    )));
                }
                load_checked::<T>(&path)
            }
        }
    }
}

impl<T> From<Arc<T>> for Source<T> {
    fn from(handle: Arc<T>) -> Self {
        Source::Loaded(handle)
    }
}

impl<T> From<&str> for Source<T> {
    fn from(path: &str) -> Self {
        Source::Path(PathBuf::from(path))
    }
}

impl<T> From<PathBuf> for Source<T> {
    fn from(path: PathBuf) -> Self {
        Source::Path(path)
    }
}

impl<T> From<&Path> for Source<T> {
    fn from(path: &Path) -> Self {
        Source::Path(path.to_path_buf())
    }
}

fn load_checked<T: LoadResource>(path: &Path) -> EmbeddingResult<Arc<T>> {
    if !path.exists() {
        return Err(EmbeddingError::Resource(format!(
            "{} model not found: {}",
            T::KIND,
            path.display()
        )));
    }
    debug!(kind = T::KIND, path = %path.display(), "loading backend resource");
    T::load(path).map(Arc::new)
}

/// Directory holding named models: `$LANGVEC_HOME`, else `<data dir>/langvec`.
pub fn model_home() -> Option<PathBuf> {
    match std::env::var_os(MODEL_HOME_ENV) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::data_dir().map(|d| d.join("langvec")),
    }
}

/// Map a directory to the file inside it, leaving file paths untouched.
pub(crate) fn file_in(path: &Path, default_name: &str) -> PathBuf {
    if path.is_dir() {
        path.join(default_name)
    } else {
        path.to_path_buf()
    }
}

/// Read a whole file, reporting failures as resource errors.
pub(crate) fn read_resource(path: &Path) -> EmbeddingResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        EmbeddingError::Resource(format!("Failed to read {}: {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::VECTORS_FILE;
    use crate::{Embedder, VectorTable};
    use std::sync::Mutex;

    // Serializes tests that read or set `LANGVEC_HOME`.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_model_home<R>(home: &Path, f: impl FnOnce() -> R) -> R {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let previous = std::env::var_os(MODEL_HOME_ENV);
        std::env::set_var(MODEL_HOME_ENV, home);
        let result = f();
        match previous {
            Some(value) => std::env::set_var(MODEL_HOME_ENV, value),
            None => std::env::remove_var(MODEL_HOME_ENV),
        }
        result
    }

    #[test]
    fn missing_path_is_resource_error() {
        let source: Source<VectorTable> = Source::path("/definitely/not/here");
        let err = source.resolve().unwrap_err();
        assert!(matches!(err, EmbeddingError::Resource(_)));
    }

    #[test]
    fn loaded_handle_is_not_reloaded() {
        let table = Arc::new(VectorTable::from_pairs(vec![("a", vec![1.0])]).unwrap());
        let resolved = Source::Loaded(table.clone()).resolve().unwrap();
        assert!(Arc::ptr_eq(&table, &resolved));
    }

    #[test]
    fn unknown_name_is_resource_error() {
        let home = tempfile::TempDir::new().unwrap();
        let result = with_model_home(home.path(), || {
            Source::<VectorTable>::named("no_such_model_xyz_123").resolve()
        });
        let err = result.unwrap_err();
        assert!(matches!(err, EmbeddingError::Resource(_)));
        assert!(err.to_string().contains("Unknown vector table model"));
    }

    #[test]
    fn named_model_resolves_under_model_home() {
        let home = tempfile::TempDir::new().unwrap();
        let model = home.path().join("colors");
        std::fs::create_dir(&model).unwrap();
        std::fs::write(model.join(VECTORS_FILE), "2 2\nred 1 0\nblue 0 1\n").unwrap();

        let (resolved_home, table) = with_model_home(home.path(), || {
            (model_home(), Source::<VectorTable>::named("colors").resolve())
        });
        assert_eq!(resolved_home, Some(home.path().to_path_buf()));
        let table = table.unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.model_name(), "colors");
        assert_eq!(table.embed("blue").unwrap(), vec![0.0, 1.0]);
    }
}
