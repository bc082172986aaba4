//! Lazily opened, reference-counted store handle.
//!
//! The reader never opens the file up front. The first access opens it through
//! a [`StoreOpener`]; later opens share the same store and the last
//! [`StoreHandle::close`] drops it. A closed handle reopens on the next access.

use super::ArrayStore;
use super::memory::InMemoryStore;
use crate::pvld_error::PvldError;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Produces a fresh store each time the file is (re)opened.
pub trait StoreOpener {
    type Store: ArrayStore;

    fn open(&self) -> Result<Self::Store, PvldError>;

    /// Human-readable file name for logs and errors.
    fn describe(&self) -> String;
}

/// Opens a JSON-serialized [`InMemoryStore`] from disk.
#[derive(Clone, Debug)]
pub struct JsonFileOpener {
    path: PathBuf,
}

impl JsonFileOpener {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl StoreOpener for JsonFileOpener {
    type Store = InMemoryStore;

    fn open(&self) -> Result<InMemoryStore, PvldError> {
        let file = File::open(&self.path)?;
        InMemoryStore::from_json_reader(BufReader::new(file))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Serves clones of a store that already lives in memory.
#[derive(Clone, Debug)]
pub struct SharedStore<S>(pub S);

impl<S: ArrayStore + Clone> StoreOpener for SharedStore<S> {
    type Store = S;

    fn open(&self) -> Result<S, PvldError> {
        Ok(self.0.clone())
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}

/// Open-on-demand handle with an open count.
pub struct StoreHandle<O: StoreOpener> {
    opener: O,
    store: Option<O::Store>,
    open_count: usize,
}

impl<O: StoreOpener> StoreHandle<O> {
    pub fn new(opener: O) -> Self {
        Self {
            opener,
            store: None,
            open_count: 0,
        }
    }

    /// Open the file (or bump the count of an open one) and return the store.
    pub fn open(&mut self) -> Result<&O::Store, PvldError> {
        if self.store.is_none() {
            log::debug!("opening {}", self.opener.describe());
            self.store = Some(self.opener.open()?);
        }
        self.open_count += 1;
        self.get()
    }

    /// The store, opening it if nobody has yet.
    pub fn get(&mut self) -> Result<&O::Store, PvldError> {
        if self.store.is_none() {
            return self.open();
        }
        self.store
            .as_ref()
            .ok_or_else(|| PvldError::Configuration("store handle lost its store".into()))
    }

    /// Drop one open; the store is released when the count reaches zero.
    pub fn close(&mut self) {
        self.open_count = self.open_count.saturating_sub(1);
        if self.open_count == 0 && self.store.take().is_some() {
            log::debug!("closed {}", self.opener.describe());
        }
    }

    /// Release the store regardless of the open count.
    pub fn close_all(&mut self) {
        self.open_count = 0;
        self.store = None;
    }

    pub fn is_open(&self) -> bool {
        self.store.is_some()
    }

    pub fn open_count(&self) -> usize {
        self.open_count
    }

    pub fn describe(&self) -> String {
        self.opener.describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingOpener<'a> {
        opens: &'a Cell<usize>,
    }

    impl StoreOpener for CountingOpener<'_> {
        type Store = InMemoryStore;

        fn open(&self) -> Result<InMemoryStore, PvldError> {
            self.opens.set(self.opens.get() + 1);
            Ok(InMemoryStore::new())
        }

        fn describe(&self) -> String {
            "counting".into()
        }
    }

    #[test]
    fn repeated_opens_share_one_store() {
        let opens = Cell::new(0);
        let mut handle = StoreHandle::new(CountingOpener { opens: &opens });
        assert!(!handle.is_open());
        handle.open().unwrap();
        handle.open().unwrap();
        assert_eq!(opens.get(), 1);
        assert_eq!(handle.open_count(), 2);
        handle.close();
        assert!(handle.is_open());
        handle.close();
        assert!(!handle.is_open());
        handle.get().unwrap();
        assert_eq!(opens.get(), 2);
    }

    #[test]
    fn missing_json_file_is_io_error() {
        let mut handle = StoreHandle::new(JsonFileOpener::new("/nonexistent/plot.json"));
        let err = handle.get().unwrap_err();
        assert_eq!(err.kind(), crate::pvld_error::ErrorKind::Io);
    }
}
