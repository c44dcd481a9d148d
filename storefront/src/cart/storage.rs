// storefront/src/cart/storage.rs

//! Key-value storage standing in for the browser's local storage.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

pub trait LocalStorage: Send + Sync {
  fn get_item(&self, key: &str) -> io::Result<Option<String>>;
  fn set_item(&self, key: &str, value: &str) -> io::Result<()>;
  fn remove_item(&self, key: &str) -> io::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
  items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

impl LocalStorage for MemoryStorage {
  fn get_item(&self, key: &str) -> io::Result<Option<String>> {
    Ok(self.items.lock().get(key).cloned())
  }

  fn set_item(&self, key: &str, value: &str) -> io::Result<()> {
    self.items.lock().insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove_item(&self, key: &str) -> io::Result<()> {
    self.items.lock().remove(key);
    Ok(())
  }
}

/// One `<key>.json` file per key under `dir`.
#[derive(Debug, Clone)]
pub struct FileStorage {
  dir: PathBuf,
}

impl FileStorage {
  pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
    let dir = dir.into();
    std::fs::create_dir_all(&dir)?;
    Ok(Self { dir })
  }

  fn path_for(&self, key: &str) -> io::Result<PathBuf> {
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
      return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("invalid storage key '{}'", key)));
    }
    Ok(self.dir.join(format!("{}.json", key)))
  }
}

impl LocalStorage for FileStorage {
  fn get_item(&self, key: &str) -> io::Result<Option<String>> {
    match std::fs::read_to_string(self.path_for(key)?) {
      Ok(value) => Ok(Some(value)),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e),
    }
  }

  fn set_item(&self, key: &str, value: &str) -> io::Result<()> {
    let path = self.path_for(key)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, value)?;
    std::fs::rename(tmp, path)
  }

  fn remove_item(&self, key: &str) -> io::Result<()> {
    match std::fs::remove_file(self.path_for(key)?) {
      Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
      _ => Ok(()),
    }
  }
}
