//! File-backed storage of one schema-encoded value.
//!
//! A database is a single `<dir>/<name>.dbsz` file holding either a
//! top-level encoded buffer or one of two ASCII sentinels: [`NO_DATA`] for a
//! database that was never written or was erased, and [`DO_NOT_EDIT`] for a
//! file that must not be loaded or overwritten.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::codec;
use crate::error::StoreError;
use crate::types::{Schema, SchemaSet};
use crate::value::Value;

/// File extension of database files.
pub const EXTENSION: &str = "dbsz";

/// Content of a database file that holds no value.
pub const NO_DATA: &[u8] = b"|no_data|";

/// Content of a database file that is locked against loading and writing.
pub const DO_NOT_EDIT: &[u8] = b"|do_not_edit|";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseOptions {
    /// Reload from disk before every `get`.
    pub auto_load: bool,
    /// Copy the previous file to `<file>.bak` before overwriting it.
    pub backup: bool,
    /// Write after every `set` and `push`.
    pub auto_write: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        DatabaseOptions {
            auto_load: false,
            backup: true,
            auto_write: true,
        }
    }
}

/// A value of one root schema, persisted to a single file.
#[derive(Debug)]
pub struct Database {
    set: SchemaSet,
    schema: usize,
    path: PathBuf,
    data: Option<Value>,
    options: DatabaseOptions,
}

impl Database {
    /// Open `<dir>/<name>.dbsz`, creating the directory and an empty
    /// database file if needed, and load it.
    pub fn open(
        dir: impl AsRef<Path>,
        name: &str,
        set: SchemaSet,
        schema_name: &str,
        options: DatabaseOptions,
    ) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        let schema = set
            .get_index(schema_name)
            .ok_or_else(|| StoreError::UnknownSchema(schema_name.to_string()))?;

        let stem = name.strip_suffix(".dbsz").unwrap_or(name);
        let path = dir.join(format!("{}.{}", stem, EXTENSION));

        fs::create_dir_all(dir).map_err(io_error(dir))?;
        if !path.exists() {
            info!(path = %path.display(), "creating empty database");
            fs::write(&path, NO_DATA).map_err(io_error(&path))?;
        }

        let mut db = Database {
            set,
            schema,
            path,
            data: None,
            options,
        };
        db.load()?;
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".bak");
        PathBuf::from(name)
    }

    pub fn schema(&self) -> &Schema {
        &self.set.schemas[self.schema]
    }

    pub fn schema_set(&self) -> &SchemaSet {
        &self.set
    }

    pub fn options(&self) -> DatabaseOptions {
        self.options
    }

    /// The value in memory, if one has been loaded or written.
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Read and decode the file.
    ///
    /// A sentinel file leaves the in-memory value untouched and returns
    /// `None`. Anything else must carry the root schema's fingerprint.
    pub fn load(&mut self) -> Result<Option<&Value>, StoreError> {
        let bytes = fs::read(&self.path).map_err(io_error(&self.path))?;
        if bytes == NO_DATA || bytes == DO_NOT_EDIT {
            debug!(path = %self.path.display(), "database holds a sentinel, nothing to load");
            return Ok(None);
        }

        let schema = &self.set.schemas[self.schema];
        codec::verify_schema_id(schema, &bytes)?;
        let value = codec::decode(&self.set, schema, &bytes)?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "loaded database");
        self.data = Some(value);
        Ok(self.data.as_ref())
    }

    /// Look up a dot-separated path (`players.0.name`); `""` is the whole
    /// value.
    pub fn get(&mut self, path: &str) -> Result<&Value, StoreError> {
        if self.options.auto_load {
            self.load()?;
        }
        self.data
            .as_ref()
            .ok_or(StoreError::NoData)?
            .get_path(path)
            .ok_or_else(|| StoreError::PathNotFound(path.to_string()))
    }

    /// Replace the value at `path`.
    ///
    /// The change stays in memory even if the automatic write fails.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<(), StoreError> {
        let data = self.data.as_mut().ok_or(StoreError::NoData)?;
        if !data.set_path(path, value.into()) {
            return Err(StoreError::PathNotFound(path.to_string()));
        }
        if self.options.auto_write {
            self.write()?;
        }
        Ok(())
    }

    /// Append to the array at `path` and return its new length.
    pub fn push(&mut self, path: &str, value: impl Into<Value>) -> Result<usize, StoreError> {
        let data = self.data.as_mut().ok_or(StoreError::NoData)?;
        let len = match data.get_path_mut(path) {
            Some(Value::Array(items)) => {
                items.push(value.into());
                items.len()
            }
            Some(_) => return Err(StoreError::NotAnArray(path.to_string())),
            None => return Err(StoreError::PathNotFound(path.to_string())),
        };
        if self.options.auto_write {
            self.write()?;
        }
        Ok(len)
    }

    /// Persist the in-memory value.
    pub fn write(&self) -> Result<(), StoreError> {
        let data = self.data.as_ref().ok_or(StoreError::NoData)?;
        self.write_value(data, self.options.backup)
    }

    /// Replace the whole value and persist it, always keeping a backup of
    /// the previous file.
    pub fn template(&mut self, value: Value) -> Result<(), StoreError> {
        self.write_value(&value, true)?;
        self.data = Some(value);
        Ok(())
    }

    /// Reset to an empty database. Does nothing unless both flags are set.
    pub fn erase(&mut self, confirm: bool, confirm_again: bool) -> Result<bool, StoreError> {
        if !(confirm && confirm_again) {
            return Ok(false);
        }

        self.data = Some(Value::new_struct());
        fs::write(&self.path, NO_DATA).map_err(io_error(&self.path))?;

        let backup = self.backup_path();
        match fs::remove_file(&backup) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(&backup)(e)),
        }
        warn!(path = %self.path.display(), "database erased");
        Ok(true)
    }

    /// Whether the file holds the [`NO_DATA`] sentinel.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        let bytes = fs::read(&self.path).map_err(io_error(&self.path))?;
        Ok(bytes == NO_DATA)
    }

    fn write_value(&self, value: &Value, backup: bool) -> Result<(), StoreError> {
        let encoded = codec::encode(&self.set, &self.set.schemas[self.schema], value)?;

        let previous = match fs::read(&self.path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(io_error(&self.path)(e)),
        };
        if previous.as_deref() == Some(DO_NOT_EDIT) {
            warn!(path = %self.path.display(), "refusing to write a do-not-edit database");
            return Err(StoreError::Locked(self.path.clone()));
        }
        if let (true, Some(previous)) = (backup, previous) {
            let backup_path = self.backup_path();
            fs::write(&backup_path, previous).map_err(io_error(&backup_path))?;
            debug!(path = %backup_path.display(), "kept backup");
        }

        fs::write(&self.path, &encoded).map_err(io_error(&self.path))?;
        debug!(path = %self.path.display(), bytes = encoded.len(), "wrote database");
        Ok(())
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use pretty_assertions::assert_eq;

    fn schema_set() -> SchemaSet {
        parser::parse(
            r#"
            .Player { name : string  score : uint16 }
            .Game {
                title   : string_small(16)
                open    : boolean
                players : *Player
            }
            "#,
        )
        .unwrap()
    }

    fn game() -> Value {
        Value::from_fields(vec![
            ("title", "chess".into()),
            ("open", true.into()),
            (
                "players",
                Value::Array(vec![Value::from_fields(vec![
                    ("name", "ann".into()),
                    ("score", 3i64.into()),
                ])]),
            ),
        ])
    }

    fn open(dir: &Path, options: DatabaseOptions) -> Database {
        Database::open(dir, "game", schema_set(), "Game", options).unwrap()
    }

    #[test]
    fn test_open_creates_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        let db = open(&nested, DatabaseOptions::default());
        assert_eq!(db.path(), nested.join("game.dbsz"));
        assert_eq!(fs::read(db.path()).unwrap(), NO_DATA);
        assert!(db.is_empty().unwrap());
        assert_eq!(db.data(), None);
    }

    #[test]
    fn test_name_extension_is_not_doubled() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path(), "game.dbsz", schema_set(), "Game", Default::default())
            .unwrap();
        assert_eq!(db.path(), dir.path().join("game.dbsz"));
    }

    #[test]
    fn test_unknown_schema() {
        let dir = tempfile::tempdir().unwrap();
        let err = Database::open(dir.path(), "g", schema_set(), "Nope", Default::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownSchema(name) if name == "Nope"));
    }

    #[test]
    fn test_template_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = open(dir.path(), DatabaseOptions::default());
        db.template(game()).unwrap();
        assert!(!db.is_empty().unwrap());
        assert_eq!(fs::read(db.backup_path()).unwrap(), NO_DATA);

        let mut reopened = open(dir.path(), DatabaseOptions::default());
        assert_eq!(reopened.get("").unwrap(), &game());
        assert_eq!(reopened.get("players.0.name").unwrap(), &Value::from("ann"));
    }

    #[test]
    fn test_set_and_push_write_through() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = open(dir.path(), DatabaseOptions::default());
        db.template(game()).unwrap();

        db.set("players.0.score", 10i64).unwrap();
        let player = Value::from_fields(vec![("name", "bo".into()), ("score", 7i64.into())]);
        assert_eq!(db.push("players", player).unwrap(), 2);

        let mut reopened = open(dir.path(), DatabaseOptions::default());
        assert_eq!(reopened.get("players.0.score").unwrap(), &Value::Integer(10));
        assert_eq!(reopened.get("players.1.name").unwrap(), &Value::from("bo"));
    }

    #[test]
    fn test_without_auto_write() {
        let dir = tempfile::tempdir().unwrap();
        let options = DatabaseOptions {
            auto_write: false,
            ..Default::default()
        };
        let mut db = open(dir.path(), options);
        db.template(game()).unwrap();
        db.set("title", "go").unwrap();

        let mut other = open(dir.path(), options);
        assert_eq!(other.get("title").unwrap(), &Value::from("chess"));

        db.write().unwrap();
        other.load().unwrap();
        assert_eq!(other.get("title").unwrap(), &Value::from("go"));
    }

    #[test]
    fn test_auto_load_sees_other_writers() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = open(dir.path(), DatabaseOptions::default());
        writer.template(game()).unwrap();
        let mut reader = open(
            dir.path(),
            DatabaseOptions {
                auto_load: true,
                ..Default::default()
            },
        );

        writer.set("open", false).unwrap();
        assert_eq!(reader.get("open").unwrap(), &Value::Boolean(false));
    }

    #[test]
    fn test_path_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = open(dir.path(), DatabaseOptions::default());
        assert!(matches!(db.get("title"), Err(StoreError::NoData)));
        assert!(matches!(db.set("title", "x"), Err(StoreError::NoData)));

        db.template(game()).unwrap();
        assert!(matches!(db.get("missing"), Err(StoreError::PathNotFound(_))));
        assert!(matches!(db.set("a.b", 1i64), Err(StoreError::PathNotFound(_))));
        assert!(matches!(db.push("title", 1i64), Err(StoreError::NotAnArray(_))));
        assert!(matches!(db.push("nope", 1i64), Err(StoreError::PathNotFound(_))));
    }

    #[test]
    fn test_invalid_value_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = open(dir.path(), DatabaseOptions::default());
        let err = db.template(Value::from_fields(vec![("title", "x".into())])).unwrap_err();
        assert!(matches!(err, StoreError::Encode(_)));
        assert!(db.is_empty().unwrap());
        assert_eq!(db.data(), None);
    }

    #[test]
    fn test_backup_option() {
        let dir = tempfile::tempdir().unwrap();
        let options = DatabaseOptions {
            backup: false,
            ..Default::default()
        };
        let mut db = open(dir.path(), options);
        db.template(game()).unwrap();
        fs::remove_file(db.backup_path()).unwrap();

        db.set("title", "go").unwrap();
        assert!(!db.backup_path().exists());

        let before = fs::read(db.path()).unwrap();
        db.template(game()).unwrap();
        assert_eq!(fs::read(db.backup_path()).unwrap(), before);
    }

    #[test]
    fn test_do_not_edit_is_never_loaded_or_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = open(dir.path(), DatabaseOptions::default());
        fs::write(db.path(), DO_NOT_EDIT).unwrap();

        assert_eq!(db.load().unwrap(), None);
        assert!(matches!(db.template(game()), Err(StoreError::Locked(_))));
        assert_eq!(fs::read(db.path()).unwrap(), DO_NOT_EDIT);
    }

    #[test]
    fn test_foreign_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = open(dir.path(), DatabaseOptions::default());
        fs::write(db.path(), [0, 0, 0, 1, 0, 0]).unwrap();
        assert!(matches!(db.load(), Err(StoreError::Decode(_))));
    }

    #[test]
    fn test_erase_needs_both_confirmations() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = open(dir.path(), DatabaseOptions::default());
        db.template(game()).unwrap();

        assert!(!db.erase(true, false).unwrap());
        assert!(!db.erase(false, true).unwrap());
        assert!(!db.is_empty().unwrap());

        assert!(db.erase(true, true).unwrap());
        assert!(db.is_empty().unwrap());
        assert!(!db.backup_path().exists());
        assert_eq!(db.data(), Some(&Value::new_struct()));
    }
}
