use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use thiserror::Error;

use crate::adapters::db;
use crate::adapters::db::DbError;
use crate::domain::models::{NewSleepSession, SleepSession};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database lock poisoned")]
    DbLockPoisoned,
    #[error("database operation failed: {0}")]
    Database(#[from] DbError),
}

pub trait SessionStore {
    fn insert(&self, new_session: &NewSleepSession) -> Result<i64, StoreError>;
    fn update(&self, session: &SleepSession) -> Result<(), StoreError>;
    fn get(&self, id: i64) -> Result<Option<SleepSession>, StoreError>;
    fn latest(&self) -> Result<Option<SleepSession>, StoreError>;
    fn list_all(&self) -> Result<Vec<SleepSession>, StoreError>;
    fn list_page(&self, limit: u32, offset: u32) -> Result<Vec<SleepSession>, StoreError>;
    fn clear(&self) -> Result<usize, StoreError>;
    fn count(&self) -> Result<i64, StoreError>;
    fn schema_version(&self) -> Result<u32, StoreError>;
}

#[derive(Clone)]
pub struct SqliteSessionStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteSessionStore {
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn with_connection<T>(
        &self,
        op: impl FnOnce(&Connection) -> Result<T, DbError>,
    ) -> Result<T, StoreError> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| StoreError::DbLockPoisoned)?;
        op(&connection).map_err(StoreError::from)
    }
}

impl SessionStore for SqliteSessionStore {
    fn insert(&self, new_session: &NewSleepSession) -> Result<i64, StoreError> {
        self.with_connection(|connection| db::insert_session(connection, new_session))
    }

    fn update(&self, session: &SleepSession) -> Result<(), StoreError> {
        self.with_connection(|connection| db::update_session(connection, session))
    }

    fn get(&self, id: i64) -> Result<Option<SleepSession>, StoreError> {
        self.with_connection(|connection| db::get_session(connection, id))
    }

    fn latest(&self) -> Result<Option<SleepSession>, StoreError> {
        self.with_connection(db::get_latest_session)
    }

    fn list_all(&self) -> Result<Vec<SleepSession>, StoreError> {
        self.with_connection(db::list_all_sessions)
    }

    fn list_page(&self, limit: u32, offset: u32) -> Result<Vec<SleepSession>, StoreError> {
        self.with_connection(|connection| db::list_sessions(connection, limit, offset))
    }

    fn clear(&self) -> Result<usize, StoreError> {
        self.with_connection(db::clear_sessions)
    }

    fn count(&self) -> Result<i64, StoreError> {
        self.with_connection(db::count_sessions)
    }

    fn schema_version(&self) -> Result<u32, StoreError> {
        self.with_connection(db::schema_version)
    }
}
