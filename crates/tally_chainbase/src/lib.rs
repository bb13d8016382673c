use std::path::Path;

use fjall::{Config, PersistMode, TransactionalKeyspace};
use tally_serialization::{NumBytes, Read, Write};

mod error;
pub use error::ChainbaseError;

mod undo_session;
pub use undo_session::{ScopeToken, UndoSession};

/// A record stored in its own partition, addressed by an encoded primary key.
pub trait ChainbaseObject: Read + Write + NumBytes {
    type PrimaryKey;

    fn primary_key(&self) -> Vec<u8>;
    fn primary_key_to_bytes(key: Self::PrimaryKey) -> Vec<u8>;
    fn table_name() -> &'static str;
}

#[derive(Clone)]
pub struct Database {
    keyspace: TransactionalKeyspace,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, ChainbaseError> {
        Ok(Self {
            keyspace: Config::new(path).open_transactional()?,
        })
    }

    /// Opens a keyspace that is deleted when the last handle is dropped.
    pub fn temporary(path: &Path) -> Result<Self, ChainbaseError> {
        Ok(Self {
            keyspace: Config::new(path).temporary(true).open_transactional()?,
        })
    }

    /// Begins the outermost write transaction. Nothing it writes is visible
    /// to other readers until [`UndoSession::commit`].
    pub fn undo_session(&self) -> Result<UndoSession, ChainbaseError> {
        UndoSession::new(&self.keyspace)
    }

    /// Reads the last committed version of a record.
    pub fn find<T: ChainbaseObject>(
        &self,
        key: T::PrimaryKey,
    ) -> Result<Option<T>, ChainbaseError> {
        let partition = self
            .keyspace
            .open_partition(T::table_name(), Default::default())?;
        let tx = self.keyspace.read_tx();
        match tx.get(&partition, T::primary_key_to_bytes(key))? {
            Some(serialized) => Ok(Some(T::unpack(&serialized)?)),
            None => Ok(None),
        }
    }

    /// Flushes committed transactions to stable storage.
    pub fn persist(&self) -> Result<(), ChainbaseError> {
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tally_proc_macros::{NumBytes, Read, Write};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Read, Write, NumBytes)]
    pub struct Counter {
        pub id: u64,
        pub value: u64,
    }

    impl ChainbaseObject for Counter {
        type PrimaryKey = u64;

        fn primary_key(&self) -> Vec<u8> {
            Counter::primary_key_to_bytes(self.id)
        }

        fn primary_key_to_bytes(key: Self::PrimaryKey) -> Vec<u8> {
            key.to_be_bytes().to_vec()
        }

        fn table_name() -> &'static str {
            "counter"
        }
    }

    fn counter(session: &mut UndoSession, id: u64) -> Option<u64> {
        session.find::<Counter>(id).unwrap().map(|c| c.value)
    }

    fn bump(session: &mut UndoSession, id: u64) {
        let mut c = session.get::<Counter>(id).unwrap();
        session.modify(&mut c, |c| c.value += 1).unwrap();
    }

    #[test]
    fn test_insert_find_modify_remove() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::temporary(dir.path()).unwrap();
        let mut session = db.undo_session().unwrap();

        session.insert(&Counter { id: 1, value: 5 }).unwrap();
        assert_eq!(
            session.insert(&Counter { id: 1, value: 6 }),
            Err(ChainbaseError::AlreadyExists)
        );
        assert!(session.exists::<Counter>(1).unwrap());
        bump(&mut session, 1);
        assert_eq!(counter(&mut session, 1), Some(6));

        let c = session.get::<Counter>(1).unwrap();
        session.remove(&c).unwrap();
        assert_eq!(counter(&mut session, 1), None);
        assert_eq!(session.get::<Counter>(1), Err(ChainbaseError::NotFound));
    }

    #[test]
    fn test_nested_scopes() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::temporary(dir.path()).unwrap();
        let mut session = db.undo_session().unwrap();
        session.insert(&Counter { id: 1, value: 0 }).unwrap();

        let outer = session.begin_scope();
        bump(&mut session, 1);
        session.insert(&Counter { id: 2, value: 10 }).unwrap();

        let inner = session.begin_scope();
        bump(&mut session, 1);
        let two = session.get::<Counter>(2).unwrap();
        session.remove(&two).unwrap();
        assert_eq!(session.depth(), 2);
        session.undo(inner).unwrap();

        assert_eq!(counter(&mut session, 1), Some(1));
        assert_eq!(counter(&mut session, 2), Some(10));

        let inner = session.begin_scope();
        bump(&mut session, 1);
        session.squash(inner).unwrap();
        assert_eq!(counter(&mut session, 1), Some(2));

        // the squashed changes now belong to the outer scope
        session.undo(outer).unwrap();
        assert_eq!(counter(&mut session, 1), Some(0));
        assert_eq!(counter(&mut session, 2), None);
        assert_eq!(session.depth(), 0);
    }

    #[test]
    fn test_scope_order_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::temporary(dir.path()).unwrap();
        let mut session = db.undo_session().unwrap();

        let outer = session.begin_scope();
        let _inner = session.begin_scope();
        assert_eq!(
            session.undo(outer),
            Err(ChainbaseError::ScopeMismatch {
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(session.commit(), Err(ChainbaseError::OpenScopes(2)));
    }

    #[test]
    fn test_commit_and_rollback() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::temporary(dir.path()).unwrap();

        let mut session = db.undo_session().unwrap();
        session.insert(&Counter { id: 7, value: 1 }).unwrap();
        assert_eq!(db.find::<Counter>(7).unwrap(), None);
        session.commit().unwrap();
        assert_eq!(db.find::<Counter>(7).unwrap().map(|c| c.value), Some(1));

        let mut session = db.undo_session().unwrap();
        bump(&mut session, 7);
        session.rollback();
        assert_eq!(db.find::<Counter>(7).unwrap().map(|c| c.value), Some(1));
    }

    #[test]
    fn test_find_range() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::temporary(dir.path()).unwrap();
        let mut session = db.undo_session().unwrap();
        for id in [5u64, 1, 3, 9] {
            session.insert(&Counter { id, value: id * 10 }).unwrap();
        }
        let found = session
            .find_range::<Counter>(
                Counter::primary_key_to_bytes(2),
                Counter::primary_key_to_bytes(9),
            )
            .unwrap();
        let ids: Vec<u64> = found.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 5]);
    }

    #[test]
    fn test_committed_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let db = Database::open(dir.path()).unwrap();
            let mut session = db.undo_session().unwrap();
            session.insert(&Counter { id: 1, value: 42 }).unwrap();
            session.commit().unwrap();
            db.persist().unwrap();
        }
        let db = Database::open(dir.path()).unwrap();
        assert_eq!(db.find::<Counter>(1).unwrap().map(|c| c.value), Some(42));
    }
}
