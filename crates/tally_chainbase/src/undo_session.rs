use std::collections::HashMap;

use fjall::{TransactionalKeyspace, TransactionalPartitionHandle, WriteTransaction};

use crate::{ChainbaseError, ChainbaseObject};

enum ObjectChange {
    New {
        table: &'static str,
        key: Vec<u8>,
    },
    Modified {
        table: &'static str,
        key: Vec<u8>,
        old: Vec<u8>,
    },
    Deleted {
        table: &'static str,
        key: Vec<u8>,
        old: Vec<u8>,
    },
}

/// Proof that a nested scope is open. It must be handed back to
/// [`UndoSession::squash`] or [`UndoSession::undo`], innermost first.
#[must_use = "an open scope must be squashed or undone"]
#[derive(Debug)]
pub struct ScopeToken {
    depth: usize,
}

/// A write transaction with a stack of nested undo scopes.
///
/// Writes go straight to the transaction. While at least one scope is open,
/// each write also records the prior bytes in the innermost scope's journal,
/// so that scope can be replayed backwards without touching the others.
pub struct UndoSession {
    tx: WriteTransaction,
    keyspace: TransactionalKeyspace,
    partitions: HashMap<&'static str, TransactionalPartitionHandle>,
    scopes: Vec<Vec<ObjectChange>>,
}

impl UndoSession {
    pub fn new(keyspace: &TransactionalKeyspace) -> Result<Self, ChainbaseError> {
        Ok(Self {
            tx: keyspace.write_tx()?,
            keyspace: keyspace.clone(),
            partitions: HashMap::new(),
            scopes: Vec::new(),
        })
    }

    fn partition(&mut self, table: &'static str) -> Result<TransactionalPartitionHandle, ChainbaseError> {
        if let Some(partition) = self.partitions.get(table) {
            return Ok(partition.clone());
        }
        let partition = self.keyspace.open_partition(table, Default::default())?;
        self.partitions.insert(table, partition.clone());
        Ok(partition)
    }

    fn journal(&mut self, change: ObjectChange) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(change);
        }
    }

    /// Number of nested scopes currently open.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn exists<T: ChainbaseObject>(&mut self, key: T::PrimaryKey) -> Result<bool, ChainbaseError> {
        let partition = self.partition(T::table_name())?;
        Ok(self
            .tx
            .contains_key(&partition, T::primary_key_to_bytes(key))?)
    }

    pub fn find<T: ChainbaseObject>(
        &mut self,
        key: T::PrimaryKey,
    ) -> Result<Option<T>, ChainbaseError> {
        let partition = self.partition(T::table_name())?;
        match self.tx.get(&partition, T::primary_key_to_bytes(key))? {
            Some(serialized) => Ok(Some(T::unpack(&serialized)?)),
            None => Ok(None),
        }
    }

    pub fn get<T: ChainbaseObject>(&mut self, key: T::PrimaryKey) -> Result<T, ChainbaseError> {
        self.find::<T>(key)?.ok_or(ChainbaseError::NotFound)
    }

    /// Returns every record whose encoded key falls in `[lower, upper)`, in key order.
    pub fn find_range<T: ChainbaseObject>(
        &mut self,
        lower: Vec<u8>,
        upper: Vec<u8>,
    ) -> Result<Vec<T>, ChainbaseError> {
        let partition = self.partition(T::table_name())?;
        let mut objects = Vec::new();
        for item in self.tx.range(&partition, lower..upper) {
            let (_, serialized) = item?;
            objects.push(T::unpack(&serialized)?);
        }
        Ok(objects)
    }

    pub fn insert<T: ChainbaseObject>(&mut self, object: &T) -> Result<(), ChainbaseError> {
        let table = T::table_name();
        let partition = self.partition(table)?;
        let key = object.primary_key();
        if self.tx.contains_key(&partition, &key)? {
            return Err(ChainbaseError::AlreadyExists);
        }
        let serialized = object.pack()?;
        self.tx.insert(&partition, key.clone(), serialized);
        self.journal(ObjectChange::New { table, key });
        Ok(())
    }

    /// Applies `f` to `object` and stores the result under the object's key.
    pub fn modify<T, F>(&mut self, object: &mut T, f: F) -> Result<(), ChainbaseError>
    where
        T: ChainbaseObject,
        F: FnOnce(&mut T),
    {
        let table = T::table_name();
        let partition = self.partition(table)?;
        let key = object.primary_key();
        let old = self
            .tx
            .get(&partition, &key)?
            .ok_or(ChainbaseError::NotFound)?
            .to_vec();
        f(object);
        if object.primary_key() != key {
            return Err(ChainbaseError::InternalError(format!(
                "modify changed the primary key of a {} record",
                table
            )));
        }
        let serialized = object.pack()?;
        self.tx.insert(&partition, key.clone(), serialized);
        self.journal(ObjectChange::Modified { table, key, old });
        Ok(())
    }

    pub fn remove<T: ChainbaseObject>(&mut self, object: &T) -> Result<(), ChainbaseError> {
        let table = T::table_name();
        let partition = self.partition(table)?;
        let key = object.primary_key();
        let old = self
            .tx
            .get(&partition, &key)?
            .ok_or(ChainbaseError::NotFound)?
            .to_vec();
        self.tx.remove(&partition, key.clone());
        self.journal(ObjectChange::Deleted { table, key, old });
        Ok(())
    }

    pub fn begin_scope(&mut self) -> ScopeToken {
        self.scopes.push(Vec::new());
        ScopeToken {
            depth: self.scopes.len(),
        }
    }

    fn close_scope(&mut self, token: ScopeToken) -> Result<Vec<ObjectChange>, ChainbaseError> {
        if token.depth != self.scopes.len() {
            return Err(ChainbaseError::ScopeMismatch {
                expected: self.scopes.len(),
                actual: token.depth,
            });
        }
        self.scopes
            .pop()
            .ok_or(ChainbaseError::ScopeMismatch {
                expected: 0,
                actual: token.depth,
            })
    }

    /// Keeps the scope's changes, handing their journal to the enclosing scope
    /// so an outer undo still reverts them.
    pub fn squash(&mut self, token: ScopeToken) -> Result<(), ChainbaseError> {
        let changes = self.close_scope(token)?;
        if let Some(parent) = self.scopes.last_mut() {
            parent.extend(changes);
        }
        Ok(())
    }

    /// Reverts every write made since the scope was opened.
    pub fn undo(&mut self, token: ScopeToken) -> Result<(), ChainbaseError> {
        let changes = self.close_scope(token)?;
        for change in changes.into_iter().rev() {
            match change {
                ObjectChange::New { table, key } => {
                    let partition = self.partition(table)?;
                    self.tx.remove(&partition, key);
                }
                ObjectChange::Modified { table, key, old }
                | ObjectChange::Deleted { table, key, old } => {
                    let partition = self.partition(table)?;
                    self.tx.insert(&partition, key, old);
                }
            }
        }
        Ok(())
    }

    pub fn commit(self) -> Result<(), ChainbaseError> {
        if !self.scopes.is_empty() {
            return Err(ChainbaseError::OpenScopes(self.scopes.len()));
        }
        match self.tx.commit() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(ChainbaseError::InternalError(
                "write transaction conflicted".to_owned(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub fn rollback(self) {
        self.tx.rollback();
    }
}
