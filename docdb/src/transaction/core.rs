//! Journal entries and their interpreter.
//!
//! Every mutating call on a transactional collection appends one
//! [`JournalEntry`] holding the values needed to replay it. At commit,
//! [`JournalEntry::commit`] replays the entry on the live collection and
//! returns an [`UndoEntry`] with whatever prior state the replay destroyed.
//! [`UndoEntry::rollback`] compensates a replayed entry logically; it does
//! not restore a physical snapshot.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use crate::collection::{DocDbCollection, Document, DocumentId, UpdateOptions};
use crate::common::Attributes;
use crate::docdb::DocDb;
use crate::errors::DocDbResult;
use crate::filter::Filter;
use crate::index::{IndexEntry, IndexOptions};

/// Lifecycle of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionState {
    /// Accepting operations.
    Active,
    /// Commit started and has not finished.
    PartiallyCommitted,
    Committed,
    /// Commit failed; applied entries were compensated.
    Failed,
    /// Rolled back.
    Aborted,
    /// Closed without commit or rollback.
    Closed,
}

impl Display for TransactionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionState::Active => write!(f, "active"),
            TransactionState::PartiallyCommitted => write!(f, "partially committed"),
            TransactionState::Committed => write!(f, "committed"),
            TransactionState::Failed => write!(f, "failed"),
            TransactionState::Aborted => write!(f, "aborted"),
            TransactionState::Closed => write!(f, "closed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChangeType {
    Insert,
    Update,
    Remove,
    CreateIndex,
    RebuildIndex,
    DropIndex,
    DropAllIndexes,
    Clear,
    DropCollection,
    SetAttributes,
}

/// One recorded operation of a transactional collection.
///
/// Entries carry concrete values only, so a journal can be inspected and
/// serialized. Inserted documents already carry the ids they were given
/// inside the transaction, so a replay writes the same ids.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JournalEntry {
    Insert {
        documents: Vec<Document>,
    },
    Update {
        filter: Filter,
        update: Document,
        options: UpdateOptions,
    },
    Remove {
        filter: Filter,
        just_once: bool,
    },
    RemoveDocument {
        document: Document,
    },
    CreateIndex {
        field: String,
        options: IndexOptions,
    },
    RebuildIndex {
        field: String,
        is_async: bool,
    },
    DropIndex {
        field: String,
    },
    DropAllIndexes,
    Clear,
    DropCollection,
    SetAttributes {
        attributes: Attributes,
    },
}

impl JournalEntry {
    pub fn change_type(&self) -> ChangeType {
        match self {
            JournalEntry::Insert { .. } => ChangeType::Insert,
            JournalEntry::Update { .. } => ChangeType::Update,
            JournalEntry::Remove { .. } | JournalEntry::RemoveDocument { .. } => ChangeType::Remove,
            JournalEntry::CreateIndex { .. } => ChangeType::CreateIndex,
            JournalEntry::RebuildIndex { .. } => ChangeType::RebuildIndex,
            JournalEntry::DropIndex { .. } => ChangeType::DropIndex,
            JournalEntry::DropAllIndexes => ChangeType::DropAllIndexes,
            JournalEntry::Clear => ChangeType::Clear,
            JournalEntry::DropCollection => ChangeType::DropCollection,
            JournalEntry::SetAttributes { .. } => ChangeType::SetAttributes,
        }
    }

    /// Replays this entry on `primary` and returns its compensation.
    ///
    /// State needed for the compensation is read from `primary` right before
    /// the replay. Index builds are replayed synchronously so a failing
    /// build fails the commit.
    pub fn commit(&self, primary: &DocDbCollection) -> DocDbResult<UndoEntry> {
        match self {
            JournalEntry::Insert { documents } => {
                let result = primary.insert_many(documents.clone())?;
                Ok(UndoEntry::RemoveInserted {
                    ids: result.affected_document_ids().to_vec(),
                })
            }
            JournalEntry::Update {
                filter,
                update,
                options,
            } => {
                let prior = matching_documents(primary, filter, options.is_just_once())?;
                let result = primary.update_with_options(filter.clone(), update, options)?;

                let prior_ids: HashSet<DocumentId> =
                    prior.iter().filter_map(Document::id_value).collect();
                let inserted_ids = result
                    .affected_document_ids()
                    .iter()
                    .filter(|id| !prior_ids.contains(id))
                    .copied()
                    .collect();
                Ok(UndoEntry::RestoreUpdated {
                    prior,
                    inserted_ids,
                })
            }
            JournalEntry::Remove { filter, just_once } => {
                let prior = matching_documents(primary, filter, *just_once)?;
                let result = primary.remove(filter.clone(), *just_once)?;
                let documents = prior
                    .into_iter()
                    .filter(|document| {
                        document
                            .id_value()
                            .map(|id| result.contains(&id))
                            .unwrap_or(false)
                    })
                    .collect();
                Ok(UndoEntry::Reinsert { documents })
            }
            JournalEntry::RemoveDocument { document } => {
                let prior = match document.id_value() {
                    Some(id) => primary.get_by_id(&id)?,
                    None => None,
                };
                primary.remove_one(document)?;
                Ok(UndoEntry::Reinsert {
                    documents: prior.into_iter().collect(),
                })
            }
            JournalEntry::CreateIndex { field, options } => {
                primary.create_index(field, &options.build_async(false))?;
                Ok(UndoEntry::DropCreatedIndex {
                    field: field.clone(),
                })
            }
            JournalEntry::RebuildIndex { field, .. } => {
                primary.rebuild_index(field, false)?;
                Ok(UndoEntry::RebuildIndex {
                    field: field.clone(),
                })
            }
            JournalEntry::DropIndex { field } => {
                let entries = primary
                    .list_indexes()?
                    .into_iter()
                    .filter(|entry| entry.field() == field)
                    .collect();
                primary.drop_index(field)?;
                Ok(UndoEntry::RecreateIndexes { entries })
            }
            JournalEntry::DropAllIndexes => {
                let entries = primary.list_indexes()?;
                primary.drop_all_indexes()?;
                Ok(UndoEntry::RecreateIndexes { entries })
            }
            JournalEntry::Clear => {
                let documents = primary.find_all()?.to_list()?;
                primary.clear()?;
                Ok(UndoEntry::Reinsert { documents })
            }
            JournalEntry::DropCollection => {
                let documents = primary.find_all()?.to_list()?;
                let indexes = primary.list_indexes()?;
                primary.dispose()?;
                Ok(UndoEntry::RecreateCollection { documents, indexes })
            }
            JournalEntry::SetAttributes { attributes } => {
                let prior = primary.attributes()?;
                primary.set_attributes(attributes.clone())?;
                Ok(UndoEntry::RestoreAttributes { prior })
            }
        }
    }
}

impl Display for JournalEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            JournalEntry::Insert { documents } => write!(f, "insert {} documents", documents.len()),
            JournalEntry::Update { filter, .. } => write!(f, "update {}", filter),
            JournalEntry::Remove { filter, .. } => write!(f, "remove {}", filter),
            JournalEntry::RemoveDocument { document } => match document.id_value() {
                Some(id) => write!(f, "remove document {}", id),
                None => write!(f, "remove document"),
            },
            JournalEntry::CreateIndex { field, options } => {
                write!(f, "create {} index on {}", options.index_type(), field)
            }
            JournalEntry::RebuildIndex { field, .. } => write!(f, "rebuild index on {}", field),
            JournalEntry::DropIndex { field } => write!(f, "drop index on {}", field),
            JournalEntry::DropAllIndexes => write!(f, "drop all indexes"),
            JournalEntry::Clear => write!(f, "clear"),
            JournalEntry::DropCollection => write!(f, "drop collection"),
            JournalEntry::SetAttributes { .. } => write!(f, "set attributes"),
        }
    }
}

/// Compensation for one replayed [`JournalEntry`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UndoEntry {
    RemoveInserted {
        ids: Vec<DocumentId>,
    },
    /// Puts back the documents an update overwrote and removes the ones
    /// it upserted.
    RestoreUpdated {
        prior: Vec<Document>,
        inserted_ids: Vec<DocumentId>,
    },
    /// Writes the captured documents back, replacing any current version.
    Reinsert {
        documents: Vec<Document>,
    },
    DropCreatedIndex {
        field: String,
    },
    RebuildIndex {
        field: String,
    },
    RecreateIndexes {
        entries: Vec<IndexEntry>,
    },
    RecreateCollection {
        documents: Vec<Document>,
        indexes: Vec<IndexEntry>,
    },
    RestoreAttributes {
        prior: Attributes,
    },
    Nothing,
}

impl UndoEntry {
    /// Applies this compensation to the live collection `collection_name`.
    ///
    /// The collection is resolved through `db` each time, so a collection
    /// dropped by the replay is recreated here.
    pub fn rollback(&self, collection_name: &str, db: &DocDb) -> DocDbResult<()> {
        if let UndoEntry::Nothing = self {
            return Ok(());
        }

        let primary = db.collection(collection_name)?;
        match self {
            UndoEntry::RemoveInserted { ids } => remove_by_ids(&primary, ids),
            UndoEntry::RestoreUpdated {
                prior,
                inserted_ids,
            } => {
                remove_by_ids(&primary, inserted_ids)?;
                restore_documents(&primary, prior)
            }
            UndoEntry::Reinsert { documents } => restore_documents(&primary, documents),
            UndoEntry::DropCreatedIndex { field } => {
                if primary.has_index(field)? {
                    primary.drop_index(field)?;
                }
                Ok(())
            }
            UndoEntry::RebuildIndex { field } => {
                if primary.has_index(field)? && !primary.is_indexing(field)? {
                    primary.rebuild_index(field, false)?;
                }
                Ok(())
            }
            UndoEntry::RecreateIndexes { entries } => recreate_indexes(&primary, entries),
            UndoEntry::RecreateCollection { documents, indexes } => {
                recreate_indexes(&primary, indexes)?;
                restore_documents(&primary, documents)
            }
            UndoEntry::RestoreAttributes { prior } => primary.set_attributes(prior.clone()),
            UndoEntry::Nothing => Ok(()),
        }
    }
}

fn matching_documents(
    primary: &DocDbCollection,
    filter: &Filter,
    just_once: bool,
) -> DocDbResult<Vec<Document>> {
    let cursor = primary.find(filter.clone())?;
    if just_once {
        return Ok(cursor.first()?.into_iter().collect());
    }
    cursor.to_list()
}

fn remove_by_ids(primary: &DocDbCollection, ids: &[DocumentId]) -> DocDbResult<()> {
    for id in ids {
        if let Some(document) = primary.get_by_id(id)? {
            primary.remove_one(&document)?;
        }
    }
    Ok(())
}

fn restore_documents(primary: &DocDbCollection, documents: &[Document]) -> DocDbResult<()> {
    if documents.is_empty() {
        return Ok(());
    }
    for document in documents {
        if let Some(id) = document.id_value() {
            if let Some(current) = primary.get_by_id(&id)? {
                primary.remove_one(&current)?;
            }
        }
    }
    primary.insert_many(documents.to_vec())?;
    Ok(())
}

fn recreate_indexes(primary: &DocDbCollection, entries: &[IndexEntry]) -> DocDbResult<()> {
    for entry in entries {
        if !primary.has_index(entry.field())? {
            primary.create_index(entry.field(), &IndexOptions::new(entry.index_type()))?;
        }
    }
    Ok(())
}
