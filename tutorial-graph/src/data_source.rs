//! In-memory, read-only entity collections.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

pub use crate::error::DataSourceError;
use crate::resolver::Record;
use crate::resolver::Resolved;

type IdAccessor = dyn Fn(&(dyn Any + Send + Sync)) -> Option<i64> + Send + Sync;

struct Collection {
    entity_type: &'static str,
    records: Vec<Record>,
    id_of: Arc<IdAccessor>,
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("entity_type", &self.entity_type)
            .field("len", &self.records.len())
            .finish()
    }
}

/// Named collections of records, keyed by an integer id.
///
/// A data source is frozen once built: resolvers share it through an `Arc` and only read from
/// it.
#[derive(Debug, Default)]
pub struct DataSource {
    collections: IndexMap<String, Collection>,
}

impl DataSource {
    pub fn builder() -> DataSourceBuilder {
        DataSourceBuilder::default()
    }

    /// Returns the first record of `collection` whose id is `id`.
    pub fn find_by_id(&self, collection: &str, id: i64) -> Result<Resolved, DataSourceError> {
        let entries = self.collection(collection)?;
        entries
            .records
            .iter()
            .find(|record| (entries.id_of)(record.as_ref()) == Some(id))
            .map(|record| Resolved::Record(Arc::clone(record)))
            .ok_or_else(|| DataSourceError::NotFound {
                collection: collection.to_string(),
                id,
            })
    }

    /// Returns every record of `collection`, in insertion order.
    pub fn list_all(&self, collection: &str) -> Result<Resolved, DataSourceError> {
        Ok(Resolved::List(
            self.collection(collection)?
                .records
                .iter()
                .map(|record| Resolved::Record(Arc::clone(record)))
                .collect(),
        ))
    }

    /// The number of records in `collection`.
    pub fn len(&self, collection: &str) -> Result<usize, DataSourceError> {
        Ok(self.collection(collection)?.records.len())
    }

    /// The registered collection names, in registration order.
    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    fn collection(&self, name: &str) -> Result<&Collection, DataSourceError> {
        self.collections
            .get(name)
            .ok_or_else(|| DataSourceError::UnknownCollection(name.to_string()))
    }
}

/// Builder for [`DataSource`].
#[derive(Default)]
pub struct DataSourceBuilder {
    collections: IndexMap<String, Collection>,
    duplicates: Vec<String>,
}

impl DataSourceBuilder {
    /// Registers a collection of `T` records with the accessor returning their id.
    pub fn collection<T, I, F>(mut self, name: impl Into<String>, records: I, id: F) -> Self
    where
        T: Any + Send + Sync,
        I: IntoIterator<Item = T>,
        F: Fn(&T) -> i64 + Send + Sync + 'static,
    {
        let name = name.into();
        if self.collections.contains_key(&name) {
            self.duplicates.push(name);
            return self;
        }
        let collection = Collection {
            entity_type: std::any::type_name::<T>(),
            records: records
                .into_iter()
                .map(|record| Arc::new(record) as Record)
                .collect(),
            id_of: Arc::new(move |record: &(dyn Any + Send + Sync)| {
                record.downcast_ref::<T>().map(&id)
            }),
        };
        self.collections.insert(name, collection);
        self
    }

    pub fn build(self) -> Result<DataSource, DataSourceError> {
        if let Some(name) = self.duplicates.into_iter().next() {
            return Err(DataSourceError::DuplicateCollection(name));
        }
        tracing::debug!(
            collections = ?self.collections.keys().collect::<Vec<_>>(),
            "data source ready"
        );
        Ok(DataSource {
            collections: self.collections,
        })
    }
}
