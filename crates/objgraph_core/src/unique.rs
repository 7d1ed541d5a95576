//! Unique attribute enforcement.
//!
//! Before a save writes anything, every record whose type declares unique
//! attributes is compared with the other persisted instances of that type and
//! with the other records of the same save. Values are compared by their
//! encoded text, so the comparison is exact and case-sensitive.

use crate::codec::EncodedEntity;
use crate::error::{CoreError, CoreResult};
use objgraph_codec::{parse_record, TypeIndex};
use objgraph_storage::RecordBackend;
use parking_lot::{ArcMutexGuard, Mutex, RawMutex};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Per-type locks held across a uniqueness check and the writes it guards.
#[derive(Debug, Default)]
pub struct TypeLocks {
    locks: Mutex<HashMap<TypeIndex, Arc<Mutex<()>>>>,
}

/// Guards returned by [`TypeLocks::acquire`]; dropping them releases the
/// locks.
pub type TypeGuards = Vec<ArcMutexGuard<RawMutex, ()>>;

impl TypeLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks every listed type, in ascending index order.
    pub fn acquire(&self, types: impl IntoIterator<Item = TypeIndex>) -> TypeGuards {
        let ordered: BTreeSet<TypeIndex> = types.into_iter().collect();
        let handles: Vec<_> = {
            let mut locks = self.locks.lock();
            ordered
                .into_iter()
                .map(|index| Arc::clone(locks.entry(index).or_default()))
                .collect()
        };
        handles.iter().map(Mutex::lock_arc).collect()
    }
}

/// Checks unique attributes of pending records against the store.
pub struct UniquenessGuard<'a> {
    backend: &'a dyn RecordBackend,
}

impl<'a> UniquenessGuard<'a> {
    /// Creates a guard over a backend.
    #[must_use]
    pub fn new(backend: &'a dyn RecordBackend) -> Self {
        Self { backend }
    }

    /// Verifies that no pending record repeats a unique value.
    ///
    /// # Errors
    ///
    /// Returns `DuplicatedUniqueField` on the first collision found, or a
    /// storage/codec error if a persisted record cannot be read.
    pub fn check(&self, pending: &[EncodedEntity]) -> CoreResult<()> {
        let mut by_type: BTreeMap<&str, Vec<&EncodedEntity>> = BTreeMap::new();
        for entity in pending.iter().filter(|e| e.schema.has_unique_attributes()) {
            by_type.entry(entity.schema.name()).or_default().push(entity);
        }

        for (type_name, entities) in by_type {
            check_within_save(&entities)?;
            self.check_against_store(type_name, &entities)?;
        }
        Ok(())
    }

    fn check_against_store(&self, type_name: &str, entities: &[&EncodedEntity]) -> CoreResult<()> {
        for id in self.backend.list_ids(type_name)? {
            if entities.iter().all(|e| e.id == id) {
                continue;
            }
            let key = objgraph_storage::RecordKey::new(type_name, id.as_str())?;
            let Some(text) = self.backend.read(&key)? else {
                continue;
            };
            let stored = parse_record(&text)?;
            for entity in entities.iter().filter(|e| e.id != id) {
                for attr in entity.schema.unique_attributes() {
                    let Some(value) = unique_value(entity, attr.name()) else {
                        continue;
                    };
                    if stored.field(attr.name()).map(objgraph_codec::Record::to_text)
                        == Some(value.clone())
                    {
                        return Err(duplicate(entity, attr.name(), value));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Two entities of one save sharing a unique value.
fn check_within_save(entities: &[&EncodedEntity]) -> CoreResult<()> {
    for (i, first) in entities.iter().enumerate() {
        for second in &entities[i + 1..] {
            if first.id == second.id {
                continue;
            }
            for attr in first.schema.unique_attributes() {
                let value = unique_value(first, attr.name());
                if value.is_some() && value == unique_value(second, attr.name()) {
                    return Err(duplicate(second, attr.name(), value.unwrap_or_default()));
                }
            }
        }
    }
    Ok(())
}

/// Encoded text of a unique attribute. Null values are never compared.
fn unique_value(entity: &EncodedEntity, attribute: &str) -> Option<String> {
    entity
        .record
        .field(attribute)
        .filter(|value| !value.is_null())
        .map(objgraph_codec::Record::to_text)
}

fn duplicate(entity: &EncodedEntity, attribute: &str, value: String) -> CoreError {
    tracing::warn!(
        type_name = %entity.schema.name(),
        id = %entity.id,
        attribute,
        "rejected duplicated unique value"
    );
    CoreError::DuplicatedUniqueField {
        type_name: entity.schema.name().to_string(),
        attribute: attribute.to_string(),
        value,
    }
}
