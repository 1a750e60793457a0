//! Store that keeps every table in process memory.
//!
//! Transactions take one lock over all tables. Reads go straight to the
//! locked tables; the first write takes a private copy, which replaces the
//! shared tables on commit. Concurrent writers are therefore serialized and a
//! dropped transaction leaves no trace.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::model::{
    ExternalId, Location, LocationId, Member, MemberId, NewLocation, NewMember, NewPlogging,
    Plogging, PloggingId, TrashCategory, TrashCategoryId, Trashcan, TrashcanForm, TrashcanId,
};
use crate::ports::{
    LocationRepository, MemberRepository, PloggingRepository, PortError, Store, Transaction,
    TrashCategoryRepository, TrashcanRepository,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    next_id: u64,
    members: BTreeMap<MemberId, Member>,
    locations: BTreeMap<LocationId, Location>,
    trash_categories: BTreeMap<TrashCategoryId, TrashCategory>,
    ploggings: BTreeMap<PloggingId, Plogging>,
    trashcans: BTreeMap<TrashcanId, Trashcan>,
}

impl Tables {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory [`Store`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, PortError> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        Ok(Box::new(MemoryTransaction {
            guard,
            working: None,
        }))
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    /// Private copy, taken on the first write.
    working: Option<Tables>,
}

impl MemoryTransaction {
    fn read(&self) -> &Tables {
        self.working.as_ref().unwrap_or(&*self.guard)
    }

    fn write(&mut self) -> &mut Tables {
        let Self { guard, working } = self;
        working.get_or_insert_with(|| (**guard).clone())
    }
}

#[async_trait]
impl MemberRepository for MemoryTransaction {
    async fn find_member(&mut self, external_id: &ExternalId) -> Result<Option<Member>, PortError> {
        Ok(self
            .read()
            .members
            .values()
            .find(|member| &member.external_id == external_id)
            .cloned())
    }

    async fn find_member_by_id(&mut self, id: MemberId) -> Result<Option<Member>, PortError> {
        Ok(self.read().members.get(&id).cloned())
    }

    async fn insert_member(&mut self, member: NewMember) -> Result<Member, PortError> {
        if self
            .read()
            .members
            .values()
            .any(|existing| existing.external_id == member.external_id)
        {
            return Err(PortError::Conflict(format!(
                "member {} already registered",
                member.external_id
            )));
        }
        let id = MemberId(self.write().allocate_id());
        let stored = Member {
            id,
            external_id: member.external_id,
            total_distance: 0.0,
            total_quantity: 0,
            pet: member.pet,
        };
        self.write().members.insert(id, stored.clone());
        Ok(stored)
    }

    async fn save_member(&mut self, member: &Member) -> Result<(), PortError> {
        let slot = self
            .write()
            .members
            .get_mut(&member.id)
            .ok_or_else(|| PortError::NotFound(format!("member {}", member.external_id)))?;
        *slot = member.clone();
        Ok(())
    }
}

#[async_trait]
impl LocationRepository for MemoryTransaction {
    async fn insert_location(&mut self, location: NewLocation) -> Result<Location, PortError> {
        let id = LocationId(self.write().allocate_id());
        let stored = Location {
            id,
            latitude: location.coordinate.latitude,
            longitude: location.coordinate.longitude,
            address: location.address,
        };
        self.write().locations.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_location(&mut self, id: LocationId) -> Result<Option<Location>, PortError> {
        Ok(self.read().locations.get(&id).cloned())
    }
}

#[async_trait]
impl TrashCategoryRepository for MemoryTransaction {
    async fn insert_trash_category(
        &mut self,
        category: TrashCategory,
    ) -> Result<TrashCategoryId, PortError> {
        let id = TrashCategoryId(self.write().allocate_id());
        self.write().trash_categories.insert(id, category);
        Ok(id)
    }

    async fn find_trash_category(
        &mut self,
        id: TrashCategoryId,
    ) -> Result<Option<TrashCategory>, PortError> {
        Ok(self.read().trash_categories.get(&id).copied())
    }
}

#[async_trait]
impl PloggingRepository for MemoryTransaction {
    async fn insert_plogging(&mut self, plogging: NewPlogging) -> Result<Plogging, PortError> {
        let id = PloggingId(self.write().allocate_id());
        let stored = Plogging {
            id,
            member_id: plogging.member_id,
            distance: plogging.distance,
            quantity: plogging.quantity,
            started_location: plogging.started_location,
            ended_location: plogging.ended_location,
            started_at: plogging.started_at,
            ended_at: plogging.ended_at,
            trash_category: plogging.trash_category,
        };
        self.write().ploggings.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_plogging(&mut self, id: PloggingId) -> Result<Option<Plogging>, PortError> {
        Ok(self.read().ploggings.get(&id).cloned())
    }

    async fn list_ploggings(&mut self, member_id: MemberId) -> Result<Vec<Plogging>, PortError> {
        Ok(self
            .read()
            .ploggings
            .values()
            .filter(|plogging| plogging.member_id == member_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TrashcanRepository for MemoryTransaction {
    async fn list_trashcans(&mut self) -> Result<Vec<Trashcan>, PortError> {
        Ok(self.read().trashcans.values().cloned().collect())
    }

    async fn insert_trashcan(&mut self, form: TrashcanForm) -> Result<Trashcan, PortError> {
        let id = TrashcanId(self.write().allocate_id());
        let stored = Trashcan {
            id,
            latitude: form.latitude,
            longitude: form.longitude,
            address: form.address,
        };
        self.write().trashcans.insert(id, stored.clone());
        Ok(stored)
    }

    async fn delete_trashcan(&mut self, id: TrashcanId) -> Result<bool, PortError> {
        Ok(self.write().trashcans.remove(&id).is_some())
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        let MemoryTransaction { mut guard, working } = *self;
        if let Some(working) = working {
            *guard = working;
        }
        Ok(())
    }
}
