//! High-level services for members, plogging sessions, and trash cans.

use std::cmp::Reverse;
use std::sync::Arc;

use tracing::info;

use crate::location::LocationResolver;
use crate::model::{
    Coordinate, ElapsedTime, ExternalId, Member, MemberProfile, NewMember, NewPlogging, Pet,
    PloggingId, RegisterForm, SessionForm, SessionOverview, SessionSummary, TrashCategory,
    Trashcan, TrashcanForm, TrashcanId,
};
use crate::ports::{
    LocationRepository, MemberRepository, PloggingRepository, PortError, Store, Transaction,
    TrashCategoryRepository, TrashcanRepository,
};

async fn require_member(
    tx: &mut dyn Transaction,
    external_id: &ExternalId,
) -> Result<Member, PortError> {
    tx.find_member(external_id)
        .await?
        .ok_or_else(|| PortError::NotFound(format!("member {external_id}")))
}

/// Registration and profile lookup.
pub struct MemberService {
    store: Arc<dyn Store>,
}

impl MemberService {
    /// Create a new service bound to the provided store.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Register a member with a freshly hatched pet.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Validation`] for a blank pet name and
    /// [`PortError::Conflict`] when the identity is already registered.
    pub async fn register(
        &self,
        external_id: ExternalId,
        form: RegisterForm,
    ) -> Result<MemberProfile, PortError> {
        let pet_name = form.pet_name.trim();
        if pet_name.is_empty() {
            return Err(PortError::Validation("pet name must not be blank".to_owned()));
        }

        let mut tx = self.store.begin().await?;
        let member = tx
            .insert_member(NewMember {
                external_id,
                pet: Pet::new(pet_name, form.pet_kind),
            })
            .await?;
        tx.commit().await?;

        info!(member = %member.external_id, pet = %member.pet.name, "Registered member");
        Ok(MemberProfile::from(&member))
    }

    /// Lifetime totals and pet of a member.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::NotFound`] when the member is unknown.
    pub async fn profile(&self, external_id: &ExternalId) -> Result<MemberProfile, PortError> {
        let mut tx = self.store.begin().await?;
        let member = require_member(&mut *tx, external_id).await?;
        Ok(MemberProfile::from(&member))
    }
}

/// Records plogging sessions and serves them back.
pub struct PloggingService {
    store: Arc<dyn Store>,
    resolver: LocationResolver,
}

impl PloggingService {
    /// Create a new service bound to the provided store and resolver.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, resolver: LocationResolver) -> Self {
        Self { store, resolver }
    }

    /// Record a finished session and update the owner's totals and pet.
    ///
    /// Both coordinates are geocoded before the transaction opens. All writes
    /// happen in one transaction, so a failure leaves no partial records and
    /// no member mutation behind.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Validation`] for an invalid form,
    /// [`PortError::NotFound`] when the owner is unknown, and geocoder or store
    /// errors unchanged.
    pub async fn create_session(
        &self,
        form: SessionForm,
        owner: &ExternalId,
    ) -> Result<PloggingId, PortError> {
        form.validate()?;

        {
            let mut tx = self.store.begin().await?;
            require_member(&mut *tx, owner).await?;
        }

        let started = self.resolver.resolve(form.start()).await?;
        let ended = self.resolver.resolve(form.end()).await?;

        let mut tx = self.store.begin().await?;
        let mut member = require_member(&mut *tx, owner).await?;

        let started_location = tx.insert_location(started).await?;
        let ended_location = tx.insert_location(ended).await?;

        let trash = TrashCategory::from(form.trash);
        let quantity = trash.total();
        let trash_category = tx.insert_trash_category(trash).await?;

        let plogging = tx
            .insert_plogging(NewPlogging {
                member_id: member.id,
                distance: form.distance,
                quantity,
                started_location: started_location.id,
                ended_location: ended_location.id,
                started_at: form.started_at,
                ended_at: form.ended_at,
                trash_category,
            })
            .await?;

        member.add_total_distance(plogging.distance)?;
        member.add_total_quantity(plogging.quantity);
        member.pet.level_up(member.total_distance);
        tx.save_member(&member).await?;

        tx.commit().await?;

        info!(
            member = %owner,
            plogging = %plogging.id,
            distance = plogging.distance,
            quantity = plogging.quantity,
            pet_level = member.pet.level,
            "Recorded plogging session"
        );
        Ok(plogging.id)
    }

    /// Detail view of one session, visible only to its owner.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::NotFound`] when the session or one of its parts is
    /// missing and [`PortError::Forbidden`] when the viewer is not the owner.
    pub async fn get_session(
        &self,
        viewer: &ExternalId,
        id: PloggingId,
    ) -> Result<SessionSummary, PortError> {
        let mut tx = self.store.begin().await?;

        let plogging = tx
            .find_plogging(id)
            .await?
            .ok_or_else(|| PortError::NotFound(format!("plogging {id}")))?;

        let owner = tx.find_member_by_id(plogging.member_id).await?;
        if owner.is_none_or(|member| &member.external_id != viewer) {
            return Err(PortError::Forbidden);
        }

        let started = tx
            .find_location(plogging.started_location)
            .await?
            .ok_or_else(|| PortError::NotFound(format!("start location of plogging {id}")))?;
        let ended = tx
            .find_location(plogging.ended_location)
            .await?
            .ok_or_else(|| PortError::NotFound(format!("end location of plogging {id}")))?;
        let trash = tx
            .find_trash_category(plogging.trash_category)
            .await?
            .ok_or_else(|| PortError::NotFound(format!("trash of plogging {id}")))?;

        let elapsed = ElapsedTime::between(plogging.started_at, plogging.ended_at);

        Ok(SessionSummary {
            plogging_id: plogging.id,
            distance: plogging.distance,
            total_hour: elapsed.hours,
            total_minute: elapsed.minutes,
            total_second: elapsed.seconds,
            started_where: started.address,
            ended_where: ended.address,
            trash: trash.into(),
        })
    }

    /// The viewer's sessions, most recent start first.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::NotFound`] when the viewer is not a member.
    pub async fn list_sessions(
        &self,
        viewer: &ExternalId,
    ) -> Result<Vec<SessionOverview>, PortError> {
        let mut tx = self.store.begin().await?;
        let member = require_member(&mut *tx, viewer).await?;

        let mut sessions: Vec<SessionOverview> = tx
            .list_ploggings(member.id)
            .await?
            .iter()
            .map(SessionOverview::from)
            .collect();
        sessions.sort_by_key(|session| (Reverse(session.started_at), Reverse(session.plogging_id)));
        Ok(sessions)
    }
}

/// Public trash can registry.
pub struct TrashcanService {
    store: Arc<dyn Store>,
}

impl TrashcanService {
    /// Create a new service bound to the provided store.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Every registered trash can.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the store fails.
    pub async fn list(&self) -> Result<Vec<Trashcan>, PortError> {
        let mut tx = self.store.begin().await?;
        tx.list_trashcans().await
    }

    /// Register a trash can.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Validation`] for invalid coordinates.
    pub async fn create(&self, form: TrashcanForm) -> Result<Trashcan, PortError> {
        Coordinate::new(form.latitude, form.longitude).validate()?;

        let mut tx = self.store.begin().await?;
        let trashcan = tx.insert_trashcan(form).await?;
        tx.commit().await?;

        info!(trashcan = %trashcan.id, address = %trashcan.address, "Registered trashcan");
        Ok(trashcan)
    }

    /// Remove a trash can.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::NotFound`] when no trash can has this id.
    pub async fn delete(&self, id: TrashcanId) -> Result<(), PortError> {
        let mut tx = self.store.begin().await?;
        if !tx.delete_trashcan(id).await? {
            return Err(PortError::NotFound(format!("trashcan {id}")));
        }
        tx.commit().await?;

        info!(trashcan = %id, "Deleted trashcan");
        Ok(())
    }
}
