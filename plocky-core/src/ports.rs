//! Traits describing storage and geocoding capabilities, plus the shared error type.

use async_trait::async_trait;
use reqwest::Error as ReqwestError;
use serde::{Deserialize, Serialize};

use crate::model::{
    Coordinate, ExternalId, Location, LocationId, Member, MemberId, NewLocation, NewMember,
    NewPlogging, Plogging, PloggingId, TrashCategory, TrashCategoryId, Trashcan, TrashcanForm,
    TrashcanId,
};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur in services, stores, and the geocoder.
pub enum PortError {
    /// Requested record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
    /// The acting member may not see the record.
    #[error("Forbidden")]
    Forbidden,
    /// The record already exists.
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Caller supplied an unusable value.
    #[error("Invalid input: {0}")]
    Validation(String),
    /// Network layer failed while talking to the geocoder.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// Geocoder answered with something we could not read.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    /// Storage or other internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Road-name address components of a geocoding candidate.
///
/// Absent components are empty strings.
pub struct RoadAddress {
    /// Province or metropolitan city.
    pub region_1: String,
    /// City, county, or district.
    pub region_2: String,
    /// Neighbourhood.
    pub region_3: String,
    /// Road name.
    pub road_name: String,
    /// Main building number.
    pub main_building_no: String,
    /// Sub building number.
    pub sub_building_no: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Single candidate returned by a reverse geocoding lookup.
pub struct GeocodeDocument {
    /// Road-name address, when the point has one.
    pub road_address: Option<RoadAddress>,
}

#[async_trait]
/// Trait for reverse geocoding backends.
pub trait Geocoder: Send + Sync {
    /// Look up address candidates for a coordinate, best match first.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Network`] when the backend is unreachable or rejects the
    /// request, and [`PortError::MalformedResponse`] when the body cannot be decoded.
    async fn reverse(&self, coordinate: Coordinate) -> Result<Vec<GeocodeDocument>, PortError>;
}

#[async_trait]
/// Member persistence.
pub trait MemberRepository: Send {
    /// Find a member by external identity.
    ///
    /// Inside a transaction the row stays locked until commit or rollback.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the store fails.
    async fn find_member(&mut self, external_id: &ExternalId) -> Result<Option<Member>, PortError>;

    /// Find a member by storage id.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the store fails.
    async fn find_member_by_id(&mut self, id: MemberId) -> Result<Option<Member>, PortError>;

    /// Store a new member and return it with its id.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Conflict`] when the external identity is taken.
    async fn insert_member(&mut self, member: NewMember) -> Result<Member, PortError>;

    /// Overwrite an existing member.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::NotFound`] when the member does not exist.
    async fn save_member(&mut self, member: &Member) -> Result<(), PortError>;
}

#[async_trait]
/// Location persistence.
pub trait LocationRepository: Send {
    /// Store a new location. Equal coordinates still produce a new record.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the store fails.
    async fn insert_location(&mut self, location: NewLocation) -> Result<Location, PortError>;

    /// Find a location by id.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the store fails.
    async fn find_location(&mut self, id: LocationId) -> Result<Option<Location>, PortError>;
}

#[async_trait]
/// Trash breakdown persistence.
pub trait TrashCategoryRepository: Send {
    /// Store a breakdown and return its id.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the store fails.
    async fn insert_trash_category(
        &mut self,
        category: TrashCategory,
    ) -> Result<TrashCategoryId, PortError>;

    /// Find a breakdown by id.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the store fails.
    async fn find_trash_category(
        &mut self,
        id: TrashCategoryId,
    ) -> Result<Option<TrashCategory>, PortError>;
}

#[async_trait]
/// Plogging session persistence.
pub trait PloggingRepository: Send {
    /// Store a new session.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the store fails.
    async fn insert_plogging(&mut self, plogging: NewPlogging) -> Result<Plogging, PortError>;

    /// Find a session by id.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the store fails.
    async fn find_plogging(&mut self, id: PloggingId) -> Result<Option<Plogging>, PortError>;

    /// All sessions of one member, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the store fails.
    async fn list_ploggings(&mut self, member_id: MemberId) -> Result<Vec<Plogging>, PortError>;
}

#[async_trait]
/// Trash can persistence.
pub trait TrashcanRepository: Send {
    /// All registered trash cans, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the store fails.
    async fn list_trashcans(&mut self) -> Result<Vec<Trashcan>, PortError>;

    /// Store a new trash can.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the store fails.
    async fn insert_trashcan(&mut self, form: TrashcanForm) -> Result<Trashcan, PortError>;

    /// Remove a trash can, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the store fails.
    async fn delete_trashcan(&mut self, id: TrashcanId) -> Result<bool, PortError>;
}

#[async_trait]
/// Atomic unit of work spanning every repository.
///
/// Dropping a transaction without calling [`Transaction::commit`] discards its writes.
pub trait Transaction:
    MemberRepository
    + LocationRepository
    + TrashCategoryRepository
    + PloggingRepository
    + TrashcanRepository
    + Send
{
    /// Make all writes of this transaction visible.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the store cannot persist the writes.
    async fn commit(self: Box<Self>) -> Result<(), PortError>;
}

#[async_trait]
/// Entry point to a persistent store.
pub trait Store: Send + Sync {
    /// Open a transaction.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the store is unavailable.
    async fn begin(&self) -> Result<Box<dyn Transaction>, PortError>;
}
