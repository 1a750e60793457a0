//! Domain data structures for members, pets, plogging sessions, and trash cans.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::ports::PortError;

/// Cumulative distances (km) a member has to exceed to reach each pet level.
pub const LEVEL_THRESHOLDS: [f64; 5] = [1.0, 5.0, 10.0, 30.0, 50.0];

/// Longest distance (km) accepted for a single session.
pub const MAX_SESSION_DISTANCE: f64 = 1_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
/// Identifier for a stored member.
pub struct MemberId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Opaque identity handed over by the authentication collaborator.
pub struct ExternalId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
/// Identifier for a stored location.
pub struct LocationId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
/// Identifier for a stored trash breakdown.
pub struct TrashCategoryId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
/// Identifier for a recorded plogging session.
pub struct PloggingId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
/// Identifier for a public trash can.
pub struct TrashcanId(pub u64);

impl fmt::Display for ExternalId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl fmt::Display for PloggingId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl fmt::Display for TrashcanId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
/// Species a member can pick for their pet.
pub enum PetKind {
    /// Puppy.
    Dog,
    /// Kitten.
    Cat,
    /// Bunny.
    Rabbit,
    /// Hatchling.
    Chick,
}

/// Number of thresholds in [`LEVEL_THRESHOLDS`] strictly exceeded by `total_distance`.
#[must_use]
pub fn level_for(total_distance: f64) -> u8 {
    let mut level = 0;
    for threshold in LEVEL_THRESHOLDS {
        if total_distance > threshold {
            level += 1;
        }
    }
    level
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Gamification companion owned by exactly one member.
pub struct Pet {
    /// Name chosen by the owner.
    pub name: String,
    /// Species.
    pub kind: PetKind,
    /// Level derived from the owner's cumulative distance.
    pub level: u8,
}

impl Pet {
    /// Hatch a level-0 pet.
    #[must_use]
    pub fn new<S: Into<String>>(name: S, kind: PetKind) -> Self {
        Self {
            name: name.into(),
            kind,
            level: 0,
        }
    }

    /// Recompute the level from the owner's current total distance.
    ///
    /// Mutating the owner does not call this; whoever adds distance must.
    pub fn level_up(&mut self, total_distance: f64) {
        self.level = level_for(total_distance);
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Registered plogger with lifetime totals.
pub struct Member {
    /// Storage identifier.
    pub id: MemberId,
    /// Identity from the authentication collaborator.
    pub external_id: ExternalId,
    /// Sum of all session distances.
    pub total_distance: f64,
    /// Sum of all collected trash pieces.
    pub total_quantity: u64,
    /// The member's pet.
    pub pet: Pet,
}

impl Member {
    /// Add a session's distance to the lifetime total.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Validation`] and leaves the total unchanged when the
    /// sum is not a finite number.
    pub fn add_total_distance(&mut self, distance: f64) -> Result<(), PortError> {
        let total = self.total_distance + distance;
        if !total.is_finite() {
            return Err(PortError::Validation(format!(
                "total distance of member {} would overflow",
                self.external_id
            )));
        }
        self.total_distance = total;
        Ok(())
    }

    /// Add a session's trash count to the lifetime total.
    pub fn add_total_quantity(&mut self, quantity: u64) {
        self.total_quantity = self.total_quantity.saturating_add(quantity);
    }
}

#[derive(Debug, Clone)]
/// Member fields supplied on registration, before an id is assigned.
pub struct NewMember {
    /// Identity from the authentication collaborator.
    pub external_id: ExternalId,
    /// Initial pet.
    pub pet: Pet,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Latitude/longitude pair in decimal degrees.
pub struct Coordinate {
    /// Latitude, -90..=90.
    pub latitude: f64,
    /// Longitude, -180..=180.
    pub longitude: f64,
}

impl Coordinate {
    /// Construct a coordinate without validating it.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Reject non-finite or out-of-range coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Validation`] naming the offending axis.
    pub fn validate(&self) -> Result<(), PortError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(PortError::Validation(format!(
                "latitude out of range: {}",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(PortError::Validation(format!(
                "longitude out of range: {}",
                self.longitude
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A resolved point stored for one end of a session.
pub struct Location {
    /// Storage identifier.
    pub id: LocationId,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Human-readable address from the geocoder.
    pub address: String,
}

#[derive(Debug, Clone, PartialEq)]
/// Location fields before an id is assigned.
pub struct NewLocation {
    /// Where the point is.
    pub coordinate: Coordinate,
    /// Resolved address.
    pub address: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Per-material counts as submitted by a client.
pub struct TrashTally {
    /// Paper and cardboard.
    #[serde(rename = "paperQuantity", default)]
    pub paper: u32,
    /// Plastics.
    #[serde(rename = "plaQuantity", default)]
    pub plastic: u32,
    /// Glass bottles and shards.
    #[serde(rename = "glassQuantity", default)]
    pub glass: u32,
    /// Metal cans.
    #[serde(rename = "canQuantity", default)]
    pub can: u32,
    /// Styrofoam.
    #[serde(rename = "foamQuantity", default)]
    pub foam: u32,
    /// Anything else.
    #[serde(rename = "etcQuantity", default)]
    pub etc: u32,
    /// Cigarette butts.
    #[serde(rename = "cigarQuantity", default)]
    pub cigarette: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Trash breakdown owned by one plogging session.
pub struct TrashCategory {
    /// Paper and cardboard.
    pub paper: u32,
    /// Plastics.
    pub plastic: u32,
    /// Glass bottles and shards.
    pub glass: u32,
    /// Metal cans.
    pub can: u32,
    /// Styrofoam.
    pub foam: u32,
    /// Anything else.
    pub etc: u32,
    /// Cigarette butts.
    pub cigarette: u32,
}

impl TrashCategory {
    /// Sum of all seven counts.
    #[must_use]
    pub fn total(&self) -> u64 {
        [
            self.paper,
            self.plastic,
            self.glass,
            self.can,
            self.foam,
            self.etc,
            self.cigarette,
        ]
        .into_iter()
        .map(u64::from)
        .sum()
    }
}

impl From<TrashTally> for TrashCategory {
    fn from(tally: TrashTally) -> Self {
        Self {
            paper: tally.paper,
            plastic: tally.plastic,
            glass: tally.glass,
            can: tally.can,
            foam: tally.foam,
            etc: tally.etc,
            cigarette: tally.cigarette,
        }
    }
}

impl From<TrashCategory> for TrashTally {
    fn from(category: TrashCategory) -> Self {
        Self {
            paper: category.paper,
            plastic: category.plastic,
            glass: category.glass,
            can: category.can,
            foam: category.foam,
            etc: category.etc,
            cigarette: category.cigarette,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// One completed outing.
pub struct Plogging {
    /// Storage identifier.
    pub id: PloggingId,
    /// Owner of the session.
    pub member_id: MemberId,
    /// Distance covered.
    pub distance: f64,
    /// Total pieces of trash, equal to the trash category's total.
    pub quantity: u64,
    /// Where the outing began.
    pub started_location: LocationId,
    /// Where the outing ended.
    pub ended_location: LocationId,
    /// Start time.
    pub started_at: NaiveDateTime,
    /// End time.
    pub ended_at: NaiveDateTime,
    /// Breakdown of the collected trash.
    pub trash_category: TrashCategoryId,
}

#[derive(Debug, Clone, PartialEq)]
/// Plogging fields before an id is assigned.
pub struct NewPlogging {
    /// Owner of the session.
    pub member_id: MemberId,
    /// Distance covered.
    pub distance: f64,
    /// Total pieces of trash.
    pub quantity: u64,
    /// Where the outing began.
    pub started_location: LocationId,
    /// Where the outing ended.
    pub ended_location: LocationId,
    /// Start time.
    pub started_at: NaiveDateTime,
    /// End time.
    pub ended_at: NaiveDateTime,
    /// Breakdown of the collected trash.
    pub trash_category: TrashCategoryId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Public waste bin.
pub struct Trashcan {
    /// Storage identifier.
    #[serde(rename = "trashcanId")]
    pub id: TrashcanId,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Street address or landmark description.
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Request to register a new trash can.
pub struct TrashcanForm {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Street address or landmark description.
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Finished session as submitted by a client.
pub struct SessionForm {
    /// Distance covered.
    pub distance: f64,
    /// Start latitude.
    pub started_latitude: f64,
    /// Start longitude.
    pub started_longitude: f64,
    /// End latitude.
    pub ended_latitude: f64,
    /// End longitude.
    pub ended_longitude: f64,
    /// Start time.
    pub started_at: NaiveDateTime,
    /// End time.
    pub ended_at: NaiveDateTime,
    /// Collected trash.
    pub trash: TrashTally,
}

impl SessionForm {
    /// Where the session began.
    #[must_use]
    pub fn start(&self) -> Coordinate {
        Coordinate::new(self.started_latitude, self.started_longitude)
    }

    /// Where the session ended.
    #[must_use]
    pub fn end(&self) -> Coordinate {
        Coordinate::new(self.ended_latitude, self.ended_longitude)
    }

    /// Reject forms that would corrupt member totals or produce negative durations.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Validation`] for a distance outside
    /// `0..=MAX_SESSION_DISTANCE`, an invalid coordinate, or an end time before
    /// the start time.
    pub fn validate(&self) -> Result<(), PortError> {
        if !(0.0..=MAX_SESSION_DISTANCE).contains(&self.distance) {
            return Err(PortError::Validation(format!(
                "distance must be between 0 and {MAX_SESSION_DISTANCE} km: {}",
                self.distance
            )));
        }
        self.start().validate()?;
        self.end().validate()?;
        if self.ended_at < self.started_at {
            return Err(PortError::Validation(
                "session ends before it starts".to_owned(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Wall-clock duration split into display components.
pub struct ElapsedTime {
    /// Whole hours.
    pub hours: u64,
    /// Minutes past the hour.
    pub minutes: u8,
    /// Seconds past the minute.
    pub seconds: u8,
}

impl ElapsedTime {
    /// Decompose the time between two instants, truncated to whole seconds.
    ///
    /// An end before the start yields zero.
    #[must_use]
    pub fn between(started_at: NaiveDateTime, ended_at: NaiveDateTime) -> Self {
        let total = u64::try_from((ended_at - started_at).num_seconds()).unwrap_or(0);
        Self::from_seconds(total)
    }

    /// Decompose a number of seconds.
    #[must_use]
    pub fn from_seconds(total: u64) -> Self {
        // Both remainders are below 60.
        let minutes = u8::try_from((total % 3600) / 60).unwrap_or_default();
        let seconds = u8::try_from(total % 60).unwrap_or_default();
        Self {
            hours: total / 3600,
            minutes,
            seconds,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Detail view of one recorded session.
pub struct SessionSummary {
    /// Session identifier.
    pub plogging_id: PloggingId,
    /// Distance covered.
    pub distance: f64,
    /// Elapsed hours.
    pub total_hour: u64,
    /// Elapsed minutes past the hour.
    pub total_minute: u8,
    /// Elapsed seconds past the minute.
    pub total_second: u8,
    /// Start address.
    pub started_where: String,
    /// End address.
    pub ended_where: String,
    /// Trash breakdown.
    pub trash: TrashTally,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Row in a member's session history.
pub struct SessionOverview {
    /// Session identifier.
    pub plogging_id: PloggingId,
    /// Distance covered.
    pub distance: f64,
    /// Total pieces of trash.
    pub quantity: u64,
    /// Start time.
    pub started_at: NaiveDateTime,
    /// End time.
    pub ended_at: NaiveDateTime,
}

impl From<&Plogging> for SessionOverview {
    fn from(plogging: &Plogging) -> Self {
        Self {
            plogging_id: plogging.id,
            distance: plogging.distance,
            quantity: plogging.quantity,
            started_at: plogging.started_at,
            ended_at: plogging.ended_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Registration request.
pub struct RegisterForm {
    /// Name for the new pet.
    pub pet_name: String,
    /// Species for the new pet.
    pub pet_kind: PetKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// A member's lifetime totals and pet.
pub struct MemberProfile {
    /// Sum of all session distances.
    pub total_distance: f64,
    /// Sum of all collected trash pieces.
    pub total_quantity: u64,
    /// The member's pet.
    pub pet: Pet,
}

impl From<&Member> for MemberProfile {
    fn from(member: &Member) -> Self {
        Self {
            total_distance: member.total_distance,
            total_quantity: member.total_quantity,
            pet: member.pet.clone(),
        }
    }
}
