//! Store implementation persisting every table in SQLite through `sqlx`.
//!
//! SQLite locks the whole database for a writer, so the pool keeps a single
//! connection. A transaction owns that connection from [`Store::begin`] until
//! it commits or is dropped, which serializes read-modify-write cycles on
//! member totals the same way a row lock would.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool};
use tracing::{debug, info};

use plocky_core::{
    model::{
        ExternalId, Location, LocationId, Member, MemberId, NewLocation, NewMember, NewPlogging,
        Pet, PetKind, Plogging, PloggingId, TrashCategory, TrashCategoryId, Trashcan,
        TrashcanForm, TrashcanId,
    },
    ports::{
        LocationRepository, MemberRepository, PloggingRepository, PortError, Store, Transaction,
        TrashCategoryRepository, TrashcanRepository,
    },
};

const SCHEMA: [&str; 6] = [
    r"
    CREATE TABLE IF NOT EXISTS members (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        external_id TEXT NOT NULL UNIQUE,
        total_distance REAL NOT NULL DEFAULT 0,
        total_quantity INTEGER NOT NULL DEFAULT 0,
        pet_name TEXT NOT NULL,
        pet_kind TEXT NOT NULL,
        pet_level INTEGER NOT NULL DEFAULT 0
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS locations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        latitude REAL NOT NULL,
        longitude REAL NOT NULL,
        address TEXT NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS trash_categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        paper_quantity INTEGER NOT NULL,
        plastic_quantity INTEGER NOT NULL,
        glass_quantity INTEGER NOT NULL,
        can_quantity INTEGER NOT NULL,
        foam_quantity INTEGER NOT NULL,
        etc_quantity INTEGER NOT NULL,
        cigarette_quantity INTEGER NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS ploggings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        member_id INTEGER NOT NULL REFERENCES members(id),
        distance REAL NOT NULL,
        quantity INTEGER NOT NULL,
        started_location INTEGER NOT NULL REFERENCES locations(id),
        ended_location INTEGER NOT NULL REFERENCES locations(id),
        started_at TEXT NOT NULL,
        ended_at TEXT NOT NULL,
        trash_category INTEGER NOT NULL REFERENCES trash_categories(id)
    )
    ",
    r"
    CREATE INDEX IF NOT EXISTS idx_ploggings_member
    ON ploggings(member_id)
    ",
    r"
    CREATE TABLE IF NOT EXISTS trashcans (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        latitude REAL NOT NULL,
        longitude REAL NOT NULL,
        address TEXT NOT NULL
    )
    ",
];

/// SQLite-backed [`Store`].
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open the database at `url`, creating the file if needed, and apply the schema.
    ///
    /// `sqlite::memory:` gives a private in-memory database that lives as long
    /// as the store.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Internal`] when the URL is invalid or the database
    /// cannot be opened or migrated.
    pub async fn connect(url: &str) -> Result<Self, PortError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(storage_error)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        // Recycling the only connection would wipe an in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await
            .map_err(storage_error)?;

        debug!(%url, "Opened SQLite database");
        Self::new(pool).await
    }

    /// Wrap an existing pool and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Internal`] when a schema statement fails.
    pub async fn new(pool: SqlitePool) -> Result<Self, PortError> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Wait for open transactions to finish and close the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn migrate(&self) -> Result<(), PortError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(storage_error)?;
        }
        info!("Database schema ready");
        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, PortError> {
        let tx = self.pool.begin().await.map_err(storage_error)?;
        Ok(Box::new(SqliteTransaction { tx }))
    }
}

struct SqliteTransaction {
    tx: sqlx::Transaction<'static, Sqlite>,
}

fn storage_error(err: sqlx::Error) -> PortError {
    PortError::Internal(format!("database: {err}"))
}

fn to_sql(value: u64) -> Result<i64, PortError> {
    i64::try_from(value)
        .map_err(|err| PortError::Validation(format!("{value} is too large to store: {err}")))
}

fn row_id(raw: i64) -> Result<u64, PortError> {
    u64::try_from(raw).map_err(|err| PortError::Internal(format!("row id {raw}: {err}")))
}

fn int_column<T>(row: &SqliteRow, name: &str) -> Result<T, PortError>
where
    T: TryFrom<i64>,
    T::Error: Display,
{
    let raw: i64 = row.try_get(name).map_err(storage_error)?;
    T::try_from(raw).map_err(|err| PortError::Internal(format!("column {name} holds {raw}: {err}")))
}

fn kind_name(kind: PetKind) -> &'static str {
    match kind {
        PetKind::Dog => "DOG",
        PetKind::Cat => "CAT",
        PetKind::Rabbit => "RABBIT",
        PetKind::Chick => "CHICK",
    }
}

fn parse_kind(name: &str) -> Result<PetKind, PortError> {
    match name {
        "DOG" => Ok(PetKind::Dog),
        "CAT" => Ok(PetKind::Cat),
        "RABBIT" => Ok(PetKind::Rabbit),
        "CHICK" => Ok(PetKind::Chick),
        other => Err(PortError::Internal(format!("unknown pet kind {other:?}"))),
    }
}

fn member_from_row(row: &SqliteRow) -> Result<Member, PortError> {
    let kind: String = row.try_get("pet_kind").map_err(storage_error)?;
    Ok(Member {
        id: MemberId(int_column(row, "id")?),
        external_id: ExternalId(row.try_get("external_id").map_err(storage_error)?),
        total_distance: row.try_get("total_distance").map_err(storage_error)?,
        total_quantity: int_column(row, "total_quantity")?,
        pet: Pet {
            name: row.try_get("pet_name").map_err(storage_error)?,
            kind: parse_kind(&kind)?,
            level: int_column(row, "pet_level")?,
        },
    })
}

fn location_from_row(row: &SqliteRow) -> Result<Location, PortError> {
    Ok(Location {
        id: LocationId(int_column(row, "id")?),
        latitude: row.try_get("latitude").map_err(storage_error)?,
        longitude: row.try_get("longitude").map_err(storage_error)?,
        address: row.try_get("address").map_err(storage_error)?,
    })
}

fn trash_category_from_row(row: &SqliteRow) -> Result<TrashCategory, PortError> {
    Ok(TrashCategory {
        paper: int_column(row, "paper_quantity")?,
        plastic: int_column(row, "plastic_quantity")?,
        glass: int_column(row, "glass_quantity")?,
        can: int_column(row, "can_quantity")?,
        foam: int_column(row, "foam_quantity")?,
        etc: int_column(row, "etc_quantity")?,
        cigarette: int_column(row, "cigarette_quantity")?,
    })
}

fn plogging_from_row(row: &SqliteRow) -> Result<Plogging, PortError> {
    let started_at: NaiveDateTime = row.try_get("started_at").map_err(storage_error)?;
    let ended_at: NaiveDateTime = row.try_get("ended_at").map_err(storage_error)?;
    Ok(Plogging {
        id: PloggingId(int_column(row, "id")?),
        member_id: MemberId(int_column(row, "member_id")?),
        distance: row.try_get("distance").map_err(storage_error)?,
        quantity: int_column(row, "quantity")?,
        started_location: LocationId(int_column(row, "started_location")?),
        ended_location: LocationId(int_column(row, "ended_location")?),
        started_at,
        ended_at,
        trash_category: TrashCategoryId(int_column(row, "trash_category")?),
    })
}

fn trashcan_from_row(row: &SqliteRow) -> Result<Trashcan, PortError> {
    Ok(Trashcan {
        id: TrashcanId(int_column(row, "id")?),
        latitude: row.try_get("latitude").map_err(storage_error)?,
        longitude: row.try_get("longitude").map_err(storage_error)?,
        address: row.try_get("address").map_err(storage_error)?,
    })
}

#[async_trait]
impl MemberRepository for SqliteTransaction {
    async fn find_member(&mut self, external_id: &ExternalId) -> Result<Option<Member>, PortError> {
        sqlx::query(
            r"
            SELECT id, external_id, total_distance, total_quantity, pet_name, pet_kind, pet_level
            FROM members WHERE external_id = ?
            ",
        )
        .bind(&external_id.0)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(storage_error)?
        .as_ref()
        .map(member_from_row)
        .transpose()
    }

    async fn find_member_by_id(&mut self, id: MemberId) -> Result<Option<Member>, PortError> {
        sqlx::query(
            r"
            SELECT id, external_id, total_distance, total_quantity, pet_name, pet_kind, pet_level
            FROM members WHERE id = ?
            ",
        )
        .bind(to_sql(id.0)?)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(storage_error)?
        .as_ref()
        .map(member_from_row)
        .transpose()
    }

    async fn insert_member(&mut self, member: NewMember) -> Result<Member, PortError> {
        let result = sqlx::query(
            r"
            INSERT INTO members (external_id, total_distance, total_quantity, pet_name, pet_kind, pet_level)
            VALUES (?, 0, 0, ?, ?, ?)
            ",
        )
        .bind(&member.external_id.0)
        .bind(&member.pet.name)
        .bind(kind_name(member.pet.kind))
        .bind(i64::from(member.pet.level))
        .execute(&mut *self.tx)
        .await;

        let result = match result {
            Ok(result) => result,
            Err(err) => {
                let duplicate = err
                    .as_database_error()
                    .is_some_and(|db| db.is_unique_violation());
                if duplicate {
                    return Err(PortError::Conflict(format!(
                        "member {} already registered",
                        member.external_id
                    )));
                }
                return Err(storage_error(err));
            }
        };

        Ok(Member {
            id: MemberId(row_id(result.last_insert_rowid())?),
            external_id: member.external_id,
            total_distance: 0.0,
            total_quantity: 0,
            pet: member.pet,
        })
    }

    async fn save_member(&mut self, member: &Member) -> Result<(), PortError> {
        let result = sqlx::query(
            r"
            UPDATE members SET
                total_distance = ?,
                total_quantity = ?,
                pet_name = ?,
                pet_kind = ?,
                pet_level = ?
            WHERE id = ?
            ",
        )
        .bind(member.total_distance)
        .bind(to_sql(member.total_quantity)?)
        .bind(&member.pet.name)
        .bind(kind_name(member.pet.kind))
        .bind(i64::from(member.pet.level))
        .bind(to_sql(member.id.0)?)
        .execute(&mut *self.tx)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("member {}", member.external_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl LocationRepository for SqliteTransaction {
    async fn insert_location(&mut self, location: NewLocation) -> Result<Location, PortError> {
        let result =
            sqlx::query("INSERT INTO locations (latitude, longitude, address) VALUES (?, ?, ?)")
                .bind(location.coordinate.latitude)
                .bind(location.coordinate.longitude)
                .bind(&location.address)
                .execute(&mut *self.tx)
                .await
                .map_err(storage_error)?;

        Ok(Location {
            id: LocationId(row_id(result.last_insert_rowid())?),
            latitude: location.coordinate.latitude,
            longitude: location.coordinate.longitude,
            address: location.address,
        })
    }

    async fn find_location(&mut self, id: LocationId) -> Result<Option<Location>, PortError> {
        sqlx::query("SELECT id, latitude, longitude, address FROM locations WHERE id = ?")
            .bind(to_sql(id.0)?)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(storage_error)?
            .as_ref()
            .map(location_from_row)
            .transpose()
    }
}

#[async_trait]
impl TrashCategoryRepository for SqliteTransaction {
    async fn insert_trash_category(
        &mut self,
        category: TrashCategory,
    ) -> Result<TrashCategoryId, PortError> {
        let result = sqlx::query(
            r"
            INSERT INTO trash_categories (
                paper_quantity, plastic_quantity, glass_quantity, can_quantity,
                foam_quantity, etc_quantity, cigarette_quantity
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(i64::from(category.paper))
        .bind(i64::from(category.plastic))
        .bind(i64::from(category.glass))
        .bind(i64::from(category.can))
        .bind(i64::from(category.foam))
        .bind(i64::from(category.etc))
        .bind(i64::from(category.cigarette))
        .execute(&mut *self.tx)
        .await
        .map_err(storage_error)?;

        Ok(TrashCategoryId(row_id(result.last_insert_rowid())?))
    }

    async fn find_trash_category(
        &mut self,
        id: TrashCategoryId,
    ) -> Result<Option<TrashCategory>, PortError> {
        sqlx::query(
            r"
            SELECT paper_quantity, plastic_quantity, glass_quantity, can_quantity,
                   foam_quantity, etc_quantity, cigarette_quantity
            FROM trash_categories WHERE id = ?
            ",
        )
        .bind(to_sql(id.0)?)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(storage_error)?
        .as_ref()
        .map(trash_category_from_row)
        .transpose()
    }
}

#[async_trait]
impl PloggingRepository for SqliteTransaction {
    async fn insert_plogging(&mut self, plogging: NewPlogging) -> Result<Plogging, PortError> {
        let result = sqlx::query(
            r"
            INSERT INTO ploggings (
                member_id, distance, quantity, started_location, ended_location,
                started_at, ended_at, trash_category
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(to_sql(plogging.member_id.0)?)
        .bind(plogging.distance)
        .bind(to_sql(plogging.quantity)?)
        .bind(to_sql(plogging.started_location.0)?)
        .bind(to_sql(plogging.ended_location.0)?)
        .bind(plogging.started_at)
        .bind(plogging.ended_at)
        .bind(to_sql(plogging.trash_category.0)?)
        .execute(&mut *self.tx)
        .await
        .map_err(storage_error)?;

        Ok(Plogging {
            id: PloggingId(row_id(result.last_insert_rowid())?),
            member_id: plogging.member_id,
            distance: plogging.distance,
            quantity: plogging.quantity,
            started_location: plogging.started_location,
            ended_location: plogging.ended_location,
            started_at: plogging.started_at,
            ended_at: plogging.ended_at,
            trash_category: plogging.trash_category,
        })
    }

    async fn find_plogging(&mut self, id: PloggingId) -> Result<Option<Plogging>, PortError> {
        sqlx::query(
            r"
            SELECT id, member_id, distance, quantity, started_location, ended_location,
                   started_at, ended_at, trash_category
            FROM ploggings WHERE id = ?
            ",
        )
        .bind(to_sql(id.0)?)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(storage_error)?
        .as_ref()
        .map(plogging_from_row)
        .transpose()
    }

    async fn list_ploggings(&mut self, member_id: MemberId) -> Result<Vec<Plogging>, PortError> {
        sqlx::query(
            r"
            SELECT id, member_id, distance, quantity, started_location, ended_location,
                   started_at, ended_at, trash_category
            FROM ploggings WHERE member_id = ?
            ",
        )
        .bind(to_sql(member_id.0)?)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(storage_error)?
        .iter()
        .map(plogging_from_row)
        .collect()
    }
}

#[async_trait]
impl TrashcanRepository for SqliteTransaction {
    async fn list_trashcans(&mut self) -> Result<Vec<Trashcan>, PortError> {
        sqlx::query("SELECT id, latitude, longitude, address FROM trashcans ORDER BY id")
            .fetch_all(&mut *self.tx)
            .await
            .map_err(storage_error)?
            .iter()
            .map(trashcan_from_row)
            .collect()
    }

    async fn insert_trashcan(&mut self, form: TrashcanForm) -> Result<Trashcan, PortError> {
        let result =
            sqlx::query("INSERT INTO trashcans (latitude, longitude, address) VALUES (?, ?, ?)")
                .bind(form.latitude)
                .bind(form.longitude)
                .bind(&form.address)
                .execute(&mut *self.tx)
                .await
                .map_err(storage_error)?;

        Ok(Trashcan {
            id: TrashcanId(row_id(result.last_insert_rowid())?),
            latitude: form.latitude,
            longitude: form.longitude,
            address: form.address,
        })
    }

    async fn delete_trashcan(&mut self, id: TrashcanId) -> Result<bool, PortError> {
        let result = sqlx::query("DELETE FROM trashcans WHERE id = ?")
            .bind(to_sql(id.0)?)
            .execute(&mut *self.tx)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Transaction for SqliteTransaction {
    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        let SqliteTransaction { tx } = *self;
        tx.commit().await.map_err(storage_error)
    }
}
