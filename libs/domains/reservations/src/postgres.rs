use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use database::BaseRepository;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Statement, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    directory::{ProductCatalog, ProductSummary, UserDirectory, UserSummary},
    entity::{product, reservation, reservation_state, user},
    error::{ReservationError, ReservationResult},
    models::{
        HistoryQuery, Page, PageRequest, Reservation, ReservationFilter, ReservationState,
        ReservationStatus,
    },
    repository::{ReservationRepository, WriteGuard, WriteOutcome},
    states::StateRegistry,
};

/// Serializes guarded writes per product for the rest of the transaction
const PRODUCT_LOCK_SQL: &str = "SELECT pg_advisory_xact_lock(hashtextextended($1, 0))";

pub struct PgReservationRepository {
    base: BaseRepository<reservation::Entity>,
}

impl PgReservationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    async fn page(
        &self,
        query: Select<reservation::Entity>,
        page: PageRequest,
    ) -> ReservationResult<Page<Reservation>> {
        let total = query.clone().count(self.base.db()).await?;

        let items = query
            .order_by_desc(reservation::Column::CreatedAt)
            .order_by_desc(reservation::Column::Id)
            .limit(page.limit as u64)
            .offset(page.offset as u64)
            .all(self.base.db())
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        Ok(Page::new(items, total, page))
    }
}

fn overlapping(
    product_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
) -> Select<reservation::Entity> {
    reservation::Entity::find()
        .filter(reservation::Column::ProductId.eq(product_id))
        .filter(reservation::Column::StartDate.lte(end))
        .filter(reservation::Column::EndDate.gte(start))
        .order_by_asc(reservation::Column::StartDate)
}

#[async_trait]
impl ReservationRepository for PgReservationRepository {
    async fn write(
        &self,
        reservation: Reservation,
        guard: WriteGuard,
    ) -> ReservationResult<WriteOutcome> {
        let txn = self.base.db().begin().await?;

        txn.execute_raw(Statement::from_sql_and_values(
            DbBackend::Postgres,
            PRODUCT_LOCK_SQL,
            [reservation.product_id.to_string().into()],
        ))
        .await?;

        let mut reservation = reservation;
        match guard.expected {
            None => reservation.version = 1,
            Some(expected) => {
                let stored = reservation::Entity::find_by_id(reservation.id)
                    .lock_exclusive()
                    .one(&txn)
                    .await?;

                match stored {
                    None => return Ok(WriteOutcome::Missing),
                    Some(row) if row.state != expected.status || row.version != expected.version => {
                        return Ok(WriteOutcome::Stale(row.state));
                    }
                    Some(row) => reservation.version = row.version + 1,
                }
            }
        }

        if guard.check_overlap || reservation.status == ReservationStatus::Confirmed {
            let conflicts = overlapping(
                reservation.product_id,
                reservation.start_date,
                reservation.end_date,
            )
            .filter(reservation::Column::State.eq(ReservationStatus::Confirmed))
            .filter(reservation::Column::Id.ne(reservation.id))
            .all(&txn)
            .await?;

            if !conflicts.is_empty() {
                // Dropping the transaction rolls it back and releases the lock
                return Ok(WriteOutcome::Conflicts(
                    conflicts.into_iter().map(Into::into).collect(),
                ));
            }
        }

        let id = reservation.id;
        let active_model: reservation::ActiveModel = reservation.into();
        let model = match guard.expected {
            None => active_model.insert(&txn).await?,
            Some(_) => active_model.update(&txn).await?,
        };

        txn.commit().await?;

        tracing::info!(reservation_id = %id, status = %model.state, "Stored reservation");
        Ok(WriteOutcome::Written(model.into()))
    }

    async fn get_by_id(&self, id: Uuid) -> ReservationResult<Option<Reservation>> {
        let model = self.base.find_by_id(id).await?;
        Ok(model.map(Into::into))
    }

    async fn find_overlapping(
        &self,
        product_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        states: &[ReservationStatus],
    ) -> ReservationResult<Vec<Reservation>> {
        let models = overlapping(product_id, start, end)
            .filter(reservation::Column::State.is_in(states.iter().copied()))
            .all(self.base.db())
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn find_active_by_user(
        &self,
        user_id: Uuid,
        today: NaiveDate,
    ) -> ReservationResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .filter(reservation::Column::UserId.eq(user_id))
            .filter(
                reservation::Column::State
                    .is_in([ReservationStatus::Pending, ReservationStatus::Confirmed]),
            )
            .filter(reservation::Column::EndDate.gte(today))
            .order_by_asc(reservation::Column::StartDate)
            .all(self.base.db())
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn find_upcoming(
        &self,
        today: NaiveDate,
        within_days: u32,
    ) -> ReservationResult<Vec<Reservation>> {
        let limit = today
            .checked_add_days(Days::new(within_days as u64))
            .unwrap_or(NaiveDate::MAX);

        let models = reservation::Entity::find()
            .filter(reservation::Column::State.eq(ReservationStatus::Confirmed))
            .filter(reservation::Column::StartDate.gte(today))
            .filter(reservation::Column::StartDate.lte(limit))
            .order_by_asc(reservation::Column::StartDate)
            .all(self.base.db())
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn list(&self, filter: ReservationFilter) -> ReservationResult<Page<Reservation>> {
        let mut query = reservation::Entity::find();

        if let Some(user_id) = filter.user_id {
            query = query.filter(reservation::Column::UserId.eq(user_id));
        }

        if let Some(product_id) = filter.product_id {
            query = query.filter(reservation::Column::ProductId.eq(product_id));
        }

        if let Some(status) = filter.status {
            query = query.filter(reservation::Column::State.eq(status));
        }

        self.page(query, filter.page).await
    }

    async fn history(&self, query: HistoryQuery) -> ReservationResult<Page<Reservation>> {
        let within = Condition::any()
            .add(reservation::Column::StartDate.between(query.from, query.to))
            .add(reservation::Column::EndDate.between(query.from, query.to));

        let mut select = reservation::Entity::find()
            .filter(reservation::Column::UserId.eq(query.user_id))
            .filter(within);

        if !query.states.is_empty() {
            select = select.filter(reservation::Column::State.is_in(query.states.iter().copied()));
        }

        self.page(select, query.page).await
    }

    async fn count_by_status(&self, status: ReservationStatus) -> ReservationResult<u64> {
        let count = reservation::Entity::find()
            .filter(reservation::Column::State.eq(status))
            .count(self.base.db())
            .await?;

        Ok(count)
    }

    async fn delete(&self, id: Uuid) -> ReservationResult<bool> {
        let deleted = self.base.delete_by_id(id).await?;

        if deleted {
            tracing::info!(reservation_id = %id, "Deleted reservation");
        }
        Ok(deleted)
    }
}

pub struct PgStateRegistry {
    db: DatabaseConnection,
}

impl PgStateRegistry {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StateRegistry for PgStateRegistry {
    async fn find_by_name(&self, name: &str) -> ReservationResult<Option<ReservationState>> {
        let model = reservation_state::Entity::find()
            .filter(reservation_state::Column::Name.eq(name))
            .one(&self.db)
            .await?;

        Ok(model.and_then(reservation_state::Model::into_state))
    }

    async fn list_active(&self) -> ReservationResult<Vec<ReservationState>> {
        let models = reservation_state::Entity::find()
            .filter(reservation_state::Column::Active.eq(true))
            .order_by_asc(reservation_state::Column::Id)
            .all(&self.db)
            .await?;

        Ok(models
            .into_iter()
            .filter_map(reservation_state::Model::into_state)
            .collect())
    }
}

pub struct PgUserDirectory {
    base: BaseRepository<user::Entity>,
}

impl PgUserDirectory {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn exists(&self, id: Uuid) -> ReservationResult<bool> {
        let count = user::Entity::find_by_id(id).count(self.base.db()).await?;
        Ok(count > 0)
    }

    async fn get(&self, id: Uuid) -> ReservationResult<UserSummary> {
        self.base
            .find_by_id(id)
            .await?
            .map(Into::into)
            .ok_or_else(|| ReservationError::user_not_found(id))
    }
}

pub struct PgProductCatalog {
    base: BaseRepository<product::Entity>,
}

impl PgProductCatalog {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl ProductCatalog for PgProductCatalog {
    async fn exists(&self, id: Uuid) -> ReservationResult<bool> {
        let count = product::Entity::find_by_id(id).count(self.base.db()).await?;
        Ok(count > 0)
    }

    async fn get(&self, id: Uuid) -> ReservationResult<ProductSummary> {
        self.base
            .find_by_id(id)
            .await?
            .map(Into::into)
            .ok_or_else(|| ReservationError::product_not_found(id))
    }
}
