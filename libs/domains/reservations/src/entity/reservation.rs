use crate::models::ReservationStatus;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;

/// Sea-ORM Entity for the reservations table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub state: ReservationStatus,
    pub start_date: Date,
    pub end_date: Date,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub total_price: Decimal,
    #[sea_orm(column_type = "Text", nullable)]
    pub observations: Option<String>,
    pub confirmed_at: Option<DateTimeWithTimeZone>,
    pub cancelled_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "Text", nullable)]
    pub cancellation_reason: Option<String>,
    pub version: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::Reservation {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            product_id: model.product_id,
            status: model.state,
            start_date: model.start_date,
            end_date: model.end_date,
            total_price: model.total_price,
            observations: model.observations,
            confirmed_at: model.confirmed_at.map(Into::into),
            cancelled_at: model.cancelled_at.map(Into::into),
            cancellation_reason: model.cancellation_reason,
            version: model.version,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

/// Every column set, for both inserts and full-row updates
impl From<crate::models::Reservation> for ActiveModel {
    fn from(r: crate::models::Reservation) -> Self {
        ActiveModel {
            id: Set(r.id),
            user_id: Set(r.user_id),
            product_id: Set(r.product_id),
            state: Set(r.status),
            start_date: Set(r.start_date),
            end_date: Set(r.end_date),
            total_price: Set(r.total_price),
            observations: Set(r.observations),
            confirmed_at: Set(r.confirmed_at.map(Into::into)),
            cancelled_at: Set(r.cancelled_at.map(Into::into)),
            cancellation_reason: Set(r.cancellation_reason),
            version: Set(r.version),
            created_at: Set(r.created_at.into()),
            updated_at: Set(r.updated_at.into()),
        }
    }
}
