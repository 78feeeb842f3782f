use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "reservation_states")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// `None` for rows whose name is not part of the lifecycle
    pub fn into_state(self) -> Option<crate::models::ReservationState> {
        let status = self.name.parse().ok()?;
        Some(crate::models::ReservationState {
            id: self.id,
            status,
            description: self.description,
            active: self.active,
        })
    }
}
