use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pending_homebuyer")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub pending_couple_id: i32,
    #[sea_orm(unique)]
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    #[sea_orm(unique)]
    pub registration_token: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::pending_couple::Entity",
        from = "Column::PendingCoupleId",
        to = "super::pending_couple::Column::Id"
    )]
    PendingCouple,
}

impl Related<super::pending_couple::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PendingCouple.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
