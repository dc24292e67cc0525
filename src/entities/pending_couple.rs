use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pending_couple")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub realtor_id: i32,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::realtor::Entity",
        from = "Column::RealtorId",
        to = "super::realtor::Column::Id"
    )]
    Realtor,
    #[sea_orm(has_many = "super::pending_homebuyer::Entity")]
    PendingHomebuyer,
}

impl Related<super::realtor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Realtor.def()
    }
}

impl Related<super::pending_homebuyer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PendingHomebuyer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
