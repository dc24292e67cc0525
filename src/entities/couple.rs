use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "couple")]
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
    #[sea_orm(has_many = "super::homebuyer::Entity")]
    Homebuyer,
    #[sea_orm(has_many = "super::category::Entity")]
    Category,
    #[sea_orm(has_many = "super::house::Entity")]
    House,
}

impl Related<super::realtor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Realtor.def()
    }
}

impl Related<super::homebuyer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Homebuyer.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::house::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::House.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
