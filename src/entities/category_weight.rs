use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "category_weight")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub homebuyer_id: i32,
    pub category_id: i32,
    pub weight: i16,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::homebuyer::Entity",
        from = "Column::HomebuyerId",
        to = "super::homebuyer::Column::Id"
    )]
    Homebuyer,
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
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

impl ActiveModelBehavior for ActiveModel {}
