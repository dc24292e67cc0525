use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub is_staff: bool,
    pub is_active: bool,
    #[serde(skip_serializing)]
    #[sea_orm(unique)]
    pub confirmation_token: String,
    pub email_confirmed: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::homebuyer::Entity")]
    Homebuyer,
    #[sea_orm(has_one = "super::realtor::Entity")]
    Realtor,
}

impl Related<super::homebuyer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Homebuyer.def()
    }
}

impl Related<super::realtor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Realtor.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}
