use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create User Table
        let table = table_auto(User::Table)
            .col(pk_auto(User::Id))
            .col(string_uniq(User::Email))
            .col(string(User::PasswordHash))
            .col(string(User::FirstName))
            .col(string(User::LastName))
            .col(string_null(User::Phone))
            .col(boolean(User::IsStaff).default(false))
            .col(boolean(User::IsActive).default(true))
            .col(string_uniq(User::ConfirmationToken))
            .col(boolean(User::EmailConfirmed).default(false))
            .to_owned();
        manager.create_table(table).await?;

        // Create Realtor Table
        let table = table_auto(Realtor::Table)
            .col(pk_auto(Realtor::Id))
            .col(integer_uniq(Realtor::UserId))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_realtor_user")
                    .from(Realtor::Table, Realtor::UserId)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        // Create Couple Table
        let table = table_auto(Couple::Table)
            .col(pk_auto(Couple::Id))
            .col(integer(Couple::RealtorId))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_couple_realtor")
                    .from(Couple::Table, Couple::RealtorId)
                    .to(Realtor::Table, Realtor::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        // Create Homebuyer Table
        let table = table_auto(Homebuyer::Table)
            .col(pk_auto(Homebuyer::Id))
            .col(integer_uniq(Homebuyer::UserId))
            .col(integer(Homebuyer::CoupleId))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_homebuyer_user")
                    .from(Homebuyer::Table, Homebuyer::UserId)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_homebuyer_couple")
                    .from(Homebuyer::Table, Homebuyer::CoupleId)
                    .to(Couple::Table, Couple::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        // Create Category Table
        let table = table_auto(Category::Table)
            .col(pk_auto(Category::Id))
            .col(integer(Category::CoupleId))
            .col(string(Category::Summary))
            .col(text(Category::Description).default(""))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_category_couple")
                    .from(Category::Table, Category::CoupleId)
                    .to(Couple::Table, Couple::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        // Create House Table
        let table = table_auto(House::Table)
            .col(pk_auto(House::Id))
            .col(integer(House::CoupleId))
            .col(string(House::Nickname))
            .col(text(House::Address).default(""))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_house_couple")
                    .from(House::Table, House::CoupleId)
                    .to(Couple::Table, Couple::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        // Create CategoryWeight Table
        let table = table_auto(CategoryWeight::Table)
            .col(pk_auto(CategoryWeight::Id))
            .col(integer(CategoryWeight::HomebuyerId))
            .col(integer(CategoryWeight::CategoryId))
            .col(
                small_integer(CategoryWeight::Weight)
                    .default(3)
                    .check(
                        Expr::col(CategoryWeight::Weight)
                            .gte(1)
                            .and(Expr::col(CategoryWeight::Weight).lte(5)),
                    )
                    .to_owned(),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_category_weight_homebuyer")
                    .from(CategoryWeight::Table, CategoryWeight::HomebuyerId)
                    .to(Homebuyer::Table, Homebuyer::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_category_weight_category")
                    .from(CategoryWeight::Table, CategoryWeight::CategoryId)
                    .to(Category::Table, Category::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        // Create Grade Table
        let table = table_auto(Grade::Table)
            .col(pk_auto(Grade::Id))
            .col(integer(Grade::HouseId))
            .col(integer(Grade::CategoryId))
            .col(integer(Grade::HomebuyerId))
            .col(
                small_integer(Grade::Score)
                    .default(3)
                    .check(Expr::col(Grade::Score).gte(1).and(Expr::col(Grade::Score).lte(5)))
                    .to_owned(),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_grade_house")
                    .from(Grade::Table, Grade::HouseId)
                    .to(House::Table, House::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_grade_category")
                    .from(Grade::Table, Grade::CategoryId)
                    .to(Category::Table, Category::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_grade_homebuyer")
                    .from(Grade::Table, Grade::HomebuyerId)
                    .to(Homebuyer::Table, Homebuyer::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        // Uniqueness scoped to a couple rather than global
        manager
            .create_index(
                Index::create()
                    .name("idx_category_couple_summary")
                    .table(Category::Table)
                    .col(Category::CoupleId)
                    .col(Category::Summary)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_house_couple_nickname")
                    .table(House::Table)
                    .col(House::CoupleId)
                    .col(House::Nickname)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_category_weight_homebuyer_category")
                    .table(CategoryWeight::Table)
                    .col(CategoryWeight::HomebuyerId)
                    .col(CategoryWeight::CategoryId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_grade_house_category_homebuyer")
                    .table(Grade::Table)
                    .col(Grade::HouseId)
                    .col(Grade::CategoryId)
                    .col(Grade::HomebuyerId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_homebuyer_couple")
                    .table(Homebuyer::Table)
                    .col(Homebuyer::CoupleId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop all tables in reverse order to avoid foreign key constraints
        manager
            .drop_table(Table::drop().table(Grade::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(CategoryWeight::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(House::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Category::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Homebuyer::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Couple::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Realtor::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await?;

        Ok(())
    }
}
