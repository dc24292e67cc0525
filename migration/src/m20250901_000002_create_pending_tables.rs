use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create PendingCouple Table
        let table = table_auto(PendingCouple::Table)
            .col(pk_auto(PendingCouple::Id))
            .col(integer(PendingCouple::RealtorId))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_pending_couple_realtor")
                    .from(PendingCouple::Table, PendingCouple::RealtorId)
                    .to(Realtor::Table, Realtor::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        // Create PendingHomebuyer Table
        let table = table_auto(PendingHomebuyer::Table)
            .col(pk_auto(PendingHomebuyer::Id))
            .col(integer(PendingHomebuyer::PendingCoupleId))
            .col(string_uniq(PendingHomebuyer::Email))
            .col(string(PendingHomebuyer::FirstName))
            .col(string(PendingHomebuyer::LastName))
            .col(string_uniq(PendingHomebuyer::RegistrationToken))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_pending_homebuyer_pending_couple")
                    .from(PendingHomebuyer::Table, PendingHomebuyer::PendingCoupleId)
                    .to(PendingCouple::Table, PendingCouple::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pending_homebuyer_pending_couple")
                    .table(PendingHomebuyer::Table)
                    .col(PendingHomebuyer::PendingCoupleId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PendingHomebuyer::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(PendingCouple::Table).to_owned())
            .await?;

        Ok(())
    }
}
