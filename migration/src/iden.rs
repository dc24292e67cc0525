use sea_orm_migration::prelude::*;

// Define table names
#[derive(DeriveIden)]
pub enum User {
    Table,
    Id,
    Email,
    PasswordHash,
    FirstName,
    LastName,
    Phone,
    IsStaff,
    IsActive,
    ConfirmationToken,
    EmailConfirmed,
}

#[derive(DeriveIden)]
pub enum Realtor {
    Table,
    Id,
    UserId,
}

#[derive(DeriveIden)]
pub enum Couple {
    Table,
    Id,
    RealtorId,
}

#[derive(DeriveIden)]
pub enum Homebuyer {
    Table,
    Id,
    UserId,
    CoupleId,
}

#[derive(DeriveIden)]
pub enum Category {
    Table,
    Id,
    CoupleId,
    Summary,
    Description,
}

#[derive(DeriveIden)]
pub enum House {
    Table,
    Id,
    CoupleId,
    Nickname,
    Address,
}

#[derive(DeriveIden)]
pub enum CategoryWeight {
    Table,
    Id,
    HomebuyerId,
    CategoryId,
    Weight,
}

#[derive(DeriveIden)]
pub enum Grade {
    Table,
    Id,
    HouseId,
    CategoryId,
    HomebuyerId,
    Score,
}

#[derive(DeriveIden)]
pub enum PendingCouple {
    Table,
    Id,
    RealtorId,
}

#[derive(DeriveIden)]
pub enum PendingHomebuyer {
    Table,
    Id,
    PendingCoupleId,
    Email,
    FirstName,
    LastName,
    RegistrationToken,
}
