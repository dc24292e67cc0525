pub mod accounts;
pub mod catalog;
pub mod invites;
pub mod report;
pub mod roles;
pub mod tokens;
