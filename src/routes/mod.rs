pub mod api;
pub mod categories;
pub mod dashboard;
pub mod houses;
pub mod realtor;
pub mod report;
pub mod signup;
