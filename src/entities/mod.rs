pub mod prelude;

pub mod category;
pub mod category_weight;
pub mod couple;
pub mod grade;
pub mod homebuyer;
pub mod house;
pub mod pending_couple;
pub mod pending_homebuyer;
pub mod realtor;
pub mod user;
