pub use super::category::Entity as Category;
pub use super::category_weight::Entity as CategoryWeight;
pub use super::couple::Entity as Couple;
pub use super::grade::Entity as Grade;
pub use super::homebuyer::Entity as Homebuyer;
pub use super::house::Entity as House;
pub use super::pending_couple::Entity as PendingCouple;
pub use super::pending_homebuyer::Entity as PendingHomebuyer;
pub use super::realtor::Entity as Realtor;
pub use super::user::Entity as User;
