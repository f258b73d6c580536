pub mod capabilities;
pub mod driver;
pub mod errors;
pub mod gate;
pub mod models;
pub mod notify;
pub mod profile;
pub mod providers;
pub mod registry;
