pub mod contributions;
pub mod projects;
pub mod reports;
pub mod users;
