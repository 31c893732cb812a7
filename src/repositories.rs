pub mod contributions;
pub mod projects;
pub mod users;
