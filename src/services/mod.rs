// Services module - Business logic

pub mod accounts;
pub mod classes;
pub mod credentials;
pub mod membership_status;
pub mod payments;
pub mod policy;
pub mod portal;
