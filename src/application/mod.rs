//! Application services orchestrating domain logic and repositories.

pub mod accounts;
pub mod error;
pub mod feed;
pub mod follow;
pub mod forms;
pub mod pagination;
pub mod posts;
pub mod repos;
