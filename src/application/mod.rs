//! Application services: query evaluation, mutations and cached views.

pub mod categories;
pub mod criteria;
pub mod error;
pub mod favorites;
pub mod mutation;
pub mod pagination;
pub mod repos;
pub mod search;
pub mod tips;
pub mod users;
pub mod views;
