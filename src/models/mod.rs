//! Data models shared between the API layer and the repository.

mod application;
mod employee;
mod form;
mod person;

pub use application::*;
pub use employee::*;
pub use form::*;
pub use person::*;
