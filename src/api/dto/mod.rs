//! Data Transfer Objects for REST request/response serialization.

pub mod catalog_dto;
pub mod common_dto;
pub mod subscription_dto;

pub use catalog_dto::*;
pub use common_dto::*;
pub use subscription_dto::*;
