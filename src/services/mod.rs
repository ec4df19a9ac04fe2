pub mod activity_query_service;
pub mod import_service;
pub mod repository;

pub use activity_query_service::*;
pub use import_service::*;
pub use repository::*;
