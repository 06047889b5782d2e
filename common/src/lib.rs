pub mod error;
pub mod field_mapping;
pub mod record;
pub mod search_document;
pub mod storage;
pub mod utils;
