pub mod content_aware;
pub mod entity;
pub mod hierarchical;
pub mod keyword;
pub mod page;
pub mod paragraph;
pub mod semantic;
pub mod sentence;
pub mod token;
pub mod topic;
