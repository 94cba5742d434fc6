pub mod actor;
pub mod partner;
pub mod product;
pub mod rule;
pub mod sale;
pub mod tier;
