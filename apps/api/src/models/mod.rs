pub mod curriculum;
pub mod purchase;
