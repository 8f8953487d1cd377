pub mod registration;
pub mod table;
pub mod utils;
