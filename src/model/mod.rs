pub mod card;
pub mod row;
pub mod service_account;
