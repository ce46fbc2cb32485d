pub mod health;
pub mod segments;
pub mod uploads;
