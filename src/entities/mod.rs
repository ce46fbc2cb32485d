pub mod prelude;

pub mod sea_orm_active_enums;
pub mod segments;
pub mod stored_files;
pub mod trips;
pub mod upload_sessions;
pub mod users;
