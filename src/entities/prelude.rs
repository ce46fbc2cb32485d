pub use super::segments::Entity as Segments;
pub use super::stored_files::Entity as StoredFiles;
pub use super::trips::Entity as Trips;
pub use super::upload_sessions::Entity as UploadSessions;
pub use super::users::Entity as Users;
