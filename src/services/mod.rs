pub mod access;
pub mod catalog;
pub mod error;
pub mod session_store;
pub mod storage;
pub mod upload_service;
pub mod worker;
