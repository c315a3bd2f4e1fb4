pub mod actor;
pub mod college;
pub mod message;
pub mod request;
