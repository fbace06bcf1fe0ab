pub mod approval;
pub mod document;
pub mod mapping;
pub mod notification;
pub mod preview;
pub mod profile;
pub mod resolution;
pub mod template;
