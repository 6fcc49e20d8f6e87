pub mod batch;
pub mod layout;
pub mod resolver;
pub mod source;
