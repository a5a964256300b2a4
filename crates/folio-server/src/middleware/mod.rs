//! Request middleware.

pub(crate) mod language;
pub(crate) mod security;
