//! CLI command implementations.

pub(crate) mod init;
pub(crate) mod new;
pub(crate) mod serve;

pub(crate) use init::InitArgs;
pub(crate) use new::NewArgs;
pub(crate) use serve::ServeArgs;
