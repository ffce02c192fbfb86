//! File helpers: discovery, batch processing, and writing, all over the
//! [`Filesystem`](crate::application::ports::Filesystem) port.

mod batch;
mod discovery;
mod join;
mod writer;

pub use batch::read_files;
pub use discovery::{DiscoveryOptions, has_extension, read_directory};
pub use join::join_all_detached;
pub use writer::write_to_file;
