pub mod common;
pub mod magazines;
pub mod sessions;
pub mod speakers;
pub mod watch;
