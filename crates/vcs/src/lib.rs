pub mod error;
pub mod git;
pub mod sandbox;

pub use error::{Result, VcsError};
pub use git::GitRepo;
pub use sandbox::{SandboxReport, SandboxRunner};
