pub mod constants;
pub mod coordinator;
pub mod descriptor;
pub mod elements;
pub mod error;
pub mod loops;
pub mod profile;
pub mod provider;
pub mod rig;
pub mod scheduler;

pub use coordinator::*;
pub use descriptor::*;
pub use elements::*;
pub use error::*;
pub use loops::*;
pub use profile::*;
pub use provider::*;
pub use rig::*;
pub use scheduler::*;
