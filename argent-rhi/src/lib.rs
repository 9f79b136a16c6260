pub mod barrier;
pub mod command;
pub mod device;
pub mod resource;
pub mod state;
pub mod track;

pub use barrier::*;
pub use command::*;
pub use device::*;
pub use resource::*;
pub use state::*;
pub use track::*;
