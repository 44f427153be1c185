pub mod create;
pub mod identity;
pub mod info;
pub mod sign;
pub mod verify;

pub use create::*;
pub use identity::*;
pub use info::*;
pub use sign::*;
pub use verify::*;
