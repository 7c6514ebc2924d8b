mod attributes;
mod constants;
mod event_bus;
mod lock;
mod util;
mod value;

pub use attributes::*;
pub use constants::*;
pub use event_bus::*;
pub use lock::*;
pub use util::*;
pub use value::*;
