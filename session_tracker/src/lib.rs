mod clock;
mod error;
mod location;
mod replay;
mod tracker;

pub use clock::*;
pub use error::*;
pub use location::*;
pub use replay::*;
pub use tracker::*;

pub use cardio_tracker_lib;
