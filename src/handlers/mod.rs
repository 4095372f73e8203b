mod camera;
mod checkin;
mod health;
mod intake;
mod queue;
mod staff;
mod vitals;

pub use camera::*;
pub use checkin::*;
pub use health::*;
pub use intake::*;
pub use queue::*;
pub use staff::*;
pub use vitals::*;
