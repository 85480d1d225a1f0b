pub mod clock;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use timer::{TickStats, TickTimer, Timer};
