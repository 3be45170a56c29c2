pub mod clock;
pub mod dir;
pub mod interval;
pub mod logging;
pub mod runtime;
pub mod time;
