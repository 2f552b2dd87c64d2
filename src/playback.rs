pub mod clock;
pub mod ticker;
