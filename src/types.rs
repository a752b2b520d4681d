pub mod push;
pub mod timer;
