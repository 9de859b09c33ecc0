pub mod duration;
pub mod event;
pub mod fraction;
pub mod pitch;
pub mod score;
pub mod token;
