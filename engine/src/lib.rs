pub mod countdown;
pub mod levels;
pub mod match_core;
pub mod particles;
pub mod playtest;
pub mod rng;
pub mod state;
