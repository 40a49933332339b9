#[macro_use]
extern crate log;

use rand::rngs::ThreadRng;
use std::cell::RefCell;

pub mod block;
pub mod command;
pub mod entity;
pub mod item;
pub mod net;
pub mod player;
pub mod world;

thread_local!(pub(crate) static RNG: RefCell<ThreadRng> = RefCell::new(rand::thread_rng()));
