// src/gps/mod.rs
//! NMEA sentence handling and navigation state

pub mod data;
pub mod dispatch;
pub mod nmea;
pub mod sentence;

pub use data::{NavState, Navigation};
pub use dispatch::{Dispatch, HandlerRegistry, SentenceHandler};
