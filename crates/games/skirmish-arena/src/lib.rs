//! Authoritative simulation for the Skirmish arena shooter.
//!
//! A [`World`] holds one room's characters, bullets and obstacles. The host
//! forwards player input with [`World::apply_input`], advances the room with
//! [`tick`], and turns the result into wire payloads with a [`StateCache`].

pub mod ability;
pub mod arena;
pub mod bullet;
pub mod cache;
pub mod character;
pub mod config;
pub mod geometry;
pub mod obstacle;
pub mod tick;
pub mod weapon;
pub mod world;

pub use cache::{Snapshot, StateCache};
pub use config::SimConfig;
pub use tick::{Notice, Notifier, tick};
pub use world::{InputEvent, World};
