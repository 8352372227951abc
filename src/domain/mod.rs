//! Domain layer: aggregates, value objects, events and delivery profiles.

pub mod aggregates;
pub mod events;
pub mod profile;
pub mod value_objects;
