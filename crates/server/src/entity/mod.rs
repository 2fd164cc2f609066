//! SeaORM entities for the care home schema.

pub mod alert;
pub mod resident;
pub mod room;
pub mod sensor_reading;
pub mod user;
