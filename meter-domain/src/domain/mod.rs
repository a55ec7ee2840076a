mod meter_type;
mod reading;

pub use meter_type::{MeterType, UnknownMeterType};
pub use reading::{Reading, ScmMessage};
