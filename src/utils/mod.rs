pub mod constants;
pub mod dates;
pub mod progress;
pub mod text;

pub use constants::*;
pub use dates::{sas_to_date, stay_days};
pub use progress::ProgressReporter;
