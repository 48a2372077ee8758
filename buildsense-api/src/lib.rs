pub mod chart;
pub mod form;
pub mod history;
pub mod models;

pub use history::{HISTORY_WINDOW, sensor_history};
