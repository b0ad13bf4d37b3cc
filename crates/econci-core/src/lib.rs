pub mod complexity;
pub mod config_manager;
pub mod eigen;
pub mod error;
pub mod matrix;
pub mod proximity;
pub mod rca;
pub mod specialization;
pub mod table;

pub use complexity::{economic_complexity_index, product_complexity_index};
pub use config_manager::*;
pub use error::*;
pub use matrix::*;
pub use proximity::{density, distance, proximity};
pub use rca::revealed_comparative_advantage;
pub use specialization::{diversity, specialization_matrix, ubiquity, DEFAULT_M_CP_THRESHOLD};
pub use table::*;
