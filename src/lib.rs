pub mod gxp;
pub mod utils;

pub use gxp::{extract_gxp, remaster_gxp, GxpError};
