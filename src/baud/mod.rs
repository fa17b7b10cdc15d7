//! Baud rate handling: effective rate selection and speed resolution.

pub mod resolver;
pub mod servo;

pub use resolver::{resolve, BaudRateFlag, BaudRateResolver, BAUD_RATE_TOLERANCE, STANDARD_BAUD_RATES};
pub use servo::{select_baud_rate, BAUDNUM_LIMIT};
