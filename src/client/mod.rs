pub mod payment;

pub use payment::{payment_units, PaymentClient};
