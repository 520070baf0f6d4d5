pub mod x402;

pub use x402::{payment_reference, PaymentGate, PAYMENT_HEADER};
