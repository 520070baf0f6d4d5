pub mod generation;
pub mod payment;
pub mod response;

pub use generation::*;
pub use payment::*;
pub use response::*;
