pub mod interaction;
pub mod payment;
pub mod ports;
