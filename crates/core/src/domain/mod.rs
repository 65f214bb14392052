pub mod analysis;
pub mod contract;
pub mod fallback;
pub mod key;
pub mod request;
