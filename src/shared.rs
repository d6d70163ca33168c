pub mod address;
pub mod rpc;
pub mod units;
