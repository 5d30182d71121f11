pub mod client;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod normalize;
pub mod progress;
pub mod request;
pub mod result;
pub mod stream;
pub mod task;
pub mod ui;

#[cfg(test)]
pub(crate) mod test_support;
