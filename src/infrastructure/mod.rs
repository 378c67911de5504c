pub mod axum_http;
pub mod cache;
#[cfg(test)]
pub mod memory;
pub mod postgres;
