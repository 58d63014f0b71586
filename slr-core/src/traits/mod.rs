pub mod capture_delegate;
pub mod capture_provider;
pub mod device_catalog;
pub mod silence_renderer;
