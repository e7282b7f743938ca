#![allow(dead_code, unused_imports)]

pub mod app;
pub mod factory;
pub mod logs;

pub use app::{test_config, TestApp};
pub use factory::Factory;
pub use logs::CapturedLogs;
