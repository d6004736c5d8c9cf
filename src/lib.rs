//! Parrot library — re-exports modules for integration tests.

pub mod bot;
pub mod config;
pub mod i18n;
pub mod storage;
pub mod telegram;
