pub mod actions;
pub mod adb;
pub mod boot;
