//! REST API Test Modules

mod health_tests;
mod retry_tests;
mod session_tests;
mod webhook_tests;
