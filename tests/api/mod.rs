mod auth_tests;
mod health_tests;
mod history_tests;
