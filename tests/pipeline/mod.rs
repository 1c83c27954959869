mod delivery_tests;
mod session_tests;
