//! Unit test modules.

mod support;

mod session_controller_test;
