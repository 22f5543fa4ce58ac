// Declare all modules as public so they can be used by consumers and tests.
pub mod core;
pub mod utils;
