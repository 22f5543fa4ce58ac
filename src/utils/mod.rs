pub mod extensions;
pub mod hidden;

#[cfg(any(test, doctest))]
pub mod test_helpers;
