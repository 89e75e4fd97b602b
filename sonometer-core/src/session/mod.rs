pub mod display;
pub mod engine;
pub mod router;
pub mod sonometer;

#[cfg(test)]
pub(crate) mod fake_driver;
