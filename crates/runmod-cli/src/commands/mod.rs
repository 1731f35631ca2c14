pub mod entry;
pub mod invoker;
pub mod loader;
pub mod report;
pub mod run;

#[cfg(test)]
mod run_tests;
