#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Assembler for RMOD modules.
//!
//! Turns `.rasm` source into module bytes:
//!
//! ```text
//! .module TestLibrary
//! .type TestLibrary.ClassTwo
//!   .routine public static void DisplaySomethingOnScreen()
//!     push "Hello!"
//!     print
//!     ret
//!   .end
//! .end
//! ```

mod error;
mod lexer;
mod parser;


pub use error::{AsmError, AsmErrorKind};
pub use parser::parse;

/// Assemble source into module bytes.
pub fn assemble(source: &str) -> Result<Vec<u8>, AsmError> {
    let builder = parse(source)?;
    let bytes = builder.emit()?;
    tracing::debug!(module = builder.name(), size = bytes.len(), "assembled module");
    Ok(bytes)
}
