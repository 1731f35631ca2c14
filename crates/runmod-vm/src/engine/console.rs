//! Side effects of invoked code.

use std::io;
use std::path::Path;
use std::time::Duration;

use runmod_bytecode::Module;

/// Where `print`, `write` and `sleep` go, and who hears about dependency
/// modules being loaded.
pub trait Console {
    /// Write `text` followed by a newline.
    fn print(&mut self, text: &str) -> io::Result<()>;

    /// Write `text` without a newline.
    fn write(&mut self, text: &str) -> io::Result<()>;

    /// Block for `duration`.
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }

    /// A dependency module was loaded from `path`.
    fn module_loaded(&mut self, _module: &Module, _path: &Path) -> io::Result<()> {
        Ok(())
    }
}
