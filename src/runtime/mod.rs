//! Language toolchains and launcher knowledge
//!
//! Each [`Language`] maps to a [`Runtime`] that knows its base image and how
//! to compile and execute a single source file inside that image.

pub mod interpreted;
pub mod jvm;
mod language;
pub mod launch;
pub mod native;

pub use interpreted::InterpretedRuntime;
pub use jvm::JvmRuntime;
pub use language::{Language, UnsupportedLanguage};
pub use launch::{inspect_launch, java_main_class, shell_segments, LaunchCheck};
pub use native::NativeRuntime;

pub trait Runtime: Send + Sync {
    fn name(&self) -> &str;

    /// Image the language's sandbox is built from
    fn base_image(&self) -> &str;

    /// Shell command that turns `source` into `artifact`, if the language compiles
    fn compile_command(&self, source: &str, artifact: &str) -> Option<String>;

    /// Shell command that runs the program
    fn execute_command(&self, source: &str, artifact: &str) -> String;

    /// Files besides the source that compilation leaves in the workspace
    fn leftover_files(&self, _source: &str, _artifact: &str) -> Vec<String> {
        Vec::new()
    }

    /// Argv that prints the toolchain version
    fn version_command(&self) -> Vec<String>;

    /// File stem the source must use, when the language dictates one
    fn required_stem(&self, _code: &str) -> Option<String> {
        None
    }
}
