use super::{InterpretedRuntime, JvmRuntime, NativeRuntime, Runtime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported language: {0}. Valid options: javascript, python, c, cpp, java, go, ruby, rust, php, perl, swift, haskell, r")]
pub struct UnsupportedLanguage(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    Python,
    C,
    Cpp,
    Java,
    Go,
    Ruby,
    Rust,
    Php,
    Perl,
    Swift,
    Haskell,
    R,
}

const ALL: [Language; 13] = [
    Language::JavaScript,
    Language::Python,
    Language::C,
    Language::Cpp,
    Language::Java,
    Language::Go,
    Language::Ruby,
    Language::Rust,
    Language::Php,
    Language::Perl,
    Language::Swift,
    Language::Haskell,
    Language::R,
];

impl Language {
    pub fn all() -> &'static [Language] {
        &ALL
    }

    /// Canonical lowercase identifier, also used in image tags and file names
    pub fn id(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Java => "java",
            Language::Go => "go",
            Language::Ruby => "ruby",
            Language::Rust => "rust",
            Language::Php => "php",
            Language::Perl => "perl",
            Language::Swift => "swift",
            Language::Haskell => "haskell",
            Language::R => "r",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let language = match name.trim().to_lowercase().as_str() {
            "javascript" | "js" | "node" => Language::JavaScript,
            "python" | "py" | "python3" => Language::Python,
            "c" => Language::C,
            "cpp" | "c++" | "cxx" => Language::Cpp,
            "java" => Language::Java,
            "go" | "golang" => Language::Go,
            "ruby" | "rb" => Language::Ruby,
            "rust" | "rs" => Language::Rust,
            "php" => Language::Php,
            "perl" | "pl" => Language::Perl,
            "swift" => Language::Swift,
            "haskell" | "hs" => Language::Haskell,
            "r" => Language::R,
            _ => return None,
        };
        Some(language)
    }

    /// Source file extension including the dot
    pub fn extension(&self) -> &'static str {
        match self {
            Language::JavaScript => ".js",
            Language::Python => ".py",
            Language::C => ".c",
            Language::Cpp => ".cpp",
            Language::Java => ".java",
            Language::Go => ".go",
            Language::Ruby => ".rb",
            Language::Rust => ".rs",
            Language::Php => ".php",
            Language::Perl => ".pl",
            Language::Swift => ".swift",
            Language::Haskell => ".hs",
            Language::R => ".R",
        }
    }

    pub fn runtime(&self) -> Box<dyn Runtime> {
        match self {
            Language::Java => Box::new(JvmRuntime::default()),
            Language::C => Box::new(NativeRuntime::new("C", "gcc:latest", "gcc")),
            Language::Cpp => Box::new(NativeRuntime::new("C++", "gcc:latest", "g++")),
            Language::Go => Box::new(NativeRuntime::new("Go", "golang:1.19", "go build")),
            Language::Rust => Box::new(NativeRuntime::new("Rust", "rust:1.68", "rustc")),
            Language::Swift => Box::new(NativeRuntime::new("Swift", "swift:5.7", "swiftc")),
            Language::Haskell => Box::new(
                NativeRuntime::new("Haskell", "haskell:8.10", "ghc")
                    .with_object_files(&[".hi", ".o"]),
            ),
            Language::JavaScript => Box::new(InterpretedRuntime::new("JavaScript", "node:18", "node")),
            Language::Python => Box::new(InterpretedRuntime::new("Python", "python:3.9", "python3")),
            Language::Ruby => Box::new(InterpretedRuntime::new("Ruby", "ruby:3.0", "ruby")),
            Language::Php => Box::new(InterpretedRuntime::new("PHP", "php:8.0", "php")),
            Language::Perl => Box::new(InterpretedRuntime::new("Perl", "perl:latest", "perl")),
            Language::R => Box::new(InterpretedRuntime::new("R", "rocker/r-ver:4.1.0", "Rscript")),
        }
    }

    /// Local tag of the language's sandbox image
    pub fn image_tag(&self) -> String {
        format!("{}_image", self.id())
    }

    pub fn dockerfile_name(&self) -> String {
        format!("Dockerfile.{}", self.id())
    }
}

impl FromStr for Language {
    type Err = UnsupportedLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::from_name(s).ok_or_else(|| UnsupportedLanguage(s.to_string()))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
