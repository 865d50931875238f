use super::Runtime;
use regex::Regex;
use std::sync::OnceLock;

/// Entry class used when the source declares no public class
pub const DEFAULT_ENTRY_CLASS: &str = "Main";

fn public_class_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)^\s*public\s+(?:(?:final|abstract|sealed|strictfp)\s+)*(?:class|record|enum|interface)\s+([A-Za-z_$][A-Za-z0-9_$]*)",
        )
        .expect("valid regex")
    })
}

/// Name of the first top-level public type in Java source
///
/// Names that cannot double as a shell word and a container name (`$` or a
/// leading `_`) are not reported.
pub fn public_class_name(code: &str) -> Option<String> {
    public_class_regex()
        .captures(code)
        .map(|caps| caps[1].to_string())
        .filter(|name| !name.contains('$') && !name.starts_with('_'))
}

pub struct JvmRuntime {
    image: String,
}

impl JvmRuntime {
    pub fn with_image(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
        }
    }
}

impl Default for JvmRuntime {
    fn default() -> Self {
        Self::with_image("openjdk:17")
    }
}

impl Runtime for JvmRuntime {
    fn name(&self) -> &str {
        "Java"
    }

    fn base_image(&self) -> &str {
        &self.image
    }

    fn compile_command(&self, source: &str, _artifact: &str) -> Option<String> {
        Some(format!("javac {}", source))
    }

    fn execute_command(&self, _source: &str, artifact: &str) -> String {
        format!("java {}", artifact)
    }

    fn leftover_files(&self, _source: &str, artifact: &str) -> Vec<String> {
        vec![format!("{}.class", artifact)]
    }

    fn version_command(&self) -> Vec<String> {
        vec!["java".to_string(), "-version".to_string()]
    }

    /// javac rejects a public class whose file is named differently
    fn required_stem(&self, code: &str) -> Option<String> {
        Some(public_class_name(code).unwrap_or_else(|| DEFAULT_ENTRY_CLASS.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jvm_runtime_name_and_image() {
        let runtime = JvmRuntime::default();
        assert_eq!(runtime.name(), "Java");
        assert_eq!(runtime.base_image(), "openjdk:17");
        assert_eq!(JvmRuntime::with_image("eclipse-temurin:21").base_image(), "eclipse-temurin:21");
    }

    #[test]
    fn test_jvm_commands() {
        let runtime = JvmRuntime::default();
        assert_eq!(
            runtime.compile_command("Main.java", "Main").as_deref(),
            Some("javac Main.java")
        );
        assert_eq!(runtime.execute_command("Main.java", "Main"), "java Main");
        assert_eq!(runtime.leftover_files("Main.java", "Main"), vec!["Main.class"]);
    }

    #[test]
    fn test_public_class_detection() {
        let code = "import java.util.*;\n\npublic final class Solver {\n  public static void main(String[] a) {}\n}\n";
        assert_eq!(public_class_name(code).as_deref(), Some("Solver"));
        assert_eq!(JvmRuntime::default().required_stem(code).as_deref(), Some("Solver"));
    }

    #[test]
    fn test_default_entry_class() {
        let code = "class Hidden { public static void main(String[] a) {} }";
        assert_eq!(public_class_name(code), None);
        assert_eq!(
            JvmRuntime::default().required_stem(code).as_deref(),
            Some(DEFAULT_ENTRY_CLASS)
        );
    }

    #[test]
    fn test_unusable_class_names_fall_back_to_default() {
        for code in ["public class A$B { }", "public class _Hidden { }"] {
            assert_eq!(public_class_name(code), None);
            assert_eq!(
                JvmRuntime::default().required_stem(code).as_deref(),
                Some(DEFAULT_ENTRY_CLASS)
            );
        }
    }
}
