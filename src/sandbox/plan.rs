//! Per-execution file names, container script and docker arguments

use super::SandboxError;
use crate::runtime::Language;
use std::path::Path;
use uuid::Uuid;

/// Program to run in a language sandbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub language: Language,
    pub code: String,
    pub stdin: Option<String>,
}

impl ExecutionRequest {
    pub fn new(language: Language, code: impl Into<String>) -> Self {
        Self {
            language,
            code: code.into(),
            stdin: None,
        }
    }

    /// Resolve a language name, failing before anything touches the workspace
    pub fn from_name(language: &str, code: impl Into<String>) -> Result<Self, SandboxError> {
        let language = Language::from_name(language)
            .ok_or_else(|| SandboxError::UnsupportedLanguage(language.to_string()))?;
        Ok(Self::new(language, code))
    }

    /// Empty input is treated as no input
    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        let stdin = stdin.into();
        self.stdin = (!stdin.is_empty()).then_some(stdin);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub language: Language,
    /// Artifact name; also the container name
    pub stem: String,
    pub source_file: String,
    pub input_file: Option<String>,
    pub output_file: String,
    pub error_file: String,
    pub image_tag: String,
    /// Command line handed to `/bin/bash -c` inside the container
    pub script: String,
    /// Compiler outputs to delete afterwards
    pub leftovers: Vec<String>,
}

impl ExecutionPlan {
    pub fn new(request: &ExecutionRequest, timeout_secs: u64) -> Self {
        let runtime = request.language.runtime();
        let stem = runtime
            .required_stem(&request.code)
            .unwrap_or_else(|| format!("temp_{}_{}", request.language.id(), Uuid::new_v4()));
        Self::with_stem(request, stem, timeout_secs)
    }

    pub fn with_stem(request: &ExecutionRequest, stem: impl Into<String>, timeout_secs: u64) -> Self {
        let stem = stem.into();
        let language = request.language;
        let runtime = language.runtime();

        let source_file = format!("{}{}", stem, language.extension());
        let input_file = request.stdin.as_ref().map(|_| format!("{}_input.txt", stem));
        let output_file = format!("{}_output.txt", stem);
        let error_file = format!("{}_error.txt", stem);

        let timeout = format!("timeout --signal=SIGKILL {}s", timeout_secs);
        let mut script = String::new();
        if let Some(compile) = runtime.compile_command(&source_file, &stem) {
            script.push_str(&format!("{} {} 2>{} && ", timeout, compile, error_file));
        }
        script.push_str(&format!("{} {}", timeout, runtime.execute_command(&source_file, &stem)));
        if let Some(input) = &input_file {
            script.push_str(&format!(" < {}", input));
        }
        script.push_str(&format!(" > {} 2>{}", output_file, error_file));

        let leftovers = runtime.leftover_files(&source_file, &stem);

        Self {
            language,
            image_tag: language.image_tag(),
            stem,
            source_file,
            input_file,
            output_file,
            error_file,
            script,
            leftovers,
        }
    }

    /// Arguments for `docker run`, with the workspace mounted at `workdir`
    pub fn docker_args(&self, workspace: &Path, workdir: &str, memory_limit: &str) -> Vec<String> {
        vec![
            "run".to_string(),
            "--rm".to_string(),
            "--name".to_string(),
            self.stem.clone(),
            "-v".to_string(),
            format!("{}:{}", workspace.display(), workdir),
            "-w".to_string(),
            workdir.to_string(),
            format!("--memory={}", memory_limit),
            format!("--memory-swap={}", memory_limit),
            self.image_tag.clone(),
            "/bin/bash".to_string(),
            "-c".to_string(),
            self.script.clone(),
        ]
    }

    /// Every file the execution may leave in the workspace
    pub fn workspace_files(&self) -> Vec<String> {
        let mut files = vec![self.source_file.clone()];
        files.extend(self.input_file.iter().cloned());
        files.push(self.output_file.clone());
        files.push(self.error_file.clone());
        files.extend(self.leftovers.iter().cloned());
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_language() {
        let err = ExecutionRequest::from_name("lua", "print(1)").unwrap_err();
        assert!(matches!(err, SandboxError::UnsupportedLanguage(ref l) if l == "lua"));
    }

    #[test]
    fn test_empty_stdin_is_none() {
        let request = ExecutionRequest::new(Language::Python, "print(1)").with_stdin("");
        assert_eq!(request.stdin, None);
    }

    #[test]
    fn test_java_stem_is_public_class() {
        let request = ExecutionRequest::new(
            Language::Java,
            "public class Solution { public static void main(String[] a) {} }",
        );
        let plan = ExecutionPlan::new(&request, 30);
        assert_eq!(plan.stem, "Solution");
        assert_eq!(plan.source_file, "Solution.java");
        assert_eq!(plan.leftovers, vec!["Solution.class"]);

        let plan = ExecutionPlan::new(&ExecutionRequest::new(Language::Java, "class X {}"), 30);
        assert_eq!(plan.stem, "Main");
    }

    #[test]
    fn test_java_dollar_class_uses_default_stem() {
        let request = ExecutionRequest::new(Language::Java, "public class A$B { public static void main(String[] a) {} }");
        let plan = ExecutionPlan::new(&request, 30);
        assert_eq!(plan.stem, "Main");
        assert!(!plan.docker_args(Path::new("/tmp/ws"), "/usr/src/app", "128m").iter().any(|a| a.contains('$')));
    }

    #[test]
    fn test_generated_stem_is_unique() {
        let request = ExecutionRequest::new(Language::C, "int main(){}");
        let a = ExecutionPlan::new(&request, 30);
        let b = ExecutionPlan::new(&request, 30);
        assert!(a.stem.starts_with("temp_c_"));
        assert_ne!(a.stem, b.stem);
    }

    #[test]
    fn test_compiled_script() {
        let request = ExecutionRequest::new(Language::Cpp, "int main(){}").with_stdin("1 2\n");
        let plan = ExecutionPlan::with_stem(&request, "temp_cpp_1", 30);
        assert_eq!(
            plan.script,
            "timeout --signal=SIGKILL 30s g++ -o temp_cpp_1 temp_cpp_1.cpp 2>temp_cpp_1_error.txt && \
             timeout --signal=SIGKILL 30s ./temp_cpp_1 < temp_cpp_1_input.txt > temp_cpp_1_output.txt 2>temp_cpp_1_error.txt"
        );
        assert_eq!(plan.image_tag, "cpp_image");
    }

    #[test]
    fn test_interpreted_script_without_stdin() {
        let request = ExecutionRequest::new(Language::Python, "print(1)");
        let plan = ExecutionPlan::with_stem(&request, "temp_python_1", 5);
        assert_eq!(
            plan.script,
            "timeout --signal=SIGKILL 5s python3 temp_python_1.py > temp_python_1_output.txt 2>temp_python_1_error.txt"
        );
        assert_eq!(plan.input_file, None);
    }

    #[test]
    fn test_docker_args() {
        let request = ExecutionRequest::new(Language::Go, "package main");
        let plan = ExecutionPlan::with_stem(&request, "temp_go_1", 30);
        let args = plan.docker_args(Path::new("/srv/work"), "/usr/src/app", "512m");
        assert_eq!(
            &args[..11],
            &[
                "run",
                "--rm",
                "--name",
                "temp_go_1",
                "-v",
                "/srv/work:/usr/src/app",
                "-w",
                "/usr/src/app",
                "--memory=512m",
                "--memory-swap=512m",
                "go_image",
            ]
        );
        assert_eq!(&args[11..13], &["/bin/bash", "-c"]);
        assert_eq!(args[13], plan.script);
    }

    #[test]
    fn test_workspace_files_include_leftovers() {
        let request = ExecutionRequest::new(Language::Haskell, "main = pure ()").with_stdin("x");
        let plan = ExecutionPlan::with_stem(&request, "temp_haskell_1", 30);
        assert_eq!(
            plan.workspace_files(),
            vec![
                "temp_haskell_1.hs",
                "temp_haskell_1_input.txt",
                "temp_haskell_1_output.txt",
                "temp_haskell_1_error.txt",
                "temp_haskell_1",
                "temp_haskell_1.hi",
                "temp_haskell_1.o",
            ]
        );
    }
}
