use super::Runtime;

/// Languages compiled to a binary that runs directly in the container
pub struct NativeRuntime {
    name: &'static str,
    image: &'static str,
    compiler: &'static str,
    object_extensions: Vec<&'static str>,
}

impl NativeRuntime {
    pub fn new(name: &'static str, image: &'static str, compiler: &'static str) -> Self {
        Self {
            name,
            image,
            compiler,
            object_extensions: Vec::new(),
        }
    }

    /// Intermediate files the compiler writes next to the source
    pub fn with_object_files(mut self, extensions: &[&'static str]) -> Self {
        self.object_extensions = extensions.to_vec();
        self
    }

    fn compiler_program(&self) -> &str {
        self.compiler.split_whitespace().next().unwrap_or(self.compiler)
    }
}

impl Runtime for NativeRuntime {
    fn name(&self) -> &str {
        self.name
    }

    fn base_image(&self) -> &str {
        self.image
    }

    fn compile_command(&self, source: &str, artifact: &str) -> Option<String> {
        Some(format!("{} -o {} {}", self.compiler, artifact, source))
    }

    fn execute_command(&self, _source: &str, artifact: &str) -> String {
        format!("./{}", artifact)
    }

    fn leftover_files(&self, source: &str, artifact: &str) -> Vec<String> {
        let stem = source.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(source);
        let mut files = vec![artifact.to_string()];
        files.extend(self.object_extensions.iter().map(|ext| format!("{}{}", stem, ext)));
        files
    }

    fn version_command(&self) -> Vec<String> {
        match self.compiler_program() {
            "go" => vec!["go".to_string(), "version".to_string()],
            program => vec![program.to_string(), "--version".to_string()],
        }
    }
}
