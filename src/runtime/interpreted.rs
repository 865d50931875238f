use super::Runtime;

/// Languages whose interpreter runs the source file directly
pub struct InterpretedRuntime {
    name: &'static str,
    image: &'static str,
    interpreter: &'static str,
}

impl InterpretedRuntime {
    pub fn new(name: &'static str, image: &'static str, interpreter: &'static str) -> Self {
        Self {
            name,
            image,
            interpreter,
        }
    }
}

impl Runtime for InterpretedRuntime {
    fn name(&self) -> &str {
        self.name
    }

    fn base_image(&self) -> &str {
        self.image
    }

    fn compile_command(&self, _source: &str, _artifact: &str) -> Option<String> {
        None
    }

    fn execute_command(&self, source: &str, _artifact: &str) -> String {
        format!("{} {}", self.interpreter, source)
    }

    fn version_command(&self) -> Vec<String> {
        vec![self.interpreter.to_string(), "--version".to_string()]
    }
}
