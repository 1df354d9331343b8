use crate::naming::safe_file_name;

/// Placeholder substituted in layout templates.
pub const MODULE_PLACEHOLDER: &str = "{module}";

/// Where module outputs land, relative to the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    /// Directory template, e.g. `{module}` or `Gems/{module}/CSharp`.
    pub module_dir: String,
    /// Manifest file name template, e.g. `{module}.csproj`.
    pub manifest_name: String,
    /// Shared solution, written at the output root.
    pub solution_name: String,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            module_dir: MODULE_PLACEHOLDER.to_string(),
            manifest_name: format!("{MODULE_PLACEHOLDER}.csproj"),
            solution_name: "O3DE.Generated".to_string(),
        }
    }
}

impl OutputLayout {
    pub fn module_dir(&self, module: &str) -> String {
        let dir = expand(&self.module_dir, module);
        let dir = dir.trim_matches('/');
        if dir.is_empty() {
            ".".to_string()
        } else {
            dir.to_string()
        }
    }

    /// Path of a file inside the module directory.
    pub fn module_file(&self, module: &str, file: &str) -> String {
        join(&self.module_dir(module), file)
    }

    pub fn manifest_path(&self, module: &str) -> String {
        self.module_file(module, &expand(&self.manifest_name, module))
    }

    pub fn solution_path(&self) -> String {
        format!("{}.sln", safe_file_name(&self.solution_name))
    }
}

fn expand(template: &str, module: &str) -> String {
    template
        .replace('\\', "/")
        .replace(MODULE_PLACEHOLDER, &safe_file_name(module))
}

fn join(dir: &str, file: &str) -> String {
    if dir == "." {
        file.to_string()
    } else {
        format!("{dir}/{file}")
    }
}

/// Relative path from directory `from_dir` to file `to`, both relative
/// to the same root.
pub fn relative_path(from_dir: &str, to: &str) -> String {
    let from: Vec<&str> = from_dir.split('/').filter(|s| !s.is_empty() && *s != ".").collect();
    let target: Vec<&str> = to.split('/').filter(|s| !s.is_empty() && *s != ".").collect();
    let common = from
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();
    let mut parts: Vec<&str> = vec![".."; from.len() - common];
    parts.extend(&target[common..]);
    parts.join("/")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenSettings {
    pub target_framework: String,
    /// Assembly every generated project references.
    pub core_assembly: String,
    pub core_assembly_path: String,
    /// Namespace of the core assembly, imported by every generated file.
    pub core_namespace: String,
    pub layout: OutputLayout,
    /// Emit `///` XML documentation.
    pub generate_docs: bool,
}

impl Default for CodegenSettings {
    fn default() -> Self {
        Self {
            target_framework: "net8.0".to_string(),
            core_assembly: "O3DE.Sharp.Core".to_string(),
            core_assembly_path: "$(O3DESharpCorePath)/O3DE.Sharp.Core.dll".to_string(),
            core_namespace: "O3DE.Core".to_string(),
            layout: OutputLayout::default(),
            generate_docs: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout() {
        let layout = OutputLayout::default();
        assert_eq!(layout.module_dir("Physics"), "Physics");
        assert_eq!(layout.manifest_path("Physics"), "Physics/Physics.csproj");
        assert_eq!(layout.module_file("Physics", "Enums.cs"), "Physics/Enums.cs");
        assert_eq!(layout.solution_path(), "O3DE.Generated.sln");
    }

    #[test]
    fn templates_substitute_safe_names() {
        let layout = OutputLayout {
            module_dir: "Gems/{module}/CSharp/".into(),
            manifest_name: "O3DE.{module}.csproj".into(),
            solution_name: "All".into(),
        };
        assert_eq!(layout.manifest_path("A:B"), "Gems/A_B/CSharp/O3DE.A_B.csproj");

        let flat = OutputLayout {
            module_dir: "".into(),
            ..OutputLayout::default()
        };
        assert_eq!(flat.manifest_path("Gem"), "Gem.csproj");
    }

    #[test]
    fn relative_paths() {
        assert_eq!(relative_path("Physics", "Core/Core.csproj"), "../Core/Core.csproj");
        assert_eq!(
            relative_path("Gems/A/CSharp", "Gems/B/CSharp/B.csproj"),
            "../../B/CSharp/B.csproj"
        );
        assert_eq!(relative_path(".", "Core.csproj"), "Core.csproj");
        assert_eq!(relative_path("A", "A/Sub/X.csproj"), "Sub/X.csproj");
    }
}
