//! Project manifests (`.csproj`) and the shared solution (`.sln`).

use sha2::{Digest, Sha256};

use crate::naming::{escape_xml, safe_file_name};
use crate::settings::CodegenSettings;

/// Project type GUID of C# projects.
const CSHARP_PROJECT_TYPE: &str = "FAE04EC0-301F-11D3-BF4B-00C04F79EFBC";

/// Inputs of one module manifest.
#[derive(Debug, Clone)]
pub struct ManifestSpec<'a> {
    pub module: &'a str,
    pub namespace: &'a str,
    pub version: &'a str,
    /// Direct dependency manifests, relative to this manifest's directory.
    pub references: &'a [String],
}

pub fn project_file(settings: &CodegenSettings, manifest: &ManifestSpec<'_>) -> String {
    let mut out = String::new();
    out.push_str("<Project Sdk=\"Microsoft.NET.Sdk\">\n\n");

    out.push_str("  <PropertyGroup>\n");
    element(&mut out, "TargetFramework", &settings.target_framework);
    element(&mut out, "ImplicitUsings", "enable");
    element(&mut out, "Nullable", "enable");
    element(&mut out, "AssemblyName", &safe_file_name(manifest.module));
    element(&mut out, "RootNamespace", manifest.namespace);
    element(&mut out, "Version", manifest.version);
    // The SDK turns these into the assembly's title and description attributes.
    element(&mut out, "AssemblyTitle", manifest.module);
    element(
        &mut out,
        "Description",
        &format!("C# bindings for the {} gem", manifest.module),
    );
    out.push_str("  </PropertyGroup>\n\n");

    if !manifest.references.is_empty() {
        out.push_str("  <ItemGroup>\n");
        for reference in manifest.references {
            out.push_str(&format!(
                "    <ProjectReference Include=\"{}\" />\n",
                escape_xml(reference)
            ));
        }
        out.push_str("  </ItemGroup>\n\n");
    }

    out.push_str("  <ItemGroup>\n");
    out.push_str(&format!(
        "    <Reference Include=\"{}\">\n",
        escape_xml(&settings.core_assembly)
    ));
    out.push_str(&format!(
        "      <HintPath>{}</HintPath>\n",
        escape_xml(&settings.core_assembly_path)
    ));
    out.push_str("    </Reference>\n");
    out.push_str("  </ItemGroup>\n\n");

    out.push_str("</Project>\n");
    out
}

fn element(out: &mut String, name: &str, value: &str) {
    out.push_str(&format!("    <{name}>{}</{name}>\n", escape_xml(value)));
}

/// Deterministic, upper-case GUID from the first 16 bytes of SHA-256(name).
pub fn project_guid(name: &str) -> String {
    let digest = Sha256::digest(name.as_bytes());
    let hex: String = digest[..16].iter().map(|b| format!("{:02X}", b)).collect();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

/// `(project name, manifest path relative to the solution)` per project.
pub fn solution_file(projects: &[(String, String)]) -> String {
    let mut out = String::new();
    out.push('\n');
    out.push_str("Microsoft Visual Studio Solution File, Format Version 12.00\n");
    out.push_str("# Visual Studio Version 17\n");
    out.push_str("VisualStudioVersion = 17.0.31903.59\n");
    out.push_str("MinimumVisualStudioVersion = 10.0.40219.1\n");

    let guids: Vec<String> = projects.iter().map(|(name, _)| project_guid(name)).collect();
    for ((name, path), guid) in projects.iter().zip(&guids) {
        out.push_str(&format!(
            "Project(\"{{{CSHARP_PROJECT_TYPE}}}\") = \"{name}\", \"{}\", \"{{{guid}}}\"\n",
            path.replace('/', "\\")
        ));
        out.push_str("EndProject\n");
    }

    out.push_str("Global\n");
    out.push_str("\tGlobalSection(SolutionConfigurationPlatforms) = preSolution\n");
    out.push_str("\t\tDebug|Any CPU = Debug|Any CPU\n");
    out.push_str("\t\tRelease|Any CPU = Release|Any CPU\n");
    out.push_str("\tEndGlobalSection\n");
    out.push_str("\tGlobalSection(ProjectConfigurationPlatforms) = postSolution\n");
    for guid in &guids {
        for config in ["Debug", "Release"] {
            out.push_str(&format!(
                "\t\t{{{guid}}}.{config}|Any CPU.ActiveCfg = {config}|Any CPU\n"
            ));
            out.push_str(&format!(
                "\t\t{{{guid}}}.{config}|Any CPU.Build.0 = {config}|Any CPU\n"
            ));
        }
    }
    out.push_str("\tEndGlobalSection\n");
    out.push_str("EndGlobal\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_lists_direct_references_and_core() {
        let settings = CodegenSettings::default();
        let refs = vec!["../AzCore/AzCore.csproj".to_string()];
        let text = project_file(
            &settings,
            &ManifestSpec {
                module: "Physics",
                namespace: "O3DE.Generated.Physics",
                version: "2.0.0",
                references: &refs,
            },
        );
        assert!(text.contains("<TargetFramework>net8.0</TargetFramework>"));
        assert!(text.contains("<AssemblyName>Physics</AssemblyName>"));
        assert!(text.contains("<RootNamespace>O3DE.Generated.Physics</RootNamespace>"));
        assert!(text.contains("<Version>2.0.0</Version>"));
        assert!(text.contains("<AssemblyTitle>Physics</AssemblyTitle>"));
        assert!(text.contains("<Description>C# bindings for the Physics gem</Description>"));
        assert!(text.contains("<ProjectReference Include=\"../AzCore/AzCore.csproj\" />"));
        assert!(text.contains("<Reference Include=\"O3DE.Sharp.Core\">"));
        assert!(text.contains("<HintPath>$(O3DESharpCorePath)/O3DE.Sharp.Core.dll</HintPath>"));
    }

    #[test]
    fn manifest_without_dependencies_has_no_project_references() {
        let text = project_file(
            &CodegenSettings::default(),
            &ManifestSpec {
                module: "Leaf",
                namespace: "Ns.Leaf",
                version: "1.0.0",
                references: &[],
            },
        );
        assert!(!text.contains("ProjectReference"));
    }

    #[test]
    fn guids_are_stable_and_distinct() {
        let a = project_guid("Physics");
        assert_eq!(a, project_guid("Physics"));
        assert_ne!(a, project_guid("Audio"));
        assert_eq!(a.len(), 36);
        assert_eq!(a.matches('-').count(), 4);
        assert!(a.chars().all(|c| c == '-' || c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn solution_lists_every_project() {
        let text = solution_file(&[
            ("AzCore".into(), "AzCore/AzCore.csproj".into()),
            ("Physics".into(), "Physics/Physics.csproj".into()),
        ]);
        let guid = project_guid("Physics");
        assert!(text.contains(&format!(
            "Project(\"{{{CSHARP_PROJECT_TYPE}}}\") = \"Physics\", \"Physics\\Physics.csproj\", \"{{{guid}}}\""
        )));
        assert!(text.contains(&format!("{{{guid}}}.Release|Any CPU.Build.0 = Release|Any CPU")));
        assert_eq!(text.matches("EndProject").count(), 2);
    }
}
