//! Manifest inspection commands: `order`, `inspect`, `impact`
//!
//! 각 명령은 출력할 텍스트를 만들어 돌려주고, 출력은 `main` 이 한다.

use anyhow::{bail, Context};
use plexus_core::{ArtifactKey, DependencySorter, ManifestParser, PluginDescriptor};
use std::fmt::Write;
use std::path::Path;

fn parse(manifest: &Path) -> anyhow::Result<Vec<PluginDescriptor>> {
    ManifestParser::parse_file(manifest)
        .with_context(|| format!("Failed to parse manifest {}", manifest.display()))
}

/// 배포 순서
pub fn order(manifest: &Path) -> anyhow::Result<String> {
    let descriptors = parse(manifest)?;
    let outcome = DependencySorter::sort_with_report(&descriptors);

    let mut out = String::new();
    writeln!(out, "Deployment order ({} plugins):", outcome.order.len())?;
    for (i, descriptor) in outcome.order.iter().enumerate() {
        let mode = if descriptor.is_development_mode() {
            " [dev]"
        } else {
            ""
        };
        writeln!(out, "  {:>3}. {}{}", i + 1, descriptor.coordinates(), mode)?;
    }

    if outcome.has_cycles() {
        writeln!(out)?;
        writeln!(out, "Accepted dependency cycles (edge skipped):")?;
        for (from, to) in &outcome.cycles {
            writeln!(out, "  {} -> {}", from, to)?;
        }
    }
    Ok(out)
}

/// 디스크립터 JSON
pub fn inspect(manifest: &Path) -> anyhow::Result<String> {
    let descriptors = parse(manifest)?;
    Ok(serde_json::to_string_pretty(&descriptors)?)
}

/// 구조적 부모/자식과 변경 영향 범위
pub fn impact(manifest: &Path, key: &str) -> anyhow::Result<String> {
    let descriptors = parse(manifest)?;
    let key: ArtifactKey = key.parse()?;

    let Some(target) = descriptors.iter().find(|d| d.key() == key) else {
        bail!("Plugin {} is not declared in {}", key, manifest.display());
    };

    let mut out = String::new();
    section(&mut out, "Parents (compile classpath)", &DependencySorter::parents(target, &descriptors))?;
    section(&mut out, "Children", &DependencySorter::children(target, &descriptors))?;
    section(&mut out, "Impacted by a change", &DependencySorter::impacted_by(target, &descriptors))?;
    Ok(out)
}

fn section(out: &mut String, title: &str, plugins: &[&PluginDescriptor]) -> std::fmt::Result {
    writeln!(out, "{}:", title)?;
    if plugins.is_empty() {
        writeln!(out, "  (none)")?;
    }
    for plugin in plugins {
        writeln!(out, "  {}", plugin.coordinates())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
        <plugins>
          <plugin groupId="org.example" artifactId="app" version="1.0">
            <depends-on groupId="org.example" artifactId="api" version="1.0"/>
            <compile>
              <artifact groupId="org.example" artifactId="api" version="1.0"/>
            </compile>
          </plugin>
          <plugin groupId="org.example" artifactId="web" version="1.0">
            <compile>
              <artifact groupId="org.example" artifactId="app" version="1.0"/>
            </compile>
          </plugin>
          <plugin groupId="org.example" artifactId="api" version="1.0"/>
        </plugins>
    "#;

    fn manifest(xml: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugins.xml");
        std::fs::write(&path, xml).unwrap();
        (dir, path)
    }

    #[test]
    fn test_order_lists_dependencies_first() {
        let (_dir, path) = manifest(MANIFEST);
        let out = order(&path).unwrap();

        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], "Deployment order (3 plugins):");
        assert_eq!(lines[1].trim(), "1. org.example:api:1.0");
        assert_eq!(lines[2].trim(), "2. org.example:app:1.0");
        assert_eq!(lines[3].trim(), "3. org.example:web:1.0");
        assert!(!out.contains("cycles"));
    }

    #[test]
    fn test_order_reports_cycles() {
        let (_dir, path) = manifest(
            r#"<plugins>
                 <plugin groupId="g" artifactId="a" version="1">
                   <depends-on groupId="g" artifactId="b" version="1"/>
                 </plugin>
                 <plugin groupId="g" artifactId="b" version="1">
                   <depends-on groupId="g" artifactId="a" version="1"/>
                 </plugin>
               </plugins>"#,
        );
        let out = order(&path).unwrap();

        assert!(out.contains("Deployment order (2 plugins):"));
        assert!(out.contains("Accepted dependency cycles"));
        assert!(out.contains("g:b -> g:a"));
    }

    #[test]
    fn test_inspect_is_descriptor_json() {
        let (_dir, path) = manifest(MANIFEST);
        let json: serde_json::Value = serde_json::from_str(&inspect(&path).unwrap()).unwrap();

        let plugins = json.as_array().unwrap();
        assert_eq!(plugins.len(), 3);
        assert_eq!(plugins[0]["artifactId"], "app");
        assert_eq!(plugins[2]["artifactId"], "api");
    }

    #[test]
    fn test_impact_sections() {
        let (_dir, path) = manifest(MANIFEST);
        let out = impact(&path, "org.example:api").unwrap();

        assert_eq!(
            out,
            "Parents (compile classpath):\n  (none)\n\
             Children:\n  org.example:app:1.0\n\
             Impacted by a change:\n  org.example:app:1.0\n  org.example:web:1.0\n"
        );
    }

    #[test]
    fn test_impact_unknown_plugin() {
        let (_dir, path) = manifest(MANIFEST);
        let err = impact(&path, "org.example:nope").unwrap_err();
        assert!(err.to_string().contains("not declared"));
        assert!(impact(&path, "garbage").is_err());
    }

    #[test]
    fn test_missing_manifest() {
        let err = order(Path::new("/nonexistent/plugins.xml")).unwrap_err();
        assert!(err.to_string().contains("Failed to parse manifest"));
    }
}
