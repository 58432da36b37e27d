//! Plugin Manifest - XML 매니페스트 → PluginDescriptor 목록
//!
//! ```xml
//! <plugins>
//!   <plugin groupId="org.example" artifactId="hello" version="1.0"
//!           directDeploy="true" pluginFile="/repo/hello.jar" sourceDirectory="">
//!     <depends-on groupId="org.example" artifactId="api" version="1.0"/>
//!     <config>
//!       <prop name="greeting" value="Hello"/>
//!     </config>
//!     <compile>
//!       <artifact groupId="org.example" artifactId="api" version="1.0" file="/repo/api.jar"/>
//!     </compile>
//!   </plugin>
//! </plugins>
//! ```
//!
//! 요소 검색은 모두 하위 요소 전체(descendants) 기준이다.

use super::descriptor::{PluginDescriptor, Scope};
use crate::artifact::ArtifactRef;
use plexus_foundation::{Error, Result};
use roxmltree::{Document, Node};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 매니페스트 파서
pub struct ManifestParser;

impl ManifestParser {
    /// 파일에서 파싱
    pub fn parse_file(path: &Path) -> Result<Vec<PluginDescriptor>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Parse(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::parse_str(&content).map_err(|e| match e {
            Error::Parse(msg) => Error::Parse(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// 문자열에서 파싱
    ///
    /// 문서 순서대로 `plugin` 요소마다 디스크립터 하나.
    pub fn parse_str(xml: &str) -> Result<Vec<PluginDescriptor>> {
        let document = Document::parse(xml).map_err(|e| Error::Parse(e.to_string()))?;
        Ok(Self::parse_document(&document))
    }

    /// 이미 파싱된 문서에서 읽기. 구조가 유효하면 실패하지 않는다.
    pub fn parse_document(document: &Document<'_>) -> Vec<PluginDescriptor> {
        let descriptors: Vec<_> = elements_named(document.root_element(), "plugin")
            .map(parse_plugin)
            .collect();
        debug!("Parsed {} plugin descriptors", descriptors.len());
        descriptors
    }
}

fn parse_plugin(element: Node<'_, '_>) -> PluginDescriptor {
    let mut artifact = parse_gav(element);
    let plugin_file = attr(element, "pluginFile");
    if !plugin_file.is_empty() {
        artifact = artifact.with_file(plugin_file);
    }

    let mut descriptor = PluginDescriptor::new(artifact);
    descriptor.set_direct_deploy(attr(element, "directDeploy") != "false");

    let source_dir = attr(element, "sourceDirectory").trim();
    if !source_dir.is_empty() {
        descriptor.set_source_directory(Some(PathBuf::from(source_dir)));
    }

    for dep in elements_named(element, "depends-on") {
        descriptor.add_depends_on(parse_gav(dep));
    }

    // 모든 config 블록의 prop 을 하나로 병합 (마지막 값 우선)
    let mut config = HashMap::new();
    for config_elem in elements_named(element, "config") {
        for prop in elements_named(config_elem, "prop") {
            config.insert(attr(prop, "name").to_string(), attr(prop, "value").to_string());
        }
    }
    descriptor.set_config(&config);

    // scope 마다 첫 번째 컨테이너만 읽는다
    for scope in Scope::ALL {
        if let Some(container) = elements_named(element, scope.as_str()).next() {
            for artifact_elem in elements_named(container, "artifact") {
                let mut artifact = parse_gav(artifact_elem);
                let file = attr(artifact_elem, "file");
                if !file.is_empty() {
                    artifact = artifact.with_file(file);
                }
                descriptor.add_classpath_entry(scope, artifact);
            }
        }
    }

    descriptor
}

fn parse_gav(element: Node<'_, '_>) -> ArtifactRef {
    ArtifactRef::new(
        attr(element, "groupId"),
        attr(element, "artifactId"),
        attr(element, "version"),
    )
}

/// 속성 값. 없으면 빈 문자열.
fn attr<'a>(element: Node<'a, '_>, name: &str) -> &'a str {
    element.attribute(name).unwrap_or("")
}

/// `element` 아래(자기 자신 제외)의 이름이 일치하는 요소들, 문서 순서
fn elements_named<'a, 'input: 'a>(
    element: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    element
        .descendants()
        .skip(1)
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}
