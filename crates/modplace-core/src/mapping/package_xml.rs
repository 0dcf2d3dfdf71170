//! `package.xml` manifests.
//!
//! Layout:
//!
//! ```xml
//! <package>
//!   <contents>
//!     <target name="magecommunity">
//!       <dir name="Vendor">
//!         <dir name="Module">
//!           <file name="etc/config.xml"/>
//!         </dir>
//!       </dir>
//!     </target>
//!   </contents>
//! </package>
//! ```
//!
//! Every `<target>` name is a well-known deployment root that maps onto a
//! fixed prefix in the application tree. Packages ship their files in that
//! layout, so each resulting mapping has identical source and target.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{DeployError, DeployResult};

use super::PathMapping;

const DEFAULT_SCOPE: &str = "contents";

/// Application-tree prefix for a manifest target token.
pub fn target_prefix(token: &str) -> Option<&'static str> {
    let prefix = match token {
        "magelocal" => "app/code/local",
        "magecommunity" => "app/code/community",
        "magecore" => "app/code/core",
        "magedesign" => "app/design",
        "mageetc" => "app/etc",
        "magelib" => "lib",
        "magelocale" => "app/locale",
        "magemedia" => "media",
        "mageskin" => "skin",
        "mageweb" => "",
        "magetest" => "tests",
        "mage" => "",
        _ => return None,
    };
    Some(prefix)
}

#[derive(Debug, Clone)]
pub struct PackageXmlParser {
    manifest: PathBuf,
    scope: String,
}

enum Frame {
    Scope,
    Target { prefix: &'static str },
    Dir { name: String, children: usize },
    File,
    Other,
}

impl PackageXmlParser {
    /// `manifest` is relative to `source_root`.
    pub fn new(source_root: &Path, manifest: &str) -> Self {
        Self {
            manifest: source_root.join(manifest),
            scope: DEFAULT_SCOPE.to_string(),
        }
    }

    /// Element directly below the document root that holds `<target>` nodes.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest
    }

    pub fn parse(&self) -> DeployResult<Vec<PathMapping>> {
        let content = fs::read_to_string(&self.manifest).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                DeployError::NotFound {
                    what: "package manifest",
                    path: self.manifest.clone(),
                }
            } else if err.kind() == io::ErrorKind::InvalidData {
                DeployError::parse(&self.manifest, None, "file is not valid UTF-8")
            } else {
                DeployError::filesystem("read", &self.manifest, err)
            }
        })?;
        self.parse_str(&content)
    }

    pub fn parse_str(&self, content: &str) -> DeployResult<Vec<PathMapping>> {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Frame> = Vec::new();
        let mut mappings = Vec::new();

        loop {
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(err) => {
                    let position = reader.buffer_position() as usize;
                    return Err(self.error_at(content, position, err.to_string()));
                }
            };
            let position = reader.buffer_position() as usize;

            match event {
                Event::Start(element) => {
                    let frame = self.open(&element, &stack, &mut mappings, content, position)?;
                    stack.push(frame);
                }
                Event::Empty(element) => {
                    let frame = self.open(&element, &stack, &mut mappings, content, position)?;
                    stack.push(frame);
                    self.close(&mut stack, &mut mappings, content, position)?;
                }
                Event::End(_) => self.close(&mut stack, &mut mappings, content, position)?,
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(self.error_at(content, content.len(), "unexpected end of document"));
        }
        Ok(mappings)
    }

    fn open(
        &self,
        element: &BytesStart<'_>,
        stack: &[Frame],
        mappings: &mut Vec<PathMapping>,
        content: &str,
        position: usize,
    ) -> DeployResult<Frame> {
        let tag = element.name();
        let tag = tag.as_ref();

        let frame = match stack.last() {
            // document root
            None => Frame::Other,
            Some(Frame::Other) if stack.len() == 1 && tag == self.scope.as_bytes() => Frame::Scope,
            Some(Frame::Scope) if tag == b"target" => {
                let token = self.required_name(element, content, position)?;
                let prefix = target_prefix(&token).ok_or_else(|| {
                    self.error_at(content, position, format!("unknown target '{}'", token))
                })?;
                Frame::Target { prefix }
            }
            Some(Frame::Target { .. } | Frame::Dir { .. }) if tag == b"dir" => {
                let name = self.required_name(element, content, position)?;
                Frame::Dir { name, children: 0 }
            }
            Some(Frame::Target { .. } | Frame::Dir { .. }) if tag == b"file" => {
                let name = self.required_name(element, content, position)?;
                let path = node_path(stack, &name);
                mappings.push(self.mapping(&path, content, position)?);
                Frame::File
            }
            _ => Frame::Other,
        };

        Ok(frame)
    }

    fn close(
        &self,
        stack: &mut Vec<Frame>,
        mappings: &mut Vec<PathMapping>,
        content: &str,
        position: usize,
    ) -> DeployResult<()> {
        let frame = stack
            .pop()
            .ok_or_else(|| self.error_at(content, position, "unbalanced closing tag"))?;

        let counts_as_child = matches!(frame, Frame::Dir { .. } | Frame::File);
        if let Frame::Dir { name, children } = frame {
            if children == 0 {
                let path = node_path(stack, &name);
                mappings.push(self.mapping(&path, content, position)?);
            }
        }
        if counts_as_child {
            if let Some(Frame::Dir { children, .. }) = stack.last_mut() {
                *children += 1;
            }
        }
        Ok(())
    }

    fn required_name(
        &self,
        element: &BytesStart<'_>,
        content: &str,
        position: usize,
    ) -> DeployResult<String> {
        for attr in element.attributes() {
            let attr = attr.map_err(|err| self.error_at(content, position, err.to_string()))?;
            if attr.key.as_ref() == b"name" {
                let value = attr
                    .unescape_value()
                    .map_err(|err| self.error_at(content, position, err.to_string()))?;
                if value.trim().is_empty() {
                    break;
                }
                return Ok(value.into_owned());
            }
        }
        Err(self.error_at(
            content,
            position,
            format!(
                "<{}> is missing a name attribute",
                String::from_utf8_lossy(element.name().as_ref())
            ),
        ))
    }

    fn mapping(&self, path: &str, content: &str, position: usize) -> DeployResult<PathMapping> {
        PathMapping::new(path, path)
            .map_err(|err| self.error_at(content, position, err.to_string()))
    }

    fn error_at(&self, content: &str, position: usize, message: impl Into<String>) -> DeployError {
        DeployError::parse(&self.manifest, Some(line_of(content, position)), message)
    }
}

/// Join the target prefix, enclosing directory names and `leaf`.
fn node_path(stack: &[Frame], leaf: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for frame in stack {
        match frame {
            Frame::Target { prefix } if !prefix.is_empty() => parts.push(*prefix),
            Frame::Dir { name, .. } => parts.push(name),
            _ => {}
        }
    }
    parts.push(leaf);
    parts.join("/")
}

fn line_of(content: &str, position: usize) -> usize {
    let end = position.min(content.len());
    content.as_bytes()[..end]
        .iter()
        .filter(|&&byte| byte == b'\n')
        .count()
        + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn parser() -> PackageXmlParser {
        PackageXmlParser::new(Path::new("/pkg"), "package.xml")
    }

    fn pairs(mappings: &[PathMapping]) -> Vec<&str> {
        mappings
            .iter()
            .map(|m| {
                assert_eq!(m.source(), m.target());
                m.target()
            })
            .collect()
    }

    #[test]
    fn test_files_and_dirs_follow_document_order() {
        let xml = r#"<?xml version="1.0"?>
<package>
  <name>Vendor_Module</name>
  <contents>
    <target name="magecommunity">
      <dir name="Vendor">
        <dir name="Module">
          <file name="Model/Observer.php" hash="abc"/>
          <dir name="etc"><file name="config.xml"/></dir>
          <dir name="sql"/>
        </dir>
      </dir>
    </target>
    <target name="mageetc">
      <dir name="modules"><file name="Vendor_Module.xml"/></dir>
    </target>
    <target name="mageweb">
      <file name="robots.txt"/>
    </target>
  </contents>
</package>
"#;
        let mappings = parser().parse_str(xml).unwrap();
        assert_eq!(
            pairs(&mappings),
            vec![
                "app/code/community/Vendor/Module/Model/Observer.php",
                "app/code/community/Vendor/Module/etc/config.xml",
                "app/code/community/Vendor/Module/sql",
                "app/etc/modules/Vendor_Module.xml",
                "robots.txt",
            ]
        );
    }

    #[test]
    fn test_nodes_outside_scope_are_ignored() {
        let xml = r#"<package>
  <target name="magelocal"><file name="stray.php"/></target>
  <contents><target name="magelib"><file name="Foo.php"/></target></contents>
</package>"#;
        let mappings = parser().parse_str(xml).unwrap();
        assert_eq!(pairs(&mappings), vec!["lib/Foo.php"]);
    }

    #[test]
    fn test_custom_scope() {
        let xml = r#"<package><files><target name="mageskin"><file name="a.css"/></target></files></package>"#;
        let mappings = parser().with_scope("files").parse_str(xml).unwrap();
        assert_eq!(pairs(&mappings), vec!["skin/a.css"]);
    }

    #[test]
    fn test_unknown_target_is_parse_error() {
        let xml = "<package>\n<contents>\n<target name=\"magespace\"><file name=\"x\"/></target>\n</contents>\n</package>";
        let err = parser().parse_str(xml).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        let message = err.to_string();
        assert!(message.contains("magespace"), "{}", message);
        assert!(message.contains("package.xml:3"), "{}", message);
    }

    #[test]
    fn test_missing_name_is_parse_error() {
        let xml = r#"<package><contents><target name="magelib"><file/></target></contents></package>"#;
        let err = parser().parse_str(xml).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_malformed_xml_is_parse_error() {
        let xml = r#"<package><contents><target name="magelib"></contents></package>"#;
        let err = parser().parse_str(xml).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_truncated_document_is_parse_error() {
        let xml = r#"<package><contents><target name="magelib">"#;
        let err = parser().parse_str(xml).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_missing_manifest_is_not_found() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        let err = PackageXmlParser::new(tmp.path(), "package.xml")
            .parse()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_target_prefix_table() {
        assert_eq!(target_prefix("magelocal"), Some("app/code/local"));
        assert_eq!(target_prefix("mage"), Some(""));
        assert_eq!(target_prefix("magetest"), Some("tests"));
        assert_eq!(target_prefix("nope"), None);
    }
}
