//! In-memory XML tree implementing [`DocumentBackend`].

use std::fs;
use std::io::Cursor;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use super::document::{DocumentBackend, DocumentError, DocumentResult, PathStep, split_path};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => value.clone_into(existing),
            None => self.attributes.push((name.to_owned(), value.to_owned())),
        }
    }

    /// The `position`-th (1-based) child called `name`.
    #[must_use]
    pub fn child(&self, name: &str, position: usize) -> Option<&Element> {
        self.children
            .iter()
            .filter(|c| c.name == name)
            .nth(position.checked_sub(1)?)
    }

    fn child_mut(&mut self, name: &str, position: usize) -> Option<&mut Element> {
        self.children
            .iter_mut()
            .filter(|c| c.name == name)
            .nth(position.checked_sub(1)?)
    }

    #[must_use]
    pub fn count_children(&self, name: &str) -> usize {
        self.children.iter().filter(|c| c.name == name).count()
    }
}

/// Parsed XML document with a single root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    root: Element,
}

impl XmlDocument {
    /// Creates a document holding only an empty root element.
    #[must_use]
    pub fn with_root(name: impl Into<String>) -> Self {
        Self {
            root: Element::new(name),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Parses XML text.
    pub fn parse_str(input: &str) -> DocumentResult<Self> {
        let mut reader = Reader::from_str(input);
        reader.trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(element_from_start(&start)?),
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| DocumentError::Malformed("unbalanced end tag".to_owned()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(text.unescape()?.trim());
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        let raw = data.into_inner();
                        let text = std::str::from_utf8(&raw)
                            .map_err(|err| DocumentError::Malformed(err.to_string()))?;
                        current.text.push_str(text.trim());
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(DocumentError::Malformed(format!(
                "unclosed element `{}`",
                stack.last().map_or("", |e| e.name.as_str())
            )));
        }
        let root = root.ok_or_else(|| DocumentError::Malformed("no root element".to_owned()))?;
        log::debug!("parsed document with root `{}`", root.name);
        Ok(Self { root })
    }

    pub fn from_file(path: impl AsRef<Path>) -> DocumentResult<Self> {
        let input = fs::read_to_string(path)?;
        Self::parse_str(&input)
    }

    /// Serializes the tree with four-space indentation.
    pub fn to_xml_string(&self) -> DocumentResult<String> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 4);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        write_element(&mut writer, &self.root)?;
        let bytes = writer.into_inner().into_inner();
        String::from_utf8(bytes).map_err(|err| DocumentError::Malformed(err.to_string()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> DocumentResult<()> {
        fs::write(path, self.to_xml_string()?)?;
        Ok(())
    }

    fn find(&self, path: &str) -> DocumentResult<&Element> {
        let steps = split_path(path)?;
        let missing = || DocumentError::MissingElement {
            path: path.to_owned(),
        };
        let (first, rest) = steps.split_first().ok_or_else(missing)?;
        if !root_matches(&self.root, first) {
            return Err(missing());
        }
        rest.iter().try_fold(&self.root, |node, step| {
            node.child(step.name, step.position).ok_or_else(missing)
        })
    }

    /// Walks to `path`, appending missing elements. A missing element can
    /// only be created directly after its last existing sibling.
    fn find_or_create(&mut self, path: &str) -> DocumentResult<&mut Element> {
        let steps = split_path(path)?;
        let (first, rest) = steps.split_first().ok_or_else(|| DocumentError::MissingElement {
            path: path.to_owned(),
        })?;
        if !root_matches(&self.root, first) {
            return Err(DocumentError::InvalidPath {
                path: path.to_owned(),
                reason: format!("root element is `{}`", self.root.name),
            });
        }

        let mut node = &mut self.root;
        for step in rest {
            let existing = node.count_children(step.name);
            if step.position > existing + 1 {
                return Err(DocumentError::InvalidPath {
                    path: path.to_owned(),
                    reason: format!(
                        "cannot create `{}[{}]` with only {existing} siblings",
                        step.name, step.position
                    ),
                });
            }
            if step.position == existing + 1 {
                node.children.push(Element::new(step.name));
            }
            node = node
                .child_mut(step.name, step.position)
                .ok_or_else(|| DocumentError::MissingElement {
                    path: path.to_owned(),
                })?;
        }
        Ok(node)
    }
}

impl DocumentBackend for XmlDocument {
    fn check_element(&self, path: &str) -> bool {
        self.find(path).is_ok()
    }

    fn text(&self, path: &str) -> DocumentResult<String> {
        Ok(self.find(path)?.text.trim().to_owned())
    }

    fn attribute(&self, path: &str, name: &str) -> DocumentResult<String> {
        self.find(path)?
            .attribute(name)
            .map(str::to_owned)
            .ok_or_else(|| DocumentError::MissingAttribute {
                path: path.to_owned(),
                name: name.to_owned(),
            })
    }

    fn named_child_count(&self, path: &str, name: &str) -> usize {
        self.find(path).map_or(0, |e| e.count_children(name))
    }

    fn set_text(&mut self, path: &str, value: &str) -> DocumentResult<()> {
        let element = self.find_or_create(path)?;
        value.clone_into(&mut element.text);
        Ok(())
    }

    fn set_attribute(&mut self, path: &str, name: &str, value: &str) -> DocumentResult<()> {
        self.find_or_create(path)?.set_attribute(name, value);
        Ok(())
    }
}

fn root_matches(root: &Element, step: &PathStep<'_>) -> bool {
    root.name == step.name && step.position == 1
}

fn element_from_start(start: &BytesStart<'_>) -> DocumentResult<Element> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|err| DocumentError::Malformed(err.to_string()))?
        .to_owned();
    let mut element = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| DocumentError::Malformed(err.to_string()))?
            .to_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> DocumentResult<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_some() {
                return Err(DocumentError::Malformed("multiple root elements".to_owned()));
            }
            *root = Some(element);
        }
    }
    Ok(())
}

fn write_element(writer: &mut Writer<Cursor<Vec<u8>>>, element: &Element) -> DocumentResult<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() && element.text.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if !element.text.is_empty() {
        writer.write_event(Event::Text(BytesText::new(&element.text)))?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<cpacs>
    <wings>
        <wing uID="W1" symmetry="x-z-plane">
            <name>Main &amp; wing</name>
            <pointList><x>0;0.5;1</x></pointList>
        </wing>
        <wing uID="W2"/>
    </wings>
</cpacs>"#;

    #[test]
    fn reads_text_attributes_and_counts() {
        let doc = XmlDocument::parse_str(SAMPLE).unwrap();
        assert_eq!(doc.text("/cpacs/wings/wing/name").unwrap(), "Main & wing");
        assert_eq!(doc.attribute("/cpacs/wings/wing[2]", "uID").unwrap(), "W2");
        assert_eq!(doc.named_child_count("/cpacs/wings", "wing"), 2);
        assert_eq!(doc.named_child_count("/cpacs/fuselages", "fuselage"), 0);
        assert_eq!(doc.vector("/cpacs/wings/wing/pointList/x").unwrap(), vec![0.0, 0.5, 1.0]);
        assert!(!doc.check_element("/cpacs/wings/wing[3]"));
        assert!(!doc.check_element("/other/wings"));
    }

    #[test]
    fn missing_and_malformed_values_are_typed_errors() {
        let doc = XmlDocument::parse_str(SAMPLE).unwrap();
        assert!(matches!(
            doc.double("/cpacs/wings/wing/name"),
            Err(DocumentError::InvalidNumber { .. })
        ));
        assert!(matches!(
            doc.text("/cpacs/wings/wing/length"),
            Err(DocumentError::MissingElement { .. })
        ));
        assert!(matches!(
            doc.attribute("/cpacs/wings/wing", "parentUID"),
            Err(DocumentError::MissingAttribute { .. })
        ));
        assert_eq!(doc.optional_double("/cpacs/wings/wing/name"), None);
    }

    #[test]
    fn writes_create_missing_elements_and_roundtrip() {
        let mut doc = XmlDocument::parse_str(SAMPLE).unwrap();
        doc.set_point("/cpacs/wings/wing[2]/transformation/translation", crate::geom::Point3::new(1.0, 2.5, -3.0))
            .unwrap();
        doc.set_attribute("/cpacs/wings/wing[3]", "uID", "W3").unwrap();
        assert!(doc.set_text("/cpacs/wings/wing[5]/name", "gap").is_err());

        let text = doc.to_xml_string().unwrap();
        let reread = XmlDocument::parse_str(&text).unwrap();
        assert_eq!(reread, doc);
        assert_eq!(
            reread.point("/cpacs/wings/wing[2]/transformation/translation").unwrap(),
            crate::geom::Point3::new(1.0, 2.5, -3.0)
        );
        assert_eq!(reread.attribute("/cpacs/wings/wing[3]", "uID").unwrap(), "W3");
    }

    #[test]
    fn rejects_unbalanced_documents() {
        assert!(XmlDocument::parse_str("<a><b></a>").is_err());
        assert!(XmlDocument::parse_str("").is_err());
    }
}
