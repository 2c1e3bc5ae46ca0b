//! XML to structured value conversion
//!
//! [`TreeWalker`] turns one element into a [`Value`], descending into every
//! child:
//! - children become keys (namespace-prefixed when tagging is on), and a later
//!   sibling with the same key replaces an earlier one
//! - unqualified attributes are collected under `@attributes`, always as strings
//! - an element with neither children nor attributes collapses to a scalar
//! - remaining text is kept under `value`

pub mod cast;
pub mod json;

pub use cast::auto_cast;
pub use json::{from_json, to_compact_json, to_pretty_json};

use crate::documents::Element;
use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::value::{Map, Value};
use roxmltree::Node;

/// Key holding attributes of an element
pub const ATTRIBUTES_KEY: &str = "@attributes";

/// Key holding the namespace prefix of a tagged element
pub const NAMESPACE_KEY: &str = "@namespace";

/// Key holding text that sits next to children or attributes
pub const VALUE_KEY: &str = "value";

/// Options applied at every conversion step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionOptions {
    /// Key namespaced children as `prefix:name` and record `@namespace`
    pub namespace_in_tag_name: bool,
    /// Keep text verbatim and never collapse elements to scalars
    pub is_cdata: bool,
}

impl ConversionOptions {
    /// Create options with everything turned off
    pub fn new() -> Self {
        Self::default()
    }

    /// Set namespace tagging
    pub fn with_namespace_in_tag_name(mut self, enabled: bool) -> Self {
        self.namespace_in_tag_name = enabled;
        self
    }

    /// Set CDATA preservation
    pub fn with_cdata(mut self, enabled: bool) -> Self {
        self.is_cdata = enabled;
        self
    }
}

/// Element-to-value converter
#[derive(Debug, Clone)]
pub struct TreeWalker<'l> {
    options: ConversionOptions,
    limits: &'l Limits,
}

/// An element whose children are still being converted
struct Frame<'a, 'input> {
    element: Element<'a, 'input>,
    /// Namespace of the group the element was found in
    namespace: Option<&'a str>,
    depth: usize,
    pending: std::vec::IntoIter<(Option<&'a str>, Node<'a, 'input>)>,
    result: Map,
}

impl<'a, 'input> Frame<'a, 'input> {
    fn new(element: Element<'a, 'input>, namespace: Option<&'a str>, depth: usize) -> Self {
        let pending: Vec<_> = element
            .namespace_groups()
            .into_iter()
            .flat_map(|group| {
                let namespace = group.namespace;
                group.children.into_iter().map(move |node| (namespace, node))
            })
            .collect();

        Self {
            element,
            namespace,
            depth,
            pending: pending.into_iter(),
            result: Map::new(),
        }
    }
}

impl<'l> TreeWalker<'l> {
    /// Create a walker
    pub fn new(options: ConversionOptions, limits: &'l Limits) -> Self {
        Self { options, limits }
    }

    /// Get the options
    pub fn options(&self) -> ConversionOptions {
        self.options
    }

    /// Convert an element (normally the document root) and its subtree
    ///
    /// The subtree is walked with an explicit stack of open elements, so
    /// nesting costs heap rather than call stack. A child that breaks a
    /// limit is logged and left out; the element itself breaking one is an
    /// error.
    pub fn convert(&self, element: &Element<'_, '_>) -> Result<Value> {
        self.enter(element, 1)?;

        let mut open = Vec::new();
        let mut current = Frame::new(*element, None, 1);
        loop {
            if let Some((namespace, node)) = current.pending.next() {
                let child = current.element.wrap(node);
                let depth = current.depth + 1;
                match self.enter(&child, depth) {
                    Ok(()) => {
                        let frame = Frame::new(child, namespace, depth);
                        open.push(std::mem::replace(&mut current, frame));
                    }
                    Err(source) => {
                        let err = Error::ChildConversion {
                            element: child.qualified_name(),
                            source: Box::new(source),
                        };
                        tracing::error!(
                            element = %child.qualified_name(),
                            depth = current.depth,
                            error = %err,
                            "Skipping element due to error"
                        );
                    }
                }
                continue;
            }

            let result = std::mem::take(&mut current.result);
            let value = self.finish(&current.element, result);
            match open.pop() {
                Some(parent) => {
                    let done = std::mem::replace(&mut current, parent);
                    self.attach(&mut current.result, &done.element, done.namespace, value);
                }
                None => return Ok(value),
            }
        }
    }

    fn enter(&self, element: &Element<'_, '_>, depth: usize) -> Result<()> {
        self.limits.check_xml_depth(depth)?;
        self.limits.check_attributes(element.attribute_count())
    }

    fn attach(&self, result: &mut Map, child: &Element<'_, '_>, namespace: Option<&str>, mut entry: Value) {
        let prefix = namespace.map(|_| child.prefix().unwrap_or(""));
        let key = match prefix {
            Some(prefix) if self.options.namespace_in_tag_name && !prefix.is_empty() => {
                format!("{}:{}", prefix, child.local_name())
            }
            _ => child.local_name().to_string(),
        };

        if self.options.namespace_in_tag_name {
            if let (Some(prefix), Value::Object(map)) = (prefix, &mut entry) {
                map.insert(NAMESPACE_KEY.to_string(), Value::from(prefix));
            }
        }

        result.insert(key, entry);
    }

    /// Add attributes and own text to the converted children
    fn finish(&self, element: &Element<'_, '_>, mut result: Map) -> Value {
        let attributes: Map = element
            .attributes()
            .into_iter()
            .map(|(name, value)| (name.to_string(), Value::from(value)))
            .collect();
        if !attributes.is_empty() {
            result.insert(ATTRIBUTES_KEY.to_string(), Value::Object(attributes));
        }

        let text = element.trimmed_text();

        if result.is_empty() && !self.options.is_cdata {
            return auto_cast(&text, false);
        }

        if !text.is_empty() {
            result.insert(VALUE_KEY.to_string(), auto_cast(&text, self.options.is_cdata));
        }

        Value::Object(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::Document;

    fn convert_with(xml: &str, options: ConversionOptions, limits: &Limits) -> Value {
        let doc = Document::parse(xml, limits).unwrap();
        TreeWalker::new(options, limits)
            .convert(&doc.root_element())
            .unwrap()
    }

    fn convert(xml: &str, options: ConversionOptions) -> Value {
        convert_with(xml, options, &Limits::default())
    }

    fn keys(value: &Value) -> Vec<&str> {
        value
            .as_object()
            .unwrap()
            .keys()
            .map(|k| k.as_str())
            .collect()
    }

    #[test]
    fn test_leaf_collapse() {
        let value = convert("<note><to>User</to></note>", ConversionOptions::new());
        assert_eq!(value["to"], Value::from("User"));
    }

    #[test]
    fn test_root_leaf_collapses_to_scalar() {
        assert_eq!(convert("<age>30</age>", ConversionOptions::new()), Value::Int(30));
        assert_eq!(convert("<empty/>", ConversionOptions::new()), Value::Null);
    }

    #[test]
    fn test_attributes_and_children() {
        let xml = r#"<book id="123" genre="fiction"><title>1984</title></book>"#;
        let value = convert(xml, ConversionOptions::new());

        assert_eq!(keys(&value), ["title", "@attributes"]);
        assert_eq!(value["@attributes"]["id"], Value::from("123"));
        assert_eq!(value["@attributes"]["genre"], Value::from("fiction"));
        assert_eq!(value["title"], Value::Int(1984));
    }

    #[test]
    fn test_attribute_values_are_not_cast() {
        let value = convert(r#"<item count="10" on="true"/>"#, ConversionOptions::new());
        assert_eq!(value["@attributes"]["count"], Value::from("10"));
        assert_eq!(value["@attributes"]["on"], Value::from("true"));
    }

    #[test]
    fn test_mixed_content_keeps_value() {
        let value = convert(r#"<price currency="EUR">10.50</price>"#, ConversionOptions::new());
        assert_eq!(keys(&value), ["@attributes", "value"]);
        assert_eq!(value["value"], Value::Float(10.5));
    }

    #[test]
    fn test_last_sibling_wins_at_first_position() {
        let value = convert("<r><a>1</a><b>2</b><a>3</a></r>", ConversionOptions::new());
        assert_eq!(keys(&value), ["a", "b"]);
        assert_eq!(value["a"], Value::Int(3));
    }

    #[test]
    fn test_cdata_mode() {
        let options = ConversionOptions::new().with_cdata(true);
        let value = convert("<message><![CDATA[Some <b>bold</b> text]]></message>", options);
        assert_eq!(value["value"], Value::from("Some <b>bold</b> text"));

        let value = convert("<r><n>10</n><e/></r>", options);
        assert_eq!(value["n"]["value"], Value::from("10"));
        assert!(value["e"].is_empty_object());
    }

    #[test]
    fn test_namespace_tagging() {
        let xml = r#"<root xmlns:h="http://www.w3.org/TR/html4/"><h:title>Header</h:title></root>"#;
        let options = ConversionOptions::new().with_namespace_in_tag_name(true);
        let value = convert(xml, options);
        assert_eq!(value["h:title"], Value::from("Header"));
    }

    #[test]
    fn test_namespace_key_injected_into_objects() {
        let xml = r#"<root xmlns:h="urn:h" xmlns="urn:d"><h:table border="1"><h:tr>x</h:tr></h:table><plain a="b"/></root>"#;
        let options = ConversionOptions::new().with_namespace_in_tag_name(true);
        let value = convert(xml, options);

        assert_eq!(value["h:table"]["@namespace"], Value::from("h"));
        assert_eq!(value["h:table"]["h:tr"], Value::from("x"));
        assert_eq!(value["plain"]["@namespace"], Value::from(""));
    }

    #[test]
    fn test_namespaces_without_tagging_use_local_names() {
        let xml = r#"<root xmlns:h="urn:h"><h:title>Header</h:title><body>b</body></root>"#;
        let value = convert(xml, ConversionOptions::new());
        assert_eq!(keys(&value), ["title", "body"]);
        assert!(value["title"].as_object().is_none());
    }

    #[test]
    fn test_unnamespaced_child_gets_no_namespace_key() {
        let xml = r#"<root xmlns:h="urn:h"><h:t>1</h:t><plain id="x"/></root>"#;
        let options = ConversionOptions::new().with_namespace_in_tag_name(true);
        let value = convert(xml, options);
        assert!(value["plain"].get("@namespace").is_none());
    }

    #[test]
    fn test_too_deep_child_is_skipped() {
        let xml = "<r><ok>1</ok><deep><deeper>x</deeper></deep></r>";
        let doc = Document::parse(xml, &Limits::default()).unwrap();
        let limits = Limits::default().with_max_xml_depth(2);
        let value = TreeWalker::new(ConversionOptions::new(), &limits)
            .convert(&doc.root_element())
            .unwrap();

        assert_eq!(value["ok"], Value::Int(1));
        // `deep` lost its only child, so it collapses like any empty leaf
        assert_eq!(value.get("deep"), Some(&Value::Null));
    }

    #[test]
    fn test_root_attribute_limit_fails() {
        let limits = Limits::default().with_max_attributes(1);
        let doc = Document::parse(r#"<r a="1" b="2"/>"#, &limits).unwrap();
        let result = TreeWalker::new(ConversionOptions::new(), &limits).convert(&doc.root_element());
        assert!(matches!(result, Err(Error::LimitExceeded(_))));
    }

    #[test]
    fn test_child_over_attribute_limit_is_left_out() {
        let limits = Limits::default().with_max_attributes(1);
        let value = convert_with(
            r#"<r><a x="1"/><b x="1" y="2"><c>3</c></b><d>4</d></r>"#,
            ConversionOptions::new(),
            &limits,
        );
        assert_eq!(keys(&value), ["a", "d"]);
    }

    #[test]
    fn test_deep_nesting_at_the_limit_converts() {
        let depth = Limits::default().max_xml_depth;
        let xml = "<a>".repeat(depth - 1) + "<a>leaf</a>" + &"</a>".repeat(depth - 1);
        let mut value = &convert(&xml, ConversionOptions::new());
        for _ in 1..depth - 1 {
            value = &value["a"];
        }
        assert_eq!(value["a"], Value::from("leaf"));
    }

    #[test]
    fn test_whitespace_only_text_is_ignored() {
        let value = convert("<r a=\"1\">\n   \n</r>", ConversionOptions::new());
        assert_eq!(keys(&value), ["@attributes"]);
    }
}
