//! DTD validation
//!
//! The DOCTYPE is located in the prolog; its internal subset and any local
//! external subset are parsed into element and attribute-list declarations,
//! which are then checked against the parsed document.

use super::models::{match_content, Occurs, Particle, Term};
use super::validation::{DocumentValidator, ValidationContext, ValidationReport};
use crate::documents::{doctype_span, Document};
use crate::error::{Error, Result, DTD_VALIDATION_FAILED};
use crate::limits::Limits;
use crate::loaders::Loader;
use crate::locations::Location;
use crate::names;
use crate::namespaces::qualified_name;
use indexmap::IndexMap;
use roxmltree::Node;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Content specification of an `<!ELEMENT>` declaration
#[derive(Debug, Clone, PartialEq)]
pub enum ContentSpec {
    /// `EMPTY`
    Empty,
    /// `ANY`
    Any,
    /// `(#PCDATA | a | b)*`
    Mixed(Vec<String>),
    /// Element-only content
    Children(Particle<String>),
}

/// Declared type of an attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeType {
    /// `CDATA`
    CData,
    /// `ID`
    Id,
    /// `IDREF`
    IdRef,
    /// `IDREFS`
    IdRefs,
    /// `ENTITY`
    Entity,
    /// `ENTITIES`
    Entities,
    /// `NMTOKEN`
    NmToken,
    /// `NMTOKENS`
    NmTokens,
    /// `NOTATION (a | b)`
    Notation(Vec<String>),
    /// `(a | b)`
    Enumeration(Vec<String>),
}

impl AttributeType {
    fn is_tokenized(&self) -> bool {
        !matches!(self, AttributeType::CData)
    }
}

/// Default declaration of an attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultDecl {
    /// `#REQUIRED`
    Required,
    /// `#IMPLIED`
    Implied,
    /// `#FIXED "value"`
    Fixed(String),
    /// `"value"`
    Value(String),
}

/// One attribute of an `<!ATTLIST>` declaration
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDecl {
    /// Attribute name as written
    pub name: String,
    /// Declared type
    pub kind: AttributeType,
    /// Default declaration
    pub default: DefaultDecl,
}

/// External identifier of a DOCTYPE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalId {
    /// Public identifier, if any
    pub public_id: Option<String>,
    /// System literal
    pub system_id: String,
}

/// A parsed document type definition
#[derive(Debug, Clone, Default)]
pub struct Dtd {
    /// Name the root element must have
    pub name: String,
    /// External subset reference
    pub external_id: Option<ExternalId>,
    /// Element declarations by name
    pub elements: HashMap<String, ContentSpec>,
    /// Attribute declarations by element name, in declaration order
    pub attributes: HashMap<String, IndexMap<String, AttributeDecl>>,
    /// Problems that did not stop parsing
    pub warnings: Vec<String>,
}

impl Dtd {
    /// Read the DOCTYPE of `xml`, returning `None` when there is none
    pub fn from_document(xml: &str, loader: &Loader) -> Result<Option<Self>> {
        let doctype = match doctype_span(xml) {
            Some(span) => &xml[span.start + "<!DOCTYPE".len()..span.end - 1],
            None => return Ok(None),
        };

        let mut parser = DeclParser::new(doctype);
        parser.skip_ws();
        let name = parser.name()?.to_string();
        parser.skip_ws();
        let external_id = parser.external_id()?;
        parser.skip_ws();

        let mut dtd = Dtd {
            name,
            external_id,
            ..Dtd::default()
        };

        if parser.eat("[") {
            let rest = parser.rest();
            let end = rest
                .rfind(']')
                .ok_or_else(|| Error::Schema("unterminated internal subset".to_string()))?;
            dtd.parse_subset(&rest[..end])?;
        }

        // Internal declarations take precedence, so the external subset is read last.
        if let Some(external) = dtd.external_id.clone() {
            let location = Location::from_str(&external.system_id)?;
            let subset = loader.load(&location).map_err(|e| {
                Error::Schema(format!(
                    "failed to load external entity \"{}\": {}",
                    external.system_id, e
                ))
            })?;
            dtd.parse_subset(&subset)?;
        }

        Ok(Some(dtd))
    }

    /// Parse declarations from a DTD subset
    pub fn parse_subset(&mut self, subset: &str) -> Result<()> {
        let mut parser = DeclParser::new(subset);

        loop {
            parser.skip_ws();
            if parser.at_end() {
                return Ok(());
            }

            if parser.eat("<!--") {
                parser.skip_past("-->")?;
            } else if parser.eat("<?") {
                parser.skip_past("?>")?;
            } else if parser.eat("<!ELEMENT") {
                self.parse_element_decl(&mut parser)?;
            } else if parser.eat("<!ATTLIST") {
                self.parse_attlist_decl(&mut parser)?;
            } else if parser.eat("<!ENTITY") || parser.eat("<!NOTATION") {
                parser.skip_decl()?;
            } else if parser.eat("<![") {
                self.warnings
                    .push("conditional sections are not supported and were skipped".to_string());
                parser.skip_past("]]>")?;
            } else if parser.eat("%") {
                let name = parser.name()?.to_string();
                parser.expect(";")?;
                self.warnings.push(format!(
                    "parameter entity reference %{}; was not expanded",
                    name
                ));
            } else {
                return Err(parser.error("expected a markup declaration"));
            }
        }
    }

    fn parse_element_decl(&mut self, parser: &mut DeclParser<'_>) -> Result<()> {
        parser.require_ws()?;
        let name = parser.name()?.to_string();
        parser.require_ws()?;

        let spec = if parser.eat("EMPTY") {
            ContentSpec::Empty
        } else if parser.eat("ANY") {
            ContentSpec::Any
        } else {
            parser.expect("(")?;
            parser.skip_ws();
            if parser.eat("#PCDATA") {
                parser.mixed()?
            } else {
                let term = parser.group_body()?;
                let occurs = Occurs::from_indicator(parser.indicator());
                ContentSpec::Children(Particle::new(term, occurs))
            }
        };

        parser.skip_ws();
        parser.expect(">")?;

        if self.elements.contains_key(&name) {
            self.warnings
                .push(format!("Redefinition of element {}", name));
        } else {
            self.elements.insert(name, spec);
        }
        Ok(())
    }

    fn parse_attlist_decl(&mut self, parser: &mut DeclParser<'_>) -> Result<()> {
        parser.require_ws()?;
        let element = parser.name()?.to_string();

        loop {
            parser.skip_ws();
            if parser.eat(">") {
                return Ok(());
            }

            let name = parser.name()?.to_string();
            parser.require_ws()?;
            let kind = parser.attribute_type()?;
            parser.require_ws()?;
            let default = parser.default_decl()?;

            // The first declaration of an attribute is binding.
            self.attributes
                .entry(element.clone())
                .or_default()
                .entry(name.clone())
                .or_insert(AttributeDecl { name, kind, default });
        }
    }

    fn check_element(&self, node: Node<'_, '_>, state: &mut IdState, context: &mut ValidationContext<'_, '_>) {
        let name = qualified_name(node, node.tag_name().namespace(), node.tag_name().name());

        match self.elements.get(&name) {
            Some(spec) => self.check_content(node, &name, spec, context),
            None => context.error(node, format!("No declaration for element {}", name)),
        }

        self.check_attributes(node, &name, state, context);
    }

    fn check_content(
        &self,
        node: Node<'_, '_>,
        name: &str,
        spec: &ContentSpec,
        context: &mut ValidationContext<'_, '_>,
    ) {
        let children: Vec<String> = node
            .children()
            .filter(|n| n.is_element())
            .map(|n| qualified_name(n, n.tag_name().namespace(), n.tag_name().name()))
            .collect();

        match spec {
            ContentSpec::Any => {}
            ContentSpec::Empty => {
                let has_content = !children.is_empty()
                    || node.children().any(|n| n.is_text() && !n.text().unwrap_or("").is_empty());
                if has_content {
                    context.error(
                        node,
                        format!("Element {} was declared EMPTY this one has content", name),
                    );
                }
            }
            ContentSpec::Mixed(allowed) => {
                for child in &children {
                    if !allowed.contains(child) {
                        context.error(
                            node,
                            format!(
                                "Element {} is not declared in {} list of possible children",
                                child, name
                            ),
                        );
                    }
                }
            }
            ContentSpec::Children(model) => {
                let has_text = node.children().any(|n| {
                    n.is_text() && n.text().map_or(false, |t| !t.trim().is_empty())
                });
                let result = match_content(model, &children, |leaf, item| leaf == item);

                if has_text || !result.is_complete() {
                    context.error(
                        node,
                        format!(
                            "Element {} content does not follow the DTD, expecting {}, got ({})",
                            name,
                            ModelDisplay(model),
                            children.join(" ")
                        ),
                    );
                }
            }
        }
    }

    fn check_attributes(
        &self,
        node: Node<'_, '_>,
        name: &str,
        state: &mut IdState,
        context: &mut ValidationContext<'_, '_>,
    ) {
        let declared = self.attributes.get(name);

        for attr in node.attributes() {
            let attr_name = qualified_name(node, attr.namespace(), attr.name());
            let decl = match declared.and_then(|d| d.get(&attr_name)) {
                Some(decl) => decl,
                None => {
                    context.error(
                        node,
                        format!("No declaration for attribute {} of element {}", attr_name, name),
                    );
                    continue;
                }
            };

            let value = if decl.kind.is_tokenized() {
                attr.value().split_ascii_whitespace().collect::<Vec<_>>().join(" ")
            } else {
                attr.value().to_string()
            };

            if let DefaultDecl::Fixed(fixed) = &decl.default {
                if &value != fixed {
                    context.error(
                        node,
                        format!(
                            "Value for attribute {} of {} is different from default \"{}\"",
                            attr_name, name, fixed
                        ),
                    );
                }
            }

            self.check_attribute_value(node, name, decl, &value, state, context);
        }

        for decl in declared.into_iter().flat_map(|d| d.values()) {
            if decl.default != DefaultDecl::Required {
                continue;
            }
            let present = node
                .attributes()
                .any(|a| qualified_name(node, a.namespace(), a.name()) == decl.name);
            if !present {
                context.error(
                    node,
                    format!("Element {} does not carry attribute {}", name, decl.name),
                );
            }
        }
    }

    fn check_attribute_value(
        &self,
        node: Node<'_, '_>,
        name: &str,
        decl: &AttributeDecl,
        value: &str,
        state: &mut IdState,
        context: &mut ValidationContext<'_, '_>,
    ) {
        let syntax_ok = match &decl.kind {
            AttributeType::CData => true,
            AttributeType::Id => {
                if names::is_valid_name(value) && !state.ids.insert(value.to_string()) {
                    context.error(
                        node,
                        format!("ID {} already defined", value),
                    );
                }
                names::is_valid_name(value)
            }
            AttributeType::IdRef => {
                state.idrefs.push((node.id(), decl.name.clone(), value.to_string()));
                names::is_valid_name(value)
            }
            AttributeType::IdRefs => {
                for item in value.split(' ') {
                    state.idrefs.push((node.id(), decl.name.clone(), item.to_string()));
                }
                names::is_valid_list(value, names::is_valid_name)
            }
            AttributeType::Entity => names::is_valid_name(value),
            AttributeType::Entities => names::is_valid_list(value, names::is_valid_name),
            AttributeType::NmToken => names::is_valid_nmtoken(value),
            AttributeType::NmTokens => names::is_valid_list(value, names::is_valid_nmtoken),
            AttributeType::Notation(allowed) | AttributeType::Enumeration(allowed) => {
                if !allowed.iter().any(|a| a == value) {
                    context.error(
                        node,
                        format!(
                            "Value \"{}\" for attribute {} of {} is not among the enumerated set",
                            value, decl.name, name
                        ),
                    );
                }
                true
            }
        };

        if !syntax_ok {
            context.error(
                node,
                format!(
                    "Syntax of value for attribute {} of {} is not valid",
                    decl.name, name
                ),
            );
        }
    }
}

#[derive(Default)]
struct IdState {
    ids: HashSet<String>,
    idrefs: Vec<(roxmltree::NodeId, String, String)>,
}

impl DocumentValidator for Dtd {
    fn kind(&self) -> &'static str {
        "DTD"
    }

    fn validate_document(&self, document: &Document<'_>, context: &mut ValidationContext<'_, '_>) {
        for warning in &self.warnings {
            context.warning(None, warning.clone());
        }

        let root = document.root_element().node();
        let root_name = qualified_name(root, root.tag_name().namespace(), root.tag_name().name());
        if root_name != self.name {
            context.error(
                root,
                format!(
                    "root and DTD name do not match '{}' and '{}'",
                    root_name, self.name
                ),
            );
        }

        let mut state = IdState::default();
        for node in root.descendants().filter(|n| n.is_element()) {
            self.check_element(node, &mut state, context);
        }

        for (node_id, attr, idref) in &state.idrefs {
            if !state.ids.contains(idref) {
                if let Some(node) = document.tree().get_node(*node_id) {
                    context.error(
                        node,
                        format!(
                            "IDREF attribute {} references an unknown ID \"{}\"",
                            attr, idref
                        ),
                    );
                }
            }
        }
    }
}

/// Validate `xml` against the DTD its DOCTYPE declares
pub fn validate(xml: &str, limits: &Limits) -> Result<ValidationReport> {
    let document = match Document::parse(xml, limits) {
        Ok(document) => document,
        Err(err) => {
            tracing::warn!(error = %err, "DTD Load Error");
            return Err(Error::SchemaValidation {
                reason: DTD_VALIDATION_FAILED.to_string(),
                diagnostics: vec![crate::error::Diagnostic::new(err.to_string())
                    .with_severity(crate::error::Severity::Fatal)],
            });
        }
    };

    let mut context = ValidationContext::new(&document);
    let loader = Loader::new().with_limits(limits.clone());

    match Dtd::from_document(xml, &loader) {
        Ok(Some(dtd)) => {
            tracing::debug!(kind = dtd.kind(), name = %dtd.name, "validating document");
            dtd.validate_document(&document, &mut context);
        }
        Ok(None) => context.fatal("Validation failed: no DTD found !"),
        Err(err) => context.fatal(format!("DTD Load Error: {}", err)),
    }

    context.into_report().into_result(DTD_VALIDATION_FAILED)
}

/// Scanner over DTD declaration text
struct DeclParser<'s> {
    src: &'s str,
    pos: usize,
}

impl<'s> DeclParser<'s> {
    fn new(src: &'s str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn error(&self, message: &str) -> Error {
        let snippet: String = self.rest().chars().take(20).collect();
        Error::Schema(format!("{} near '{}'", message, snippet))
    }

    fn skip_ws(&mut self) -> bool {
        let trimmed = self.rest().trim_start_matches(|c: char| c.is_ascii_whitespace());
        let skipped = self.rest().len() - trimmed.len();
        self.pos += skipped;
        skipped > 0
    }

    fn require_ws(&mut self) -> Result<()> {
        if self.skip_ws() {
            Ok(())
        } else {
            Err(self.error("expected whitespace"))
        }
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> Result<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", token)))
        }
    }

    fn skip_past(&mut self, token: &str) -> Result<()> {
        match self.rest().find(token) {
            Some(index) => {
                self.pos += index + token.len();
                Ok(())
            }
            None => Err(self.error(&format!("missing '{}'", token))),
        }
    }

    /// Skip to the closing `>` of a declaration, ignoring quoted text
    fn skip_decl(&mut self) -> Result<()> {
        let mut quote = None;
        for (index, c) in self.rest().char_indices() {
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '"') | (None, '\'') => quote = Some(c),
                (None, '>') => {
                    self.pos += index + 1;
                    return Ok(());
                }
                (None, _) => {}
            }
        }
        Err(self.error("unterminated declaration"))
    }

    fn name(&mut self) -> Result<&'s str> {
        let rest = self.rest();
        let end = rest
            .find(|c: char| c.is_ascii_whitespace() || "()|,?*+>\"'[];%".contains(c))
            .unwrap_or(rest.len());
        let name = &rest[..end];
        if name.is_empty() {
            return Err(self.error("expected a name"));
        }
        self.pos += end;
        Ok(name)
    }

    fn quoted(&mut self) -> Result<&'s str> {
        let quote = match self.peek() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.error("expected a quoted literal")),
        };
        self.pos += 1;
        let rest = self.rest();
        let end = rest
            .find(quote)
            .ok_or_else(|| self.error("unterminated literal"))?;
        self.pos += end + 1;
        Ok(&rest[..end])
    }

    fn external_id(&mut self) -> Result<Option<ExternalId>> {
        if self.eat("SYSTEM") {
            self.require_ws()?;
            let system_id = self.quoted()?.to_string();
            Ok(Some(ExternalId {
                public_id: None,
                system_id,
            }))
        } else if self.eat("PUBLIC") {
            self.require_ws()?;
            let public_id = self.quoted()?.to_string();
            self.require_ws()?;
            let system_id = self.quoted()?.to_string();
            Ok(Some(ExternalId {
                public_id: Some(public_id),
                system_id,
            }))
        } else {
            Ok(None)
        }
    }

    fn indicator(&mut self) -> Option<char> {
        match self.peek() {
            Some(c @ ('?' | '*' | '+')) => {
                self.pos += 1;
                Some(c)
            }
            _ => None,
        }
    }

    /// Rest of `(#PCDATA ...` after the keyword
    fn mixed(&mut self) -> Result<ContentSpec> {
        let mut names = Vec::new();
        loop {
            self.skip_ws();
            if self.eat(")") {
                break;
            }
            self.expect("|")?;
            self.skip_ws();
            names.push(self.name()?.to_string());
        }
        let star = self.eat("*");
        if !names.is_empty() && !star {
            return Err(self.error("mixed content with element names must end in ')*'"));
        }
        Ok(ContentSpec::Mixed(names))
    }

    /// Content particle: a name or a parenthesised group, with an indicator
    fn content_particle(&mut self) -> Result<Particle<String>> {
        let term = if self.eat("(") {
            self.skip_ws();
            self.group_body()?
        } else {
            Term::Leaf(self.name()?.to_string())
        };
        Ok(Particle::new(term, Occurs::from_indicator(self.indicator())))
    }

    /// Group contents after `(` up to and including `)`
    fn group_body(&mut self) -> Result<Term<String>> {
        let mut particles = vec![self.content_particle()?];
        let mut separator = None;

        loop {
            self.skip_ws();
            if self.eat(")") {
                break;
            }
            let sep = match self.peek() {
                Some(c @ ('|' | ',')) => c,
                _ => return Err(self.error("expected '|', ',' or ')'")),
            };
            if separator.map_or(false, |s| s != sep) {
                return Err(self.error("cannot mix '|' and ',' in one group"));
            }
            separator = Some(sep);
            self.pos += 1;
            self.skip_ws();
            particles.push(self.content_particle()?);
        }

        Ok(match separator {
            Some('|') => Term::Choice(particles),
            _ => Term::Sequence(particles),
        })
    }

    fn attribute_type(&mut self) -> Result<AttributeType> {
        if self.eat("(") {
            return Ok(AttributeType::Enumeration(self.enumeration()?));
        }

        let kind = match self.name()? {
            "CDATA" => AttributeType::CData,
            "ID" => AttributeType::Id,
            "IDREF" => AttributeType::IdRef,
            "IDREFS" => AttributeType::IdRefs,
            "ENTITY" => AttributeType::Entity,
            "ENTITIES" => AttributeType::Entities,
            "NMTOKEN" => AttributeType::NmToken,
            "NMTOKENS" => AttributeType::NmTokens,
            "NOTATION" => {
                self.require_ws()?;
                self.expect("(")?;
                AttributeType::Notation(self.enumeration()?)
            }
            other => {
                return Err(Error::Schema(format!("unknown attribute type '{}'", other)));
            }
        };
        Ok(kind)
    }

    /// Tokens of `(a | b | c)` after the opening parenthesis
    fn enumeration(&mut self) -> Result<Vec<String>> {
        let mut values = Vec::new();
        loop {
            self.skip_ws();
            values.push(self.name()?.to_string());
            self.skip_ws();
            if self.eat(")") {
                return Ok(values);
            }
            self.expect("|")?;
        }
    }

    fn default_decl(&mut self) -> Result<DefaultDecl> {
        if self.eat("#REQUIRED") {
            Ok(DefaultDecl::Required)
        } else if self.eat("#IMPLIED") {
            Ok(DefaultDecl::Implied)
        } else if self.eat("#FIXED") {
            self.require_ws()?;
            Ok(DefaultDecl::Fixed(self.quoted()?.to_string()))
        } else {
            Ok(DefaultDecl::Value(self.quoted()?.to_string()))
        }
    }
}

/// Content model in DTD syntax, e.g. `(to , from , body+)`
struct ModelDisplay<'a>(&'a Particle<String>);

impl fmt::Display for ModelDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let particle = self.0;
        match &particle.term {
            Term::Leaf(name) => write!(f, "{}", name)?,
            Term::Sequence(items) | Term::Choice(items) | Term::All(items) => {
                let separator = if matches!(particle.term, Term::Choice(_)) {
                    " | "
                } else {
                    " , "
                };
                write!(f, "(")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, "{}", separator)?;
                    }
                    write!(f, "{}", ModelDisplay(item))?;
                }
                write!(f, ")")?;
            }
        }

        match (particle.occurs.min, particle.occurs.max) {
            (0, Some(1)) => write!(f, "?"),
            (0, None) => write!(f, "*"),
            (1, None) => write!(f, "+"),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(xml: &str) -> Result<ValidationReport> {
        validate(xml, &Limits::default())
    }

    fn messages(err: &Error) -> Vec<String> {
        err.diagnostics().iter().map(|d| d.message.clone()).collect()
    }

    const NOTE_DTD: &str = r#"<!DOCTYPE note [
  <!ELEMENT note (to, from, heading?, body)>
  <!ELEMENT to (#PCDATA)>
  <!ELEMENT from (#PCDATA)>
  <!ELEMENT heading (#PCDATA)>
  <!ELEMENT body (#PCDATA | b)*>
  <!ELEMENT b (#PCDATA)>
  <!ATTLIST note
      id ID #REQUIRED
      lang (en | nl) "en"
      version CDATA #FIXED "1">
]>"#;

    #[test]
    fn test_parse_declarations() {
        let mut dtd = Dtd::default();
        dtd.parse_subset(
            r#"<!-- comment --><!ELEMENT a (b, (c | d)*, e?)>
               <!ELEMENT b EMPTY><!ELEMENT c ANY>
               <!ATTLIST a x NMTOKENS #IMPLIED y NOTATION (png | gif) #REQUIRED>
               <!ENTITY copy "&#169;"><?pi data?>"#,
        )
        .unwrap();

        assert_eq!(dtd.elements["b"], ContentSpec::Empty);
        assert_eq!(dtd.elements["c"], ContentSpec::Any);
        match &dtd.elements["a"] {
            ContentSpec::Children(model) => {
                assert_eq!(ModelDisplay(model).to_string(), "(b , (c | d)* , e?)");
            }
            other => panic!("unexpected spec {:?}", other),
        }

        let attrs = &dtd.attributes["a"];
        assert_eq!(attrs["x"].kind, AttributeType::NmTokens);
        assert_eq!(
            attrs["y"].kind,
            AttributeType::Notation(vec!["png".to_string(), "gif".to_string()])
        );
        assert_eq!(attrs["y"].default, DefaultDecl::Required);
    }

    #[test]
    fn test_mixed_without_star_is_rejected() {
        let mut dtd = Dtd::default();
        assert!(dtd.parse_subset("<!ELEMENT p (#PCDATA | b)>").is_err());
        assert!(dtd.parse_subset("<!ELEMENT q (#PCDATA)>").is_ok());
    }

    #[test]
    fn test_valid_document() {
        let xml = format!(
            r#"{}<note id="n1" version="1"><to>Tove</to><from>Jani</from><body>Hi <b>there</b></body></note>"#,
            NOTE_DTD
        );
        let report = check(&xml).unwrap();
        assert!(report.is_valid());
    }

    #[test]
    fn test_content_model_violation() {
        let xml = format!(
            r#"{}<note id="n1"><from>Jani</from><to>Tove</to><body/></note>"#,
            NOTE_DTD
        );
        let err = check(&xml).unwrap_err();
        assert_eq!(err.to_string(), DTD_VALIDATION_FAILED);
        assert!(messages(&err).iter().any(|m| m.contains(
            "Element note content does not follow the DTD, expecting (to , from , heading? , body), got (from to body)"
        )));
    }

    #[test]
    fn test_attribute_checks() {
        let xml = format!(
            r#"{}<note lang="fr" version="2" extra="x"><to/><from/><body/></note>"#,
            NOTE_DTD
        );
        let err = check(&xml).unwrap_err();
        let messages = messages(&err);

        assert!(messages.iter().any(|m| m.contains("does not carry attribute id")));
        assert!(messages.iter().any(|m| m.contains("is not among the enumerated set")));
        assert!(messages.iter().any(|m| m.contains("is different from default \"1\"")));
        assert!(messages.iter().any(|m| m.contains("No declaration for attribute extra")));
    }

    #[test]
    fn test_undeclared_element_and_root_mismatch() {
        let xml = r#"<!DOCTYPE note [<!ELEMENT note EMPTY>]><memo><x/></memo>"#;
        let err = check(xml).unwrap_err();
        let messages = messages(&err);
        assert!(messages.iter().any(|m| m.contains("root and DTD name do not match")));
        assert!(messages.iter().any(|m| m == "No declaration for element x"));
    }

    #[test]
    fn test_ids_and_idrefs() {
        let dtd = r#"<!DOCTYPE r [
  <!ELEMENT r (i*)>
  <!ELEMENT i EMPTY>
  <!ATTLIST i id ID #IMPLIED ref IDREF #IMPLIED>
]>"#;
        let ok = format!(r#"{}<r><i id="a"/><i ref="a"/></r>"#, dtd);
        assert!(check(&ok).is_ok());

        let dup = format!(r#"{}<r><i id="a"/><i id="a"/><i ref="b"/></r>"#, dtd);
        let messages = messages(&check(&dup).unwrap_err());
        assert!(messages.iter().any(|m| m == "ID a already defined"));
        assert!(messages.iter().any(|m| m.contains("references an unknown ID \"b\"")));
    }

    #[test]
    fn test_empty_element_with_content() {
        let xml = r#"<!DOCTYPE r [<!ELEMENT r EMPTY>]><r>text</r>"#;
        let messages = messages(&check(xml).unwrap_err());
        assert!(messages[0].contains("was declared EMPTY"));
    }

    #[test]
    fn test_text_in_element_only_content() {
        let xml = r#"<!DOCTYPE r [<!ELEMENT r (a)><!ELEMENT a EMPTY>]><r>oops<a/></r>"#;
        assert!(check(xml).is_err());

        let xml = "<!DOCTYPE r [<!ELEMENT r (a)><!ELEMENT a EMPTY>]><r>\n  <a/>\n</r>";
        assert!(check(xml).is_ok());
    }

    #[test]
    fn test_markup_characters_inside_the_internal_subset() {
        let entity = r#"<!DOCTYPE r [<!ENTITY a "x>y"><!ELEMENT r (#PCDATA)>]><r>&a;</r>"#;
        assert!(check(entity).unwrap().is_valid());

        let comment = "<!DOCTYPE r [<!-- a > b ] c --><!ELEMENT r (#PCDATA)>]><r>ok</r>";
        assert!(check(comment).unwrap().is_valid());
    }

    #[test]
    fn test_missing_doctype() {
        let err = check("<note/>").unwrap_err();
        assert_eq!(messages(&err), vec!["Validation failed: no DTD found !".to_string()]);
    }

    #[test]
    fn test_malformed_document_fails() {
        let err = check("<note><to></note>").unwrap_err();
        assert!(matches!(err, Error::SchemaValidation { .. }));
        assert_eq!(err.to_string(), DTD_VALIDATION_FAILED);
    }

    #[test]
    fn test_external_subset() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<!ELEMENT r (#PCDATA)>").unwrap();
        let xml = format!(
            r#"<!DOCTYPE r SYSTEM "{}"><r>hello</r>"#,
            file.path().display()
        );
        assert!(check(&xml).is_ok());

        let missing = r#"<!DOCTYPE r SYSTEM "/no/such/file.dtd"><r>hello</r>"#;
        assert!(check(missing).is_err());
    }

    #[test]
    fn test_parameter_entity_reference_warns() {
        let mut dtd = Dtd::default();
        dtd.parse_subset(r#"<!ENTITY % p "<!ELEMENT r EMPTY>"> %p;"#).unwrap();
        assert_eq!(dtd.warnings.len(), 1);
        assert!(dtd.elements.is_empty());
    }
}
