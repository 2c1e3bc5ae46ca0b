//! XML Schema model
//!
//! A schema document is read with roxmltree and turned into a set of global
//! element, attribute and type definitions. Named components may be referred
//! to before they are defined, so the parser first indexes every top-level
//! definition node and resolves references on demand.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use roxmltree::Node;

use super::builtins::{Builtin, XSD_NAMESPACE};
use super::facets::{collect_facets, Facet};
use super::models::{Occurs, Particle, Term};
use crate::documents::check_nesting;
use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::namespaces::{resolve_prefixed, QName, XML_NAMESPACE};

/// Maximum nesting of group references and type derivations
const MAX_NESTING: usize = 64;

/// Form default for elements and attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormDefault {
    /// Unqualified (default)
    #[default]
    Unqualified,
    /// Qualified
    Qualified,
}

impl FormDefault {
    /// Parse from string value
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "qualified" => Some(Self::Qualified),
            "unqualified" => Some(Self::Unqualified),
            _ => None,
        }
    }

    /// Check if qualified
    pub fn is_qualified(&self) -> bool {
        matches!(self, Self::Qualified)
    }
}

/// Reference to a type definition, either by name or inline
#[derive(Debug, Clone)]
pub enum TypeRef {
    /// A global type (or an XSD builtin) by name
    Named(QName),
    /// Anonymous simple type
    Simple(Arc<SimpleType>),
    /// Anonymous complex type
    Complex(Arc<ComplexType>),
}

impl TypeRef {
    /// Reference to an XSD builtin type
    pub fn builtin(builtin: Builtin) -> Self {
        TypeRef::Named(QName::namespaced(XSD_NAMESPACE, builtin.name()))
    }
}

/// Simple type definition
#[derive(Debug, Clone)]
pub enum SimpleType {
    /// Builtin datatype
    Builtin(Builtin),
    /// Restriction of a base type by facets
    Restriction {
        /// Base type
        base: TypeRef,
        /// Facets added by this step
        facets: Vec<Facet>,
    },
    /// Whitespace separated list of items
    List(TypeRef),
    /// Any of the member types
    Union(Vec<TypeRef>),
}

/// Content of a complex type
#[derive(Debug, Clone)]
pub enum ContentType {
    /// No element or character children
    Empty,
    /// Character content of a simple type
    Simple(TypeRef),
    /// Element children following a content model
    Elements(Particle<XsdLeaf>),
}

/// Complex type definition
#[derive(Debug, Clone)]
pub struct ComplexType {
    /// Whether character data may appear between child elements
    pub mixed: bool,
    /// Content type
    pub content: ContentType,
    /// Declared attributes, including inherited ones
    pub attributes: Vec<AttributeUse>,
    /// Attribute wildcard
    pub any_attribute: Option<Wildcard>,
}

impl ComplexType {
    fn empty(mixed: bool) -> Self {
        Self {
            mixed,
            content: ContentType::Empty,
            attributes: Vec::new(),
            any_attribute: None,
        }
    }

    /// Look up a declared attribute by name
    pub fn attribute(&self, name: &QName) -> Option<&AttributeUse> {
        self.attributes.iter().find(|a| &a.name == name)
    }
}

/// `use` of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Use {
    /// May be absent
    #[default]
    Optional,
    /// Must be present
    Required,
    /// Must be absent
    Prohibited,
}

/// Attribute declaration as used by a complex type
#[derive(Debug, Clone)]
pub struct AttributeUse {
    /// Attribute name
    pub name: QName,
    /// Simple type of the value
    pub type_ref: TypeRef,
    /// Occurrence
    pub use_kind: Use,
    /// Fixed value constraint
    pub fixed: Option<String>,
    /// Default value
    pub default: Option<String>,
}

/// Element declaration
#[derive(Debug, Clone)]
pub struct ElementDecl {
    /// Element name
    pub name: QName,
    /// Element type
    pub type_ref: TypeRef,
    /// Whether `xsi:nil` is permitted
    pub nillable: bool,
    /// Fixed value constraint
    pub fixed: Option<String>,
    /// Default value
    pub default: Option<String>,
}

/// Leaf of an XSD content model
#[derive(Debug, Clone)]
pub enum XsdLeaf {
    /// Local element declaration
    Element(Arc<ElementDecl>),
    /// Reference to a global element declaration
    Ref(QName),
    /// Element wildcard
    Any(Wildcard),
}

impl XsdLeaf {
    /// Whether an element named `name` can match this leaf
    pub fn matches(&self, name: &QName) -> bool {
        match self {
            XsdLeaf::Element(decl) => &decl.name == name,
            XsdLeaf::Ref(qname) => qname == name,
            XsdLeaf::Any(wildcard) => wildcard.allows(name.namespace.as_deref()),
        }
    }
}

impl fmt::Display for XsdLeaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XsdLeaf::Element(decl) => write!(f, "{}", decl.name),
            XsdLeaf::Ref(qname) => write!(f, "{}", qname),
            XsdLeaf::Any(wildcard) => write!(f, "{}", wildcard),
        }
    }
}

/// `processContents` of a wildcard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessContents {
    /// A global declaration must exist
    #[default]
    Strict,
    /// Validate when a global declaration exists
    Lax,
    /// Do not validate
    Skip,
}

/// Namespaces accepted by a wildcard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceConstraint {
    /// `##any`
    Any,
    /// `##other`: any namespace except the target namespace and no namespace
    Other(Option<String>),
    /// An explicit list; `None` stands for `##local`
    List(Vec<Option<String>>),
}

impl NamespaceConstraint {
    fn parse(value: &str, target_namespace: Option<&str>) -> Self {
        match value.trim() {
            "##any" => NamespaceConstraint::Any,
            "##other" => NamespaceConstraint::Other(target_namespace.map(str::to_string)),
            list => NamespaceConstraint::List(
                list.split_ascii_whitespace()
                    .map(|token| match token {
                        "##targetNamespace" => target_namespace.map(str::to_string),
                        "##local" => None,
                        uri => Some(uri.to_string()),
                    })
                    .collect(),
            ),
        }
    }
}

/// Element or attribute wildcard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wildcard {
    /// Accepted namespaces
    pub namespaces: NamespaceConstraint,
    /// Validation of matched items
    pub process_contents: ProcessContents,
}

impl Wildcard {
    /// Whether an item in `namespace` is accepted
    pub fn allows(&self, namespace: Option<&str>) -> bool {
        match &self.namespaces {
            NamespaceConstraint::Any => true,
            NamespaceConstraint::Other(target) => {
                namespace.is_some() && namespace != target.as_deref()
            }
            NamespaceConstraint::List(list) => list.iter().any(|ns| ns.as_deref() == namespace),
        }
    }
}

impl fmt::Display for Wildcard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespaces {
            NamespaceConstraint::Any => write!(f, "##any"),
            NamespaceConstraint::Other(Some(target)) => write!(f, "##other{{{}}}*", target),
            NamespaceConstraint::Other(None) => write!(f, "##other*"),
            NamespaceConstraint::List(list) => {
                let names: Vec<String> = list
                    .iter()
                    .map(|ns| match ns {
                        Some(uri) => format!("{{{}}}*", uri),
                        None => "*".to_string(),
                    })
                    .collect();
                write!(f, "{}", names.join(" "))
            }
        }
    }
}

/// Global type definition
#[derive(Debug, Clone)]
pub enum TypeDef {
    /// Named simple type
    Simple(Arc<SimpleType>),
    /// Named complex type
    Complex(Arc<ComplexType>),
}

/// A type definition after name resolution
#[derive(Debug, Clone, Copy)]
pub enum ResolvedType<'s> {
    /// XSD builtin
    Builtin(Builtin),
    /// Simple type
    Simple(&'s SimpleType),
    /// Complex type
    Complex(&'s ComplexType),
}

/// A parsed XML Schema
#[derive(Debug, Clone, Default)]
pub struct XsdSchema {
    /// Target namespace
    pub target_namespace: Option<String>,
    /// `elementFormDefault`
    pub element_form_default: FormDefault,
    /// `attributeFormDefault`
    pub attribute_form_default: FormDefault,
    elements: HashMap<QName, Arc<ElementDecl>>,
    attributes: HashMap<QName, AttributeUse>,
    types: HashMap<QName, TypeDef>,
    warnings: Vec<String>,
}

impl XsdSchema {
    /// Parse a schema document
    pub fn parse(text: &str) -> Result<Self> {
        check_nesting(text, &Limits::default())
            .map_err(|e| Error::Schema(format!("Invalid schema document: {}", e)))?;

        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };
        let document = roxmltree::Document::parse_with_options(text, options)
            .map_err(|e| Error::Schema(format!("Invalid schema document: {}", e)))?;

        let root = document.root_element();
        if !is_xsd(root, "schema") {
            return Err(Error::Schema(format!(
                "The document element '{}' is not an XSD schema",
                root.tag_name().name()
            )));
        }

        SchemaParser::new(root)?.build()
    }

    /// Global element declaration
    pub fn lookup_element(&self, name: &QName) -> Option<&Arc<ElementDecl>> {
        self.elements.get(name)
    }

    /// Global attribute declaration
    pub fn lookup_attribute(&self, name: &QName) -> Option<&AttributeUse> {
        self.attributes.get(name)
    }

    /// Global type definition (builtins excluded)
    pub fn lookup_type(&self, name: &QName) -> Option<&TypeDef> {
        self.types.get(name)
    }

    /// Resolve a type reference to its definition
    pub fn resolve_type<'s>(&'s self, type_ref: &'s TypeRef) -> Option<ResolvedType<'s>> {
        match type_ref {
            TypeRef::Named(name) if name.is_in(Some(XSD_NAMESPACE)) => {
                Builtin::from_local_name(&name.local_name).map(ResolvedType::Builtin)
            }
            TypeRef::Named(name) => self.types.get(name).map(|def| match def {
                TypeDef::Simple(simple) => ResolvedType::Simple(simple),
                TypeDef::Complex(complex) => ResolvedType::Complex(complex),
            }),
            TypeRef::Simple(simple) => Some(ResolvedType::Simple(simple)),
            TypeRef::Complex(complex) => Some(ResolvedType::Complex(complex)),
        }
    }

    /// Names of the global element declarations
    pub fn element_names(&self) -> impl Iterator<Item = &QName> {
        self.elements.keys()
    }

    /// Schema constructs that were skipped while parsing
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

fn is_xsd(node: Node<'_, '_>, local_name: &str) -> bool {
    node.is_element()
        && node.tag_name().namespace() == Some(XSD_NAMESPACE)
        && node.tag_name().name() == local_name
}

/// XSD element children, annotations excluded
fn xsd_children<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|child| {
        child.is_element()
            && child.tag_name().namespace() == Some(XSD_NAMESPACE)
            && child.tag_name().name() != "annotation"
    })
}

fn is_true(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("true") | Some("1"))
}

fn required_attribute<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str> {
    node.attribute(name).ok_or_else(|| {
        Error::Schema(format!(
            "xs:{} is missing the '{}' attribute",
            node.tag_name().name(),
            name
        ))
    })
}

fn merge_attribute(attributes: &mut Vec<AttributeUse>, attribute: AttributeUse) {
    match attributes.iter_mut().find(|a| a.name == attribute.name) {
        Some(existing) => *existing = attribute,
        None => attributes.push(attribute),
    }
}

struct SchemaParser<'a, 'input> {
    root: Node<'a, 'input>,
    target_namespace: Option<String>,
    element_form: FormDefault,
    attribute_form: FormDefault,
    elements: HashMap<QName, Node<'a, 'input>>,
    attributes: HashMap<QName, Node<'a, 'input>>,
    types: HashMap<QName, Node<'a, 'input>>,
    groups: HashMap<QName, Node<'a, 'input>>,
    attribute_groups: HashMap<QName, Node<'a, 'input>>,
    warnings: Vec<String>,
    depth: usize,
}

impl<'a, 'input> SchemaParser<'a, 'input> {
    fn new(root: Node<'a, 'input>) -> Result<Self> {
        let form = |name: &str| -> Result<FormDefault> {
            match root.attribute(name) {
                None => Ok(FormDefault::default()),
                Some(value) => FormDefault::from_str(value).ok_or_else(|| {
                    Error::Schema(format!("Invalid value '{}' for {}", value, name))
                }),
            }
        };

        let mut parser = Self {
            root,
            target_namespace: root
                .attribute("targetNamespace")
                .filter(|ns| !ns.is_empty())
                .map(str::to_string),
            element_form: form("elementFormDefault")?,
            attribute_form: form("attributeFormDefault")?,
            elements: HashMap::new(),
            attributes: HashMap::new(),
            types: HashMap::new(),
            groups: HashMap::new(),
            attribute_groups: HashMap::new(),
            warnings: Vec::new(),
            depth: 0,
        };
        parser.index_globals()?;
        Ok(parser)
    }

    fn global_name(&self, node: Node<'a, 'input>) -> Result<QName> {
        let name = required_attribute(node, "name")?;
        Ok(QName::new(self.target_namespace.clone(), name.trim()))
    }

    fn index_globals(&mut self) -> Result<()> {
        for child in xsd_children(self.root) {
            let local_name = child.tag_name().name();
            match local_name {
                "element" => {
                    let name = self.global_name(child)?;
                    self.elements.insert(name, child);
                }
                "attribute" => {
                    let name = self.global_name(child)?;
                    self.attributes.insert(name, child);
                }
                "simpleType" | "complexType" => {
                    let name = self.global_name(child)?;
                    if self.types.insert(name.clone(), child).is_some() {
                        return Err(Error::Schema(format!("Duplicate type definition '{}'", name)));
                    }
                }
                "group" => {
                    let name = self.global_name(child)?;
                    self.groups.insert(name, child);
                }
                "attributeGroup" => {
                    let name = self.global_name(child)?;
                    self.attribute_groups.insert(name, child);
                }
                "include" | "import" | "redefine" | "override" => {
                    let location = child.attribute("schemaLocation").unwrap_or("");
                    let message = format!(
                        "xs:{} is not supported; schema location '{}' was skipped",
                        local_name, location
                    );
                    tracing::warn!("{}", message);
                    self.warnings.push(message);
                }
                "notation" => {}
                other => {
                    self.warnings.push(format!("Unexpected top-level xs:{} ignored", other));
                }
            }
        }
        Ok(())
    }

    fn build(mut self) -> Result<XsdSchema> {
        let type_nodes: Vec<(QName, Node<'a, 'input>)> =
            self.types.iter().map(|(name, node)| (name.clone(), *node)).collect();
        let mut types = HashMap::new();
        for (name, node) in type_nodes {
            let definition = if node.tag_name().name() == "complexType" {
                TypeDef::Complex(Arc::new(self.parse_complex_type(node)?))
            } else {
                TypeDef::Simple(Arc::new(self.parse_simple_type(node)?))
            };
            types.insert(name, definition);
        }

        let element_nodes: Vec<Node<'a, 'input>> = self.elements.values().copied().collect();
        let mut elements = HashMap::new();
        for node in element_nodes {
            let decl = self.parse_element(node, true)?;
            elements.insert(decl.name.clone(), Arc::new(decl));
        }

        let attribute_nodes: Vec<Node<'a, 'input>> = self.attributes.values().copied().collect();
        let mut attributes = HashMap::new();
        for node in attribute_nodes {
            let attribute = self.parse_attribute(node, true)?;
            attributes.insert(attribute.name.clone(), attribute);
        }

        tracing::debug!(
            target_namespace = ?self.target_namespace,
            elements = elements.len(),
            types = types.len(),
            "parsed XML schema"
        );

        Ok(XsdSchema {
            target_namespace: self.target_namespace,
            element_form_default: self.element_form,
            attribute_form_default: self.attribute_form,
            elements,
            attributes,
            types,
            warnings: self.warnings,
        })
    }

    fn enter(&mut self, node: Node<'a, 'input>) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(Error::Schema(format!(
                "Circular or too deeply nested definition at xs:{}",
                node.tag_name().name()
            )));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn local_name(&self, node: Node<'a, 'input>, global: bool, default_form: FormDefault) -> Result<QName> {
        let name = required_attribute(node, "name")?.trim();
        let qualified = if global {
            true
        } else {
            match node.attribute("form") {
                Some(form) => FormDefault::from_str(form)
                    .ok_or_else(|| Error::Schema(format!("Invalid form '{}'", form)))?
                    .is_qualified(),
                None => default_form.is_qualified(),
            }
        };
        Ok(if qualified {
            QName::new(self.target_namespace.clone(), name)
        } else {
            QName::local(name)
        })
    }

    /// Type named by a `type` attribute or defined by an inline child
    fn declared_type(&mut self, node: Node<'a, 'input>, fallback: Builtin) -> Result<TypeRef> {
        if let Some(name) = node.attribute("type") {
            return Ok(TypeRef::Named(resolve_prefixed(node, name)?));
        }
        for child in xsd_children(node) {
            match child.tag_name().name() {
                "simpleType" => return Ok(TypeRef::Simple(Arc::new(self.parse_simple_type(child)?))),
                "complexType" => {
                    return Ok(TypeRef::Complex(Arc::new(self.parse_complex_type(child)?)))
                }
                _ => {}
            }
        }
        Ok(TypeRef::builtin(fallback))
    }

    fn parse_element(&mut self, node: Node<'a, 'input>, global: bool) -> Result<ElementDecl> {
        let name = self.local_name(node, global, self.element_form)?;
        let type_ref = self.declared_type(node, Builtin::AnyType)?;
        Ok(ElementDecl {
            name,
            type_ref,
            nillable: is_true(node.attribute("nillable")),
            fixed: node.attribute("fixed").map(str::to_string),
            default: node.attribute("default").map(str::to_string),
        })
    }

    fn parse_attribute(&mut self, node: Node<'a, 'input>, global: bool) -> Result<AttributeUse> {
        let use_kind = match node.attribute("use").map(str::trim) {
            Some("required") => Use::Required,
            Some("prohibited") => Use::Prohibited,
            _ => Use::Optional,
        };

        if let Some(reference) = node.attribute("ref") {
            let name = resolve_prefixed(node, reference)?;
            let mut attribute = match self.attributes.get(&name).copied() {
                Some(decl) => self.parse_attribute(decl, true)?,
                None if name.is_in(Some(XML_NAMESPACE)) => AttributeUse {
                    name: name.clone(),
                    type_ref: TypeRef::builtin(Builtin::String),
                    use_kind: Use::Optional,
                    fixed: None,
                    default: None,
                },
                None => {
                    return Err(Error::Schema(format!("Unknown attribute reference '{}'", name)))
                }
            };
            attribute.use_kind = use_kind;
            if let Some(fixed) = node.attribute("fixed") {
                attribute.fixed = Some(fixed.to_string());
            }
            if let Some(default) = node.attribute("default") {
                attribute.default = Some(default.to_string());
            }
            return Ok(attribute);
        }

        let name = self.local_name(node, global, self.attribute_form)?;
        let type_ref = self.declared_type(node, Builtin::AnySimpleType)?;
        Ok(AttributeUse {
            name,
            type_ref,
            use_kind,
            fixed: node.attribute("fixed").map(str::to_string),
            default: node.attribute("default").map(str::to_string),
        })
    }

    fn parse_wildcard(&self, node: Node<'a, 'input>) -> Result<Wildcard> {
        let process_contents = match node.attribute("processContents").map(str::trim) {
            None | Some("strict") => ProcessContents::Strict,
            Some("lax") => ProcessContents::Lax,
            Some("skip") => ProcessContents::Skip,
            Some(other) => {
                return Err(Error::Schema(format!("Invalid processContents '{}'", other)))
            }
        };
        Ok(Wildcard {
            namespaces: NamespaceConstraint::parse(
                node.attribute("namespace").unwrap_or("##any"),
                self.target_namespace.as_deref(),
            ),
            process_contents,
        })
    }

    fn parse_simple_type(&mut self, node: Node<'a, 'input>) -> Result<SimpleType> {
        self.enter(node)?;
        let derivation = xsd_children(node)
            .find(|child| matches!(child.tag_name().name(), "restriction" | "list" | "union"))
            .ok_or_else(|| Error::Schema("xs:simpleType has no restriction, list or union".into()))?;

        let simple = match derivation.tag_name().name() {
            "restriction" => {
                let base = self.simple_base(derivation, "base")?;
                let facets = collect_facets(
                    xsd_children(derivation)
                        .filter(|child| child.tag_name().name() != "simpleType")
                        .map(|child| (child.tag_name().name(), child.attribute("value").unwrap_or(""))),
                )?;
                SimpleType::Restriction { base, facets }
            }
            "list" => SimpleType::List(self.simple_base(derivation, "itemType")?),
            _ => {
                let mut members = Vec::new();
                if let Some(names) = derivation.attribute("memberTypes") {
                    for name in names.split_ascii_whitespace() {
                        members.push(TypeRef::Named(resolve_prefixed(derivation, name)?));
                    }
                }
                for child in xsd_children(derivation).filter(|c| c.tag_name().name() == "simpleType") {
                    members.push(TypeRef::Simple(Arc::new(self.parse_simple_type(child)?)));
                }
                if members.is_empty() {
                    return Err(Error::Schema("xs:union has no member types".into()));
                }
                SimpleType::Union(members)
            }
        };
        self.leave();
        Ok(simple)
    }

    /// Base of a restriction or list: attribute or inline simple type
    fn simple_base(&mut self, node: Node<'a, 'input>, attribute: &str) -> Result<TypeRef> {
        if let Some(name) = node.attribute(attribute) {
            return Ok(TypeRef::Named(resolve_prefixed(node, name)?));
        }
        match xsd_children(node).find(|c| c.tag_name().name() == "simpleType") {
            Some(inline) => Ok(TypeRef::Simple(Arc::new(self.parse_simple_type(inline)?))),
            None => Err(Error::Schema(format!(
                "xs:{} needs a '{}' attribute or an inline simple type",
                node.tag_name().name(),
                attribute
            ))),
        }
    }

    fn parse_complex_type(&mut self, node: Node<'a, 'input>) -> Result<ComplexType> {
        self.enter(node)?;
        let mut complex = ComplexType::empty(is_true(node.attribute("mixed")));

        for child in xsd_children(node) {
            match child.tag_name().name() {
                "sequence" | "choice" | "all" | "group" => {
                    if let Some(particle) = self.parse_particle(child)? {
                        complex.content = ContentType::Elements(particle);
                    }
                }
                "attribute" | "attributeGroup" | "anyAttribute" => {
                    self.parse_attribute_item(child, &mut complex)?;
                }
                "simpleContent" => self.parse_simple_content(child, &mut complex)?,
                "complexContent" => self.parse_complex_content(child, &mut complex)?,
                _ => {}
            }
        }

        if complex.mixed && matches!(complex.content, ContentType::Empty) {
            complex.content = ContentType::Elements(Particle::empty());
        }
        self.leave();
        Ok(complex)
    }

    fn parse_attribute_item(&mut self, node: Node<'a, 'input>, complex: &mut ComplexType) -> Result<()> {
        match node.tag_name().name() {
            "attribute" => {
                let attribute = self.parse_attribute(node, false)?;
                merge_attribute(&mut complex.attributes, attribute);
            }
            "anyAttribute" => complex.any_attribute = Some(self.parse_wildcard(node)?),
            "attributeGroup" => {
                let reference = required_attribute(node, "ref")?;
                let name = resolve_prefixed(node, reference)?;
                let group = self.attribute_groups.get(&name).copied().ok_or_else(|| {
                    Error::Schema(format!("Unknown attribute group '{}'", name))
                })?;
                self.enter(group)?;
                for child in xsd_children(group) {
                    self.parse_attribute_item(child, complex)?;
                }
                self.leave();
            }
            _ => {}
        }
        Ok(())
    }

    fn parse_particle(&mut self, node: Node<'a, 'input>) -> Result<Option<Particle<XsdLeaf>>> {
        let occurs = Occurs::parse(node.attribute("minOccurs"), node.attribute("maxOccurs"))?;
        if occurs.max == Some(0) {
            return Ok(None);
        }

        let term = match node.tag_name().name() {
            "element" => match node.attribute("ref") {
                Some(reference) => Term::Leaf(XsdLeaf::Ref(resolve_prefixed(node, reference)?)),
                None => Term::Leaf(XsdLeaf::Element(Arc::new(self.parse_element(node, false)?))),
            },
            "any" => Term::Leaf(XsdLeaf::Any(self.parse_wildcard(node)?)),
            "sequence" | "choice" | "all" => {
                let mut particles = Vec::new();
                for child in xsd_children(node) {
                    if let Some(particle) = self.parse_particle(child)? {
                        particles.push(particle);
                    }
                }
                match node.tag_name().name() {
                    "sequence" => Term::Sequence(particles),
                    "choice" => Term::Choice(particles),
                    _ => Term::All(particles),
                }
            }
            "group" => {
                let reference = required_attribute(node, "ref")?;
                let name = resolve_prefixed(node, reference)?;
                let group = self
                    .groups
                    .get(&name)
                    .copied()
                    .ok_or_else(|| Error::Schema(format!("Unknown model group '{}'", name)))?;
                let model = xsd_children(group)
                    .find(|c| matches!(c.tag_name().name(), "sequence" | "choice" | "all"))
                    .ok_or_else(|| Error::Schema(format!("Model group '{}' is empty", name)))?;
                self.enter(group)?;
                let inner = self.parse_particle(model)?;
                self.leave();
                match inner {
                    Some(particle) => particle.term,
                    None => return Ok(None),
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(Particle::new(term, occurs)))
    }

    /// Complex type definition named `base`, parsed fresh
    fn base_complex_type(&mut self, base: &QName) -> Result<Option<ComplexType>> {
        if base.is_in(Some(XSD_NAMESPACE)) {
            return Ok(None);
        }
        let node = self
            .types
            .get(base)
            .copied()
            .ok_or_else(|| Error::Schema(format!("Unknown base type '{}'", base)))?;
        if node.tag_name().name() == "complexType" {
            Ok(Some(self.parse_complex_type(node)?))
        } else {
            Ok(None)
        }
    }

    fn derivation(&self, node: Node<'a, 'input>) -> Result<(Node<'a, 'input>, QName)> {
        let derivation = xsd_children(node)
            .find(|c| matches!(c.tag_name().name(), "extension" | "restriction"))
            .ok_or_else(|| {
                Error::Schema(format!("xs:{} needs an extension or restriction", node.tag_name().name()))
            })?;
        let base = resolve_prefixed(derivation, required_attribute(derivation, "base")?)?;
        Ok((derivation, base))
    }

    fn parse_simple_content(&mut self, node: Node<'a, 'input>, complex: &mut ComplexType) -> Result<()> {
        let (derivation, base) = self.derivation(node)?;
        let mut value_type = TypeRef::Named(base.clone());

        if let Some(base_type) = self.base_complex_type(&base)? {
            value_type = match base_type.content {
                ContentType::Simple(type_ref) => type_ref,
                _ => {
                    return Err(Error::Schema(format!(
                        "Base type '{}' of xs:simpleContent has no simple content",
                        base
                    )))
                }
            };
            complex.attributes = base_type.attributes;
            complex.any_attribute = base_type.any_attribute;
        }

        if derivation.tag_name().name() == "restriction" {
            let facets = collect_facets(
                xsd_children(derivation)
                    .filter(|c| {
                        !matches!(
                            c.tag_name().name(),
                            "simpleType" | "attribute" | "attributeGroup" | "anyAttribute"
                        )
                    })
                    .map(|c| (c.tag_name().name(), c.attribute("value").unwrap_or(""))),
            )?;
            if !facets.is_empty() {
                value_type = TypeRef::Simple(Arc::new(SimpleType::Restriction {
                    base: value_type,
                    facets,
                }));
            }
        }

        for child in xsd_children(derivation) {
            self.parse_attribute_item(child, complex)?;
        }
        complex.content = ContentType::Simple(value_type);
        Ok(())
    }

    fn parse_complex_content(&mut self, node: Node<'a, 'input>, complex: &mut ComplexType) -> Result<()> {
        if node.attribute("mixed").is_some() {
            complex.mixed = is_true(node.attribute("mixed"));
        }
        let (derivation, base) = self.derivation(node)?;

        let mut own = None;
        for child in xsd_children(derivation) {
            match child.tag_name().name() {
                "sequence" | "choice" | "all" | "group" => own = self.parse_particle(child)?,
                _ => {}
            }
        }

        let base_type = self.base_complex_type(&base)?;
        let extension = derivation.tag_name().name() == "extension";

        if let Some(base_type) = base_type {
            complex.attributes = base_type.attributes;
            if extension {
                complex.any_attribute = base_type.any_attribute;
                complex.mixed |= base_type.mixed;
                complex.content = match (base_type.content, own) {
                    (ContentType::Elements(inherited), Some(added)) => ContentType::Elements(
                        Particle::new(Term::Sequence(vec![inherited, added]), Occurs::once()),
                    ),
                    (ContentType::Elements(inherited), None) => ContentType::Elements(inherited),
                    (ContentType::Empty, Some(added)) => ContentType::Elements(added),
                    (ContentType::Simple(_), Some(_)) => {
                        return Err(Error::Schema(format!(
                            "Cannot extend simple content of '{}' with elements",
                            base
                        )))
                    }
                    (content, None) => content,
                };
            } else {
                complex.content = own.map(ContentType::Elements).unwrap_or(ContentType::Empty);
            }
        } else {
            complex.content = own.map(ContentType::Elements).unwrap_or(ContentType::Empty);
        }

        for child in xsd_children(derivation) {
            self.parse_attribute_item(child, complex)?;
        }
        Ok(())
    }
}
