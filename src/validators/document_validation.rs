//! XSD validation of instance documents
//!
//! Walks the element tree from the document root, matching every element
//! against its declaration and reporting problems in libxml2's wording.

use std::borrow::Cow;
use std::sync::Arc;

use roxmltree::Node;

use super::builtins::Builtin;
use super::facets::{Facet, WhiteSpace};
use super::models::{match_content, ContentMatch};
use super::schemas::{
    ComplexType, ContentType, ElementDecl, ProcessContents, ResolvedType, SimpleType, TypeRef,
    Use, XsdLeaf, XsdSchema,
};
use super::validation::{DocumentValidator, ValidationContext};
use crate::documents::Document;
use crate::namespaces::{resolve_prefixed, QName, XSI_NAMESPACE};

/// Limit on named type chains followed while checking one value
const MAX_DERIVATION: usize = 64;

impl DocumentValidator for XsdSchema {
    fn kind(&self) -> &'static str {
        "XSD"
    }

    fn validate_document(&self, document: &Document<'_>, context: &mut ValidationContext<'_, '_>) {
        for warning in self.warnings() {
            context.warning(None, warning.clone());
        }

        let root = document.root_element().node();
        let name = node_name(root);
        match self.lookup_element(&name) {
            Some(decl) => {
                let validator = InstanceValidator { schema: self };
                // Explicit work stack so nesting depth never grows the call stack
                let mut pending = vec![(root, Arc::clone(decl))];
                while let Some((node, decl)) = pending.pop() {
                    let mark = pending.len();
                    validator.validate_element(node, &decl, context, &mut pending);
                    pending[mark..].reverse();
                }
            }
            None => context.error(
                root,
                format!(
                    "Element '{}': No matching global declaration available for the validation root.",
                    name
                ),
            ),
        }
    }
}

fn node_name(node: Node<'_, '_>) -> QName {
    QName::new(node.tag_name().namespace(), node.tag_name().name())
}

fn element_children<'a, 'input>(node: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
    node.children().filter(|n| n.is_element()).collect()
}

/// Concatenated character data of the direct text children
fn element_text(node: Node<'_, '_>) -> String {
    node.children()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

fn has_character_content(node: Node<'_, '_>) -> bool {
    node.children()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .any(|text| !text.trim().is_empty())
}

fn expected_suffix(expected: &[&XsdLeaf]) -> String {
    if expected.is_empty() {
        return String::new();
    }
    let names: Vec<String> = expected.iter().map(|leaf| leaf.to_string()).collect();
    format!(" Expected is ( {} ).", names.join(", "))
}

struct InstanceValidator<'s> {
    schema: &'s XsdSchema,
}

/// Child elements still to be checked, with the declaration each matched
type Pending<'a, 'input> = Vec<(Node<'a, 'input>, Arc<ElementDecl>)>;

impl<'s> InstanceValidator<'s> {
    fn validate_element<'a, 'input>(
        &self,
        node: Node<'a, 'input>,
        decl: &ElementDecl,
        context: &mut ValidationContext<'_, '_>,
        pending: &mut Pending<'a, 'input>,
    ) {
        let name = node_name(node);

        let type_ref = match node.attribute((XSI_NAMESPACE, "type")) {
            Some(value) => match resolve_prefixed(node, value) {
                Ok(qname) => TypeRef::Named(qname),
                Err(_) => {
                    context.error(
                        node,
                        format!(
                            "Element '{}', attribute 'xsi:type': The QName value '{}' cannot be resolved.",
                            name, value
                        ),
                    );
                    return;
                }
            },
            None => decl.type_ref.clone(),
        };

        let resolved = match self.schema.resolve_type(&type_ref) {
            Some(resolved) => resolved,
            None => {
                let type_name = match &type_ref {
                    TypeRef::Named(qname) => qname.to_string(),
                    _ => "anonymous".to_string(),
                };
                context.error(
                    node,
                    format!(
                        "Element '{}': The type definition '{}' could not be resolved.",
                        name, type_name
                    ),
                );
                return;
            }
        };

        if let ResolvedType::Builtin(Builtin::AnyType) = resolved {
            return;
        }

        if let Some(nil) = node.attribute((XSI_NAMESPACE, "nil")) {
            if !decl.nillable {
                context.error(node, format!("Element '{}': The element is not 'nillable'.", name));
            } else if matches!(nil.trim(), "true" | "1") {
                if node.children().any(|n| n.is_element()) || has_character_content(node) {
                    context.error(
                        node,
                        format!("Element '{}': The element cannot be 'nilled' because it has content.", name),
                    );
                }
                if let ResolvedType::Complex(complex) = resolved {
                    self.check_attributes(node, &name, complex, context);
                }
                return;
            }
        }

        match resolved {
            ResolvedType::Complex(complex) => {
                self.check_attributes(node, &name, complex, context);
                self.check_complex_content(node, &name, complex, decl, context, pending);
            }
            _ => {
                for attribute in node.attributes() {
                    if attribute.namespace() == Some(XSI_NAMESPACE) {
                        continue;
                    }
                    let attribute_name = QName::new(attribute.namespace(), attribute.name());
                    context.error(
                        node,
                        format!(
                            "Element '{}', attribute '{}': The attribute '{}' is not allowed.",
                            name, attribute_name, attribute_name
                        ),
                    );
                }
                if node.children().any(|n| n.is_element()) {
                    context.error(
                        node,
                        format!(
                            "Element '{}': Element content is not allowed, because the type definition is simple.",
                            name
                        ),
                    );
                    return;
                }
                self.check_element_value(node, &name, &type_ref, decl, context);
            }
        }
    }

    fn check_attributes(
        &self,
        node: Node<'_, '_>,
        name: &QName,
        complex: &ComplexType,
        context: &mut ValidationContext<'_, '_>,
    ) {
        for attribute in node.attributes() {
            if attribute.namespace() == Some(XSI_NAMESPACE) {
                continue;
            }
            let attribute_name = QName::new(attribute.namespace(), attribute.name());
            let declared = complex
                .attribute(&attribute_name)
                .filter(|a| a.use_kind != Use::Prohibited)
                .or_else(|| {
                    let wildcard = complex.any_attribute.as_ref()?;
                    if !wildcard.allows(attribute.namespace()) {
                        return None;
                    }
                    match wildcard.process_contents {
                        ProcessContents::Skip => None,
                        _ => self.schema.lookup_attribute(&attribute_name),
                    }
                });

            match declared {
                Some(declaration) => {
                    if let Err(message) = self.check_simple(&declaration.type_ref, attribute.value(), 0) {
                        context.error(
                            node,
                            format!("Element '{}', attribute '{}': {}", name, attribute_name, message),
                        );
                    } else if let Some(fixed) = &declaration.fixed {
                        if !self.same_value(&declaration.type_ref, attribute.value(), fixed) {
                            context.error(
                                node,
                                format!(
                                    "Element '{}', attribute '{}': The value '{}' does not match the fixed value constraint '{}'.",
                                    name,
                                    attribute_name,
                                    attribute.value(),
                                    fixed
                                ),
                            );
                        }
                    }
                }
                None => {
                    let allowed_by_wildcard = complex
                        .any_attribute
                        .as_ref()
                        .map_or(false, |w| {
                            w.allows(attribute.namespace())
                                && w.process_contents != ProcessContents::Strict
                        });
                    let strict_match = complex.any_attribute.as_ref().map_or(false, |w| {
                        w.allows(attribute.namespace()) && w.process_contents == ProcessContents::Strict
                    });
                    if strict_match {
                        context.error(
                            node,
                            format!(
                                "Element '{}', attribute '{}': No matching global attribute declaration available, but demanded by the strict wildcard.",
                                name, attribute_name
                            ),
                        );
                    } else if !allowed_by_wildcard {
                        context.error(
                            node,
                            format!(
                                "Element '{}', attribute '{}': The attribute '{}' is not allowed.",
                                name, attribute_name, attribute_name
                            ),
                        );
                    }
                }
            }
        }

        for declaration in complex.attributes.iter().filter(|a| a.use_kind == Use::Required) {
            let present = node.attributes().any(|a| {
                a.name() == declaration.name.local_name && a.namespace() == declaration.name.namespace.as_deref()
            });
            if !present {
                context.error(
                    node,
                    format!(
                        "Element '{}': The attribute '{}' is required but missing.",
                        name, declaration.name
                    ),
                );
            }
        }
    }

    fn check_complex_content<'a, 'input>(
        &self,
        node: Node<'a, 'input>,
        name: &QName,
        complex: &ComplexType,
        decl: &ElementDecl,
        context: &mut ValidationContext<'_, '_>,
        pending: &mut Pending<'a, 'input>,
    ) {
        match &complex.content {
            ContentType::Empty => {
                if let Some(child) = node.children().find(|n| n.is_element()) {
                    context.error(
                        child,
                        format!("Element '{}': This element is not expected.", node_name(child)),
                    );
                } else if !complex.mixed && has_character_content(node) {
                    context.error(
                        node,
                        format!(
                            "Element '{}': Character content is not allowed, because the content type is empty.",
                            name
                        ),
                    );
                }
            }
            ContentType::Simple(type_ref) => {
                if node.children().any(|n| n.is_element()) {
                    context.error(
                        node,
                        format!(
                            "Element '{}': Element content is not allowed, because the content type is a simple type definition.",
                            name
                        ),
                    );
                    return;
                }
                self.check_element_value(node, name, type_ref, decl, context);
            }
            ContentType::Elements(model) => {
                if !complex.mixed && has_character_content(node) {
                    context.error(
                        node,
                        format!(
                            "Element '{}': Character content other than whitespace is not allowed because the content type is 'element-only'.",
                            name
                        ),
                    );
                }

                let children = element_children(node);
                let names: Vec<QName> = children.iter().map(|child| node_name(*child)).collect();
                match match_content(model, &names, |leaf, child| leaf.matches(child)) {
                    ContentMatch::Complete => {}
                    ContentMatch::Unexpected { index, expected } => {
                        context.error(
                            children[index],
                            format!(
                                "Element '{}': This element is not expected.{}",
                                names[index],
                                expected_suffix(&expected)
                            ),
                        );
                    }
                    ContentMatch::Incomplete { expected } => {
                        context.error(
                            node,
                            format!(
                                "Element '{}': Missing child element(s).{}",
                                name,
                                expected_suffix(&expected)
                            ),
                        );
                    }
                }

                let leaves = model.leaves();
                for (child, child_name) in children.iter().zip(&names) {
                    if let Some(leaf) = leaves.iter().find(|leaf| leaf.matches(child_name)) {
                        if let Some(decl) = self.resolve_leaf(*child, child_name, leaf, context) {
                            pending.push((*child, decl));
                        }
                    }
                }
            }
        }
    }

    /// Declaration a matched child must be checked against, if any
    fn resolve_leaf(
        &self,
        node: Node<'_, '_>,
        name: &QName,
        leaf: &XsdLeaf,
        context: &mut ValidationContext<'_, '_>,
    ) -> Option<Arc<ElementDecl>> {
        match leaf {
            XsdLeaf::Element(decl) => Some(Arc::clone(decl)),
            XsdLeaf::Ref(reference) => {
                let found = self.schema.lookup_element(reference).cloned();
                if found.is_none() {
                    context.error(
                        node,
                        format!(
                            "Element '{}': No matching global element declaration available for the reference '{}'.",
                            name, reference
                        ),
                    );
                }
                found
            }
            XsdLeaf::Any(wildcard) => match wildcard.process_contents {
                ProcessContents::Skip => None,
                ProcessContents::Lax => self.schema.lookup_element(name).cloned(),
                ProcessContents::Strict => {
                    let found = self.schema.lookup_element(name).cloned();
                    if found.is_none() {
                        context.error(
                            node,
                            format!(
                                "Element '{}': No matching global element declaration available, but demanded by the strict wildcard.",
                                name
                            ),
                        );
                    }
                    found
                }
            },
        }
    }

    fn check_element_value(
        &self,
        node: Node<'_, '_>,
        name: &QName,
        type_ref: &TypeRef,
        decl: &ElementDecl,
        context: &mut ValidationContext<'_, '_>,
    ) {
        let text = element_text(node);
        let value: Cow<'_, str> = match (&decl.default, text.is_empty()) {
            (Some(default), true) => Cow::Borrowed(default.as_str()),
            _ => Cow::Owned(text),
        };

        if let Err(message) = self.check_simple(type_ref, &value, 0) {
            context.error(node, format!("Element '{}': {}", name, message));
            return;
        }

        if let Some(fixed) = &decl.fixed {
            if !value.is_empty() && !self.same_value(type_ref, &value, fixed) {
                context.error(
                    node,
                    format!(
                        "Element '{}': The value '{}' does not match the fixed value constraint '{}'.",
                        name, value, fixed
                    ),
                );
            }
        }
    }

    fn same_value(&self, type_ref: &TypeRef, value: &str, fixed: &str) -> bool {
        let white_space = self.facet_base(type_ref, 0).white_space();
        white_space.normalize(value) == white_space.normalize(fixed)
    }

    /// Check `raw` against a simple type, returning the libxml2-style reason
    fn check_simple(&self, type_ref: &TypeRef, raw: &str, depth: usize) -> Result<(), String> {
        if depth > MAX_DERIVATION {
            return Err("The type derivation is too deep.".to_string());
        }
        match self.schema.resolve_type(type_ref) {
            Some(ResolvedType::Builtin(builtin)) => check_builtin(builtin, raw),
            Some(ResolvedType::Simple(simple)) => self.check_simple_type(simple, raw, depth + 1),
            Some(ResolvedType::Complex(complex)) => match &complex.content {
                ContentType::Simple(inner) => self.check_simple(inner, raw, depth + 1),
                _ => Err("A complex type cannot be used for a simple value.".to_string()),
            },
            None => Err(match type_ref {
                TypeRef::Named(qname) => format!("The type definition '{}' could not be resolved.", qname),
                _ => "The type definition could not be resolved.".to_string(),
            }),
        }
    }

    fn check_simple_type(&self, simple: &SimpleType, raw: &str, depth: usize) -> Result<(), String> {
        match simple {
            SimpleType::Builtin(builtin) => check_builtin(*builtin, raw),
            SimpleType::Restriction { base, facets } => {
                self.check_simple(base, raw, depth)?;
                let primitive = self.facet_base(base, depth);
                let white_space = facets
                    .iter()
                    .find_map(|facet| match facet {
                        Facet::WhiteSpace(ws) => Some(*ws),
                        _ => None,
                    })
                    .unwrap_or_else(|| primitive.white_space());
                let normalized = white_space.normalize(raw);
                for facet in facets {
                    facet.check(&normalized, primitive)?;
                }
                Ok(())
            }
            SimpleType::List(item) => {
                let normalized = WhiteSpace::Collapse.normalize(raw);
                for token in normalized.split(' ').filter(|t| !t.is_empty()) {
                    if self.check_simple(item, token, depth).is_err() {
                        return Err(format!("'{}' is not a valid value of the list type.", normalized));
                    }
                }
                Ok(())
            }
            SimpleType::Union(members) => {
                if members.iter().any(|member| self.check_simple(member, raw, depth).is_ok()) {
                    Ok(())
                } else {
                    Err(format!("'{}' is not a valid value of the union type.", raw.trim()))
                }
            }
        }
    }

    /// Builtin that governs facet measurement and ordering for a type
    fn facet_base(&self, type_ref: &TypeRef, depth: usize) -> Builtin {
        if depth > MAX_DERIVATION {
            return Builtin::AnySimpleType;
        }
        match self.schema.resolve_type(type_ref) {
            Some(ResolvedType::Builtin(builtin)) => builtin,
            Some(ResolvedType::Simple(simple)) => match simple {
                SimpleType::Builtin(builtin) => *builtin,
                SimpleType::Restriction { base, .. } => self.facet_base(base, depth + 1),
                SimpleType::List(_) => Builtin::NmTokens,
                SimpleType::Union(_) => Builtin::AnySimpleType,
            },
            Some(ResolvedType::Complex(ComplexType {
                content: ContentType::Simple(inner),
                ..
            })) => self.facet_base(inner, depth + 1),
            _ => Builtin::AnySimpleType,
        }
    }
}

fn check_builtin(builtin: Builtin, raw: &str) -> Result<(), String> {
    let normalized = builtin.white_space().normalize(raw);
    if builtin.is_valid(&normalized) {
        Ok(())
    } else if builtin.is_list() {
        Err(format!(
            "'{}' is not a valid value of the list type '{}'.",
            normalized, builtin
        ))
    } else {
        Err(format!(
            "'{}' is not a valid value of the atomic type '{}'.",
            normalized, builtin
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::Limits;

    const SCHEMA: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="library">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="book" maxOccurs="unbounded">
          <xs:complexType>
            <xs:sequence>
              <xs:element name="title" type="xs:string"/>
              <xs:element name="year" type="Year"/>
              <xs:element name="tags" minOccurs="0">
                <xs:simpleType><xs:list itemType="xs:NCName"/></xs:simpleType>
              </xs:element>
            </xs:sequence>
            <xs:attribute name="id" type="xs:ID" use="required"/>
            <xs:attribute name="lang" type="xs:language" fixed="en"/>
          </xs:complexType>
        </xs:element>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
  <xs:simpleType name="Year">
    <xs:restriction base="xs:integer">
      <xs:minInclusive value="1450"/>
      <xs:maxInclusive value="2100"/>
    </xs:restriction>
  </xs:simpleType>
</xs:schema>"#;

    fn errors_for(xml: &str) -> Vec<String> {
        let schema = XsdSchema::parse(SCHEMA).unwrap();
        let document = Document::parse(xml, &Limits::default()).unwrap();
        let mut context = ValidationContext::new(&document);
        schema.validate_document(&document, &mut context);
        context
            .into_report()
            .errors()
            .map(|d| d.message.clone())
            .collect()
    }

    #[test]
    fn test_valid_document() {
        let errors = errors_for(
            r#"<library>
  <book id="b1" lang="en"><title>Dune</title><year>1965</year><tags>sf classic</tags></book>
  <book id="b2"><title>Emma</title><year>1815</year></book>
</library>"#,
        );
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_unknown_root() {
        let errors = errors_for("<catalog/>");
        assert_eq!(
            errors,
            vec!["Element 'catalog': No matching global declaration available for the validation root."]
        );
    }

    #[test]
    fn test_unexpected_child() {
        let errors = errors_for(
            r#"<library><book id="b1"><title>Dune</title><author>Herbert</author></book></library>"#,
        );
        assert_eq!(
            errors,
            vec!["Element 'author': This element is not expected. Expected is ( year )."]
        );
    }

    #[test]
    fn test_missing_child() {
        let errors = errors_for(r#"<library><book id="b1"><title>Dune</title></book></library>"#);
        assert_eq!(
            errors,
            vec!["Element 'book': Missing child element(s). Expected is ( year )."]
        );
    }

    #[test]
    fn test_attribute_checks() {
        let errors = errors_for(
            r#"<library><book lang="fr" extra="1"><title>T</title><year>2000</year></book></library>"#,
        );
        assert_eq!(errors.len(), 3, "{:?}", errors);
        assert!(errors.iter().any(|e| e.contains("The attribute 'extra' is not allowed.")));
        assert!(errors.iter().any(|e| e.contains("fixed value constraint 'en'")));
        assert!(errors
            .iter()
            .any(|e| e == "Element 'book': The attribute 'id' is required but missing."));
    }

    #[test]
    fn test_value_checks() {
        let errors = errors_for(
            r#"<library><book id="b1"><title>T</title><year>1200</year><tags>ok 1bad</tags></book></library>"#,
        );
        assert_eq!(errors.len(), 2, "{:?}", errors);
        assert!(errors[0].starts_with("Element 'year': [facet 'minInclusive']"));
        assert!(errors[1].contains("is not a valid value of the list type"));

        let errors = errors_for(r#"<library><book id="b1"><title>T</title><year>soon</year></book></library>"#);
        assert_eq!(
            errors,
            vec!["Element 'year': 'soon' is not a valid value of the atomic type 'xs:integer'."]
        );
    }

    #[test]
    fn test_element_only_text() {
        let errors = errors_for(r#"<library>stray<book id="b1"><title>T</title><year>2000</year></book></library>"#);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("'element-only'"));
    }
}
