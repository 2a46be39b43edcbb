//! Interactive-form accessor.
//!
//! Fields are enumerated in document order (preorder over `/Fields` and the
//! `/Kids` of non-terminal fields) and keyed by their fully-qualified name.

use std::collections::HashSet;

use crate::model::{Dictionary, Node, ObjRef, ObjectGraph, PdfObject};
use crate::names;

/// Field type, inherited down the field tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Signature,
    Choice,
    Other,
}

impl FieldKind {
    fn from_ft(ft: Option<&str>) -> Self {
        match ft {
            Some(names::SIG) => Self::Signature,
            Some(names::CH) => Self::Choice,
            _ => Self::Other,
        }
    }
}

/// One field of the form, terminal or not.
#[derive(Debug, Clone)]
pub struct FormField<'g> {
    pub name: String,
    pub reference: Option<ObjRef>,
    pub dict: &'g Dictionary,
    pub kind: FieldKind,
    /// The field itself when field and widget are merged, otherwise its pure-widget kids.
    pub widgets: Vec<Node<'g>>,
}

impl<'g> FormField<'g> {
    pub fn is_signature(&self) -> bool {
        self.kind == FieldKind::Signature
    }

    /// Resolved `/V`, if present and not null.
    pub fn value(&self, graph: &'g ObjectGraph) -> Option<Node<'g>> {
        graph
            .entry(self.dict, names::V)
            .filter(|n| !n.object.is_null())
    }

    /// Widget references that are indirect objects.
    pub fn widget_refs(&self) -> impl Iterator<Item = ObjRef> + '_ {
        self.widgets.iter().filter_map(|w| w.reference)
    }
}

/// All fields of a snapshot.
#[derive(Debug, Clone, Default)]
pub struct FormFields<'g> {
    pub fields: Vec<FormField<'g>>,
    /// Field entries that are not dictionaries, by location.
    pub malformed: Vec<String>,
}

impl<'g> FormFields<'g> {
    pub fn iter(&self) -> impl Iterator<Item = &FormField<'g>> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&FormField<'g>> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn references(&self) -> impl Iterator<Item = ObjRef> + '_ {
        self.fields.iter().filter_map(|f| f.reference)
    }
}

/// Resolved `/AcroForm` dictionary of the catalog.
pub fn acro_form(graph: &ObjectGraph) -> Option<Node<'_>> {
    let (_, catalog) = graph.catalog().ok()?;
    graph.dict_entry(catalog, names::ACRO_FORM)
}

struct Pending<'g> {
    object: &'g PdfObject,
    parent: String,
    ft: Option<&'g str>,
}

/// Enumerate every field of the snapshot's form.
pub fn form_fields(graph: &ObjectGraph) -> FormFields<'_> {
    let mut out = FormFields::default();
    let Some(form) = acro_form(graph).and_then(|n| n.as_dict()) else {
        return out;
    };
    let Some(top) = graph.array_entry(form, names::FIELDS).and_then(|n| n.as_array()) else {
        return out;
    };

    let mut visited: HashSet<ObjRef> = HashSet::new();
    let mut stack: Vec<Pending<'_>> = top
        .iter()
        .rev()
        .map(|object| Pending {
            object,
            parent: String::new(),
            ft: None,
        })
        .collect();

    while let Some(Pending { object, parent, ft }) = stack.pop() {
        let Some(node) = graph.node(object) else {
            continue;
        };
        if let Some(r) = node.reference {
            if !visited.insert(r) {
                continue;
            }
        }
        let Some(dict) = node.as_dict() else {
            out.malformed.push(location(node.reference, &parent));
            continue;
        };

        let name = match dict.get_text(names::T) {
            Some(partial) if parent.is_empty() => partial.to_string(),
            Some(partial) => format!("{parent}.{partial}"),
            None => parent.clone(),
        };
        let ft = dict.get_name(names::FT).or(ft);

        let mut widgets = Vec::new();
        let mut children = Vec::new();
        match graph.array_entry(dict, names::KIDS).and_then(|n| n.as_array()) {
            Some(kids) => {
                for kid in kids {
                    let Some(kid_node) = graph.node(kid) else {
                        continue;
                    };
                    match kid_node.as_dict() {
                        Some(kd) if kd.contains_key(names::T) => children.push(kid),
                        Some(_) => widgets.push(kid_node),
                        None => out.malformed.push(location(kid_node.reference, &name)),
                    }
                }
            }
            None => {
                if dict.get_name(names::SUBTYPE) == Some(names::WIDGET) {
                    widgets.push(node);
                }
            }
        }

        for kid in children.into_iter().rev() {
            stack.push(Pending {
                object: kid,
                parent: name.clone(),
                ft,
            });
        }

        out.fields.push(FormField {
            name,
            reference: node.reference,
            dict,
            kind: FieldKind::from_ft(ft),
            widgets,
        });
    }
    out
}

fn location(reference: Option<ObjRef>, parent: &str) -> String {
    match reference {
        Some(r) => r.to_string(),
        None if parent.is_empty() => "<direct>".to_string(),
        None => format!("{parent}.<direct>"),
    }
}

/// A kid without `/T` is a pure widget annotation.
pub fn is_pure_widget(dict: &Dictionary) -> bool {
    !dict.contains_key(names::T)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(n: u32) -> ObjRef {
        ObjRef::new(n, 0)
    }

    fn sample() -> ObjectGraph {
        let mut g = ObjectGraph::new();
        g.insert(
            r(1),
            Dictionary::typed("Catalog").with("AcroForm", r(2)).into(),
        );
        g.insert(
            r(2),
            Dictionary::new()
                .with("Fields", PdfObject::Array(vec![r(3).into(), r(4).into()]))
                .into(),
        );
        // Non-terminal text field with one child field and two widgets on the child.
        g.insert(
            r(3),
            Dictionary::new()
                .with("T", PdfObject::text("person"))
                .with("FT", PdfObject::name("Tx"))
                .with("Kids", PdfObject::Array(vec![r(5).into()]))
                .into(),
        );
        g.insert(
            r(5),
            Dictionary::new()
                .with("T", PdfObject::text("name"))
                .with("Parent", r(3))
                .with("Kids", PdfObject::Array(vec![r(6).into(), r(7).into()]))
                .into(),
        );
        g.insert(r(6), Dictionary::typed("Annot").with("Subtype", PdfObject::name("Widget")).with("Parent", r(5)).into());
        g.insert(r(7), Dictionary::typed("Annot").with("Subtype", PdfObject::name("Widget")).with("Parent", r(5)).into());
        // Merged signature field/widget.
        g.insert(
            r(4),
            Dictionary::new()
                .with("T", PdfObject::text("sig"))
                .with("FT", PdfObject::name("Sig"))
                .with("Subtype", PdfObject::name("Widget"))
                .into(),
        );
        g.set_root(r(1));
        g
    }

    #[test]
    fn fields_in_document_order_with_qualified_names() {
        let g = sample();
        let fields = form_fields(&g);
        let names: Vec<_> = fields.names().collect();
        assert_eq!(names, vec!["person", "person.name", "sig"]);
        assert!(fields.malformed.is_empty());
    }

    #[test]
    fn kind_is_inherited_and_widgets_found() {
        let g = sample();
        let fields = form_fields(&g);
        let name = fields.get("person.name").unwrap();
        assert_eq!(name.kind, FieldKind::Other);
        assert_eq!(name.widget_refs().collect::<Vec<_>>(), vec![r(6), r(7)]);

        let sig = fields.get("sig").unwrap();
        assert!(sig.is_signature());
        assert_eq!(sig.widget_refs().collect::<Vec<_>>(), vec![r(4)]);
        assert!(sig.value(&g).is_none());
    }

    #[test]
    fn cyclic_kids_do_not_loop() {
        let mut g = sample();
        g.insert(
            r(5),
            Dictionary::new()
                .with("T", PdfObject::text("name"))
                .with("Kids", PdfObject::Array(vec![r(3).into()]))
                .into(),
        );
        let fields = form_fields(&g);
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn non_dictionary_fields_are_reported() {
        let mut g = sample();
        g.insert(r(4), PdfObject::Int(3));
        let fields = form_fields(&g);
        assert_eq!(fields.malformed, vec!["4 0 R".to_string()]);
    }

    #[test]
    fn no_form_means_no_fields() {
        let mut g = ObjectGraph::new();
        g.insert(r(1), Dictionary::typed("Catalog").into());
        g.set_root(r(1));
        assert!(form_fields(&g).is_empty());
        assert!(acro_form(&g).is_none());
    }
}
