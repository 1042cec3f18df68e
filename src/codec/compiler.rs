//! Compilation of object descriptions into struct codecs.

use crate::error::{Result, WireError};
use crate::types::TypeDescription;

use super::StructSerializer;

/// Compile a registrable object description into a codec bound to `type_id`.
///
/// The result depends only on the description and the id, so compiling the
/// same description twice yields the same fixed-size hint.
pub fn compile(type_id: u32, description: &TypeDescription) -> Result<StructSerializer> {
    description.validate_registrable()?;
    let TypeDescription::Object { tag, fields } = description else {
        return Err(WireError::codec("only object descriptions can be registered"));
    };
    Ok(StructSerializer::new(type_id, tag.as_str(), fields))
}

/// Object definitions contained in `description`, root first.
///
/// Nested objects with at least one field are inline definitions and are
/// returned in pre-order. Field-less nested objects are references by tag and
/// are skipped.
pub fn definitions(description: &TypeDescription) -> Vec<&TypeDescription> {
    let mut out = vec![description];
    if let TypeDescription::Object { fields, .. } = description {
        for field in fields {
            collect_nested(&field.ty, &mut out);
        }
    }
    out
}

fn collect_nested<'a>(description: &'a TypeDescription, out: &mut Vec<&'a TypeDescription>) {
    match description {
        TypeDescription::Object { fields, .. } if !fields.is_empty() => {
            out.push(description);
            for field in fields {
                collect_nested(&field.ty, out);
            }
        }
        TypeDescription::Array { item } => collect_nested(item, out),
        TypeDescription::Map { key, value } => {
            collect_nested(key, out);
            collect_nested(value, out);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Serializer;
    use crate::types::FieldDescription;

    fn order() -> TypeDescription {
        TypeDescription::object(
            "shop.order",
            vec![
                FieldDescription::new(
                    "lines",
                    TypeDescription::array(TypeDescription::object(
                        "shop.line",
                        vec![
                            FieldDescription::new("sku", TypeDescription::String),
                            FieldDescription::new(
                                "price",
                                TypeDescription::object(
                                    "shop.money",
                                    vec![FieldDescription::new("cents", TypeDescription::Int64)],
                                ),
                            ),
                        ],
                    )),
                ),
                FieldDescription::new("parent", TypeDescription::object_ref("shop.order")),
                FieldDescription::new(
                    "notes",
                    TypeDescription::map(
                        TypeDescription::String,
                        TypeDescription::object(
                            "shop.note",
                            vec![FieldDescription::new("text", TypeDescription::String)],
                        ),
                    ),
                ),
            ],
        )
    }

    #[test]
    fn test_definitions_pre_order() {
        let description = order();
        let tags: Vec<_> = definitions(&description)
            .into_iter()
            .filter_map(TypeDescription::tag)
            .collect();
        assert_eq!(tags, vec!["shop.order", "shop.line", "shop.money", "shop.note"]);
    }

    #[test]
    fn test_compile_is_deterministic() {
        let a = compile(64, &order()).unwrap();
        let b = compile(64, &order()).unwrap();
        assert_eq!(a.fixed_size(), b.fixed_size());
        assert_eq!(a.info(), b.info());
        assert_eq!(a.tag(), "shop.order");
    }

    #[test]
    fn test_compile_rejects_non_objects() {
        assert!(compile(64, &TypeDescription::Int32).is_err());
    }
}
