use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use anyhow::{bail, Result};

use vector_layer::{Feature, FeatureId, Field, FieldType, Layer, Value};

use crate::Comparison;

pub struct Join<'a> {
    pub input: &'a Path,
    pub field: &'a str,
    pub input_2: &'a Path,
    pub field_2: &'a str,
    pub fields_to_copy: &'a [String],
    pub discard_nonmatching: bool,
    pub prefix: &'a str,
    pub id_field: &'a str,
}

/// `base` followed by `extra`, renaming any clashing name in `extra` to `name_2`, `name_3`, and so
/// on.
pub fn combine_fields(base: &[Field], extra: &[Field]) -> Vec<Field> {
    let mut result = base.to_vec();
    for field in extra {
        let mut name = field.name.clone();
        let mut suffix = 2;
        while result.iter().any(|f| f.name == name) {
            name = format!("{}_{}", field.name, suffix);
            suffix += 1;
        }
        result.push(Field::new(name, field.field_type));
    }
    result
}

// Int 3, Real 3.0, and Text "3" all join with each other
fn join_key(value: &Value) -> Option<String> {
    if value.is_null() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Left outer join (unless unmatched rows are discarded), taking the first matching feature of
/// the second layer.
pub fn join(params: Join, output: &Path) -> Result<()> {
    let layer = Layer::open(params.input)?;
    let table = Layer::open(params.input_2)?;
    let key = layer.field_index(params.field)?;
    let key_2 = table.field_index(params.field_2)?;

    let copy: Vec<usize> = if params.fields_to_copy.is_empty() {
        (0..table.fields().len()).collect()
    } else {
        params
            .fields_to_copy
            .iter()
            .map(|name| table.field_index(name))
            .collect::<Result<_>>()?
    };
    let copied: Vec<Field> = copy
        .iter()
        .map(|idx| {
            let f = &table.fields()[*idx];
            Field::new(format!("{}{}", params.prefix, f.name), f.field_type)
        })
        .collect();
    let mut fields = combine_fields(layer.fields(), &copied);
    if fields.iter().any(|f| f.name == params.id_field) {
        bail!("the joined layer already has a field {}", params.id_field);
    }
    fields.push(Field::new(params.id_field, FieldType::Int));

    let mut lookup: HashMap<String, &Feature> = HashMap::new();
    for f in table.features() {
        if let Some(k) = join_key(&f.attributes[key_2]) {
            lookup.entry(k).or_insert(f);
        }
    }

    let mut result = Layer::new(layer.crs, layer.kind, fields);
    let mut matches = 0;
    for f in layer.features() {
        let mut attributes = f.attributes.clone();
        match join_key(&f.attributes[key]).and_then(|k| lookup.get(&k)) {
            Some(other) => {
                matches += 1;
                attributes.extend(copy.iter().map(|idx| other.attributes[*idx].clone()));
                attributes.push(Value::Int(other.id.0 as i64));
            }
            None => {
                if params.discard_nonmatching {
                    continue;
                }
                attributes.extend(std::iter::repeat(Value::Null).take(copy.len() + 1));
            }
        }
        result.push(f.geometry.clone(), attributes);
    }
    debug!(
        "Joined {} of {} features on {} = {}",
        matches,
        layer.len(),
        params.field,
        params.field_2
    );
    result.export(output)
}

fn matches(operator: Comparison, actual: &Value, expected: &Value) -> bool {
    use std::cmp::Ordering::*;

    match operator {
        Comparison::IsNull => actual.is_null(),
        Comparison::IsNotNull => !actual.is_null(),
        _ => match actual.compare(expected) {
            Some(ord) => match operator {
                Comparison::Equal => ord == Equal,
                Comparison::NotEqual => ord != Equal,
                Comparison::Greater => ord == Greater,
                Comparison::GreaterOrEqual => ord != Less,
                Comparison::Less => ord == Less,
                Comparison::LessOrEqual => ord != Greater,
                Comparison::IsNull | Comparison::IsNotNull => unreachable!(),
            },
            // Comparing against null, or text against a number, never matches
            None => false,
        },
    }
}

pub fn extract_by_attribute(
    input: &Path,
    field: &str,
    operator: Comparison,
    value: &Value,
    output: &Path,
) -> Result<()> {
    let layer = Layer::open(input)?;
    let idx = layer.field_index(field)?;
    let keep: BTreeSet<FeatureId> = layer
        .features()
        .iter()
        .filter(|f| matches(operator, &f.attributes[idx], value))
        .map(|f| f.id)
        .collect();
    layer.materialize(&keep).export(output)
}
