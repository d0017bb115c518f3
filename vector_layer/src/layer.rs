use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use anyhow::{bail, Context, Result};
use geo::Geometry;
use geojson::{Feature as GeoJsonFeature, FeatureCollection, GeoJson};
use serde::{Deserialize, Serialize};

use geom::Crs;

use crate::files::{delete_layer, schema_path};
use crate::{Field, Value};

/// Assigned by the layer in load or insertion order, starting at 0. Ids are fresh every time a
/// layer is opened, so they only mean something within one load session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeatureId(pub usize);

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "feature #{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    Line,
    Polygon,
}

impl GeometryKind {
    pub fn of(geom: &Geometry) -> Option<GeometryKind> {
        match geom {
            Geometry::Point(_) | Geometry::MultiPoint(_) => Some(GeometryKind::Point),
            Geometry::Line(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) => {
                Some(GeometryKind::Line)
            }
            Geometry::Polygon(_)
            | Geometry::MultiPolygon(_)
            | Geometry::Rect(_)
            | Geometry::Triangle(_) => Some(GeometryKind::Polygon),
            Geometry::GeometryCollection(gc) => gc.iter().find_map(GeometryKind::of),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Feature {
    pub id: FeatureId,
    pub geometry: Geometry,
    /// One value per field of the layer, in field order
    pub attributes: Vec<Value>,
}

#[derive(Serialize, Deserialize)]
struct Schema {
    kind: GeometryKind,
    epsg: u32,
    fields: Vec<Field>,
}

/// An ordered collection of features sharing one geometry kind, one schema, and one CRS.
#[derive(Clone, Debug)]
pub struct Layer {
    pub crs: Crs,
    pub kind: GeometryKind,
    fields: Vec<Field>,
    features: Vec<Feature>,
}

impl Layer {
    pub fn new(crs: Crs, kind: GeometryKind, fields: Vec<Field>) -> Layer {
        Layer {
            crs,
            kind,
            fields,
            features: Vec::new(),
        }
    }

    /// Same CRS, kind, and schema, but no features.
    pub fn empty_like(&self) -> Layer {
        Layer::new(self.crs, self.kind, self.fields.clone())
    }

    /// Loads a persisted layer, assigning fresh feature ids.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Layer> {
        let path = path.as_ref();
        Layer::load(path).with_context(|| format!("invalid layer {}", path.display()))
    }

    fn load(path: &Path) -> Result<Layer> {
        let schema: Schema = serde_json::from_str(&fs_err::read_to_string(schema_path(path))?)?;
        let crs = Crs::from_epsg(schema.epsg)?;
        let collection = match fs_err::read_to_string(path)?.parse::<GeoJson>()? {
            GeoJson::FeatureCollection(collection) => collection,
            _ => bail!("not a FeatureCollection"),
        };

        let mut layer = Layer::new(crs, schema.kind, schema.fields);
        for feature in collection.features {
            let geometry = match feature.geometry {
                Some(ref geometry) => Geometry::<f64>::try_from(geometry.clone())?,
                None => Geometry::GeometryCollection(geo::GeometryCollection(Vec::new())),
            };
            let attributes = layer
                .fields
                .iter()
                .map(|field| {
                    feature
                        .property(&field.name)
                        .map(|value| Value::from_json(value, field.field_type))
                        .unwrap_or(Value::Null)
                })
                .collect();
            layer.push(geometry, attributes);
        }
        Ok(layer)
    }

    /// Writes the layer's file group, replacing any existing layer at that path.
    pub fn export<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        delete_layer(path)?;
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs_err::create_dir_all(dir)?;
            }
        }

        let features = self
            .features
            .iter()
            .map(|f| {
                let mut properties = serde_json::Map::new();
                for (field, value) in self.fields.iter().zip(f.attributes.iter()) {
                    properties.insert(field.name.clone(), value.to_json());
                }
                GeoJsonFeature {
                    bbox: None,
                    geometry: Some(geojson::Geometry::new(geojson::Value::from(&f.geometry))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();
        let collection = FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        };
        fs_err::write(path, GeoJson::from(collection).to_string())?;

        let schema = Schema {
            kind: self.kind,
            epsg: self.crs.epsg(),
            fields: self.fields.clone(),
        };
        fs_err::write(schema_path(path), serde_json::to_string_pretty(&schema)?)?;
        debug!(
            "Exported {} features to {}",
            self.features.len(),
            path.display()
        );
        Ok(())
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Like `index_of`, but a missing field is an error.
    pub fn field_index(&self, name: &str) -> Result<usize> {
        match self.index_of(name) {
            Some(idx) => Ok(idx),
            None => bail!(
                "no field {} (have {:?})",
                name,
                self.fields.iter().map(|f| &f.name).collect::<Vec<_>>()
            ),
        }
    }

    /// Appends fields to the schema. Existing features get nulls.
    pub fn add_attributes(&mut self, fields: Vec<Field>) -> Result<()> {
        for field in &fields {
            if self.index_of(&field.name).is_some() {
                bail!("field {} already exists", field.name);
            }
        }
        let num_new = fields.len();
        self.fields.extend(fields);
        for f in &mut self.features {
            f.attributes
                .extend(std::iter::repeat(Value::Null).take(num_new));
        }
        Ok(())
    }

    /// Removes fields by index, along with their values.
    pub fn delete_attributes(&mut self, indices: &[usize]) -> Result<()> {
        let doomed: BTreeSet<usize> = indices.iter().cloned().collect();
        if let Some(idx) = doomed.iter().find(|idx| **idx >= self.fields.len()) {
            bail!("can't delete field {}; only {} fields", idx, self.fields.len());
        }
        for idx in doomed.into_iter().rev() {
            self.fields.remove(idx);
            for f in &mut self.features {
                f.attributes.remove(idx);
            }
        }
        Ok(())
    }

    pub fn delete_all_attributes(&mut self) {
        self.fields.clear();
        for f in &mut self.features {
            f.attributes.clear();
        }
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn get(&self, id: FeatureId) -> Option<&Feature> {
        self.features.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Appends a feature, casting values to the field types. Missing trailing values are null.
    pub fn push(&mut self, geometry: Geometry, attributes: Vec<Value>) -> FeatureId {
        let id = FeatureId(self.features.len());
        let mut values: Vec<Value> = self
            .fields
            .iter()
            .zip(attributes.iter())
            .map(|(field, value)| value.cast(field.field_type))
            .collect();
        values.resize(self.fields.len(), Value::Null);
        self.features.push(Feature {
            id,
            geometry,
            attributes: values,
        });
        id
    }

    /// Writes per-feature attribute values, keyed by feature id and then field index.
    pub fn change_attribute_values(
        &mut self,
        changes: BTreeMap<FeatureId, BTreeMap<usize, Value>>,
    ) -> Result<()> {
        for (id, values) in changes {
            let num_features = self.features.len();
            let feature = match self.features.get_mut(id.0) {
                Some(f) => f,
                None => bail!("no {}; the layer has {} features", id, num_features),
            };
            for (idx, value) in values {
                match self.fields.get(idx) {
                    Some(field) => {
                        feature.attributes[idx] = value.cast(field.field_type);
                    }
                    None => bail!("no field {} to change on {}", idx, id),
                }
            }
        }
        Ok(())
    }

    pub fn map_geometries<F: FnMut(&Geometry) -> Geometry>(&mut self, mut f: F) {
        for feature in &mut self.features {
            feature.geometry = f(&feature.geometry);
        }
    }

    /// A new layer with just the chosen features, in their original order, with fresh ids.
    pub fn materialize(&self, ids: &BTreeSet<FeatureId>) -> Layer {
        let mut result = self.empty_like();
        for f in &self.features {
            if ids.contains(&f.id) {
                result.push(f.geometry.clone(), f.attributes.clone());
            }
        }
        result
    }
}
