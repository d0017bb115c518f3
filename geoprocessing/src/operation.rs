use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Error};

use geom::Crs;
use vector_layer::Value;

pub const DEFAULT_EPSG: u32 = 32650;

/// The projected CRS everything is measured in unless configured otherwise: WGS84 / UTM 50N.
pub fn default_crs() -> Crs {
    Crs::Utm {
        zone: 50,
        north: true,
    }
}

/// How `ExtractByAttribute` compares a field against a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    IsNull,
    IsNotNull,
}

impl FromStr for Comparison {
    type Err = Error;

    fn from_str(x: &str) -> Result<Comparison, Error> {
        Ok(match x.trim().to_lowercase().as_str() {
            "=" => Comparison::Equal,
            "!=" | "<>" => Comparison::NotEqual,
            ">" => Comparison::Greater,
            ">=" => Comparison::GreaterOrEqual,
            "<" => Comparison::Less,
            "<=" => Comparison::LessOrEqual,
            "is null" => Comparison::IsNull,
            "is not null" => Comparison::IsNotNull,
            _ => bail!("unknown comparison operator {}", x),
        })
    }
}

/// One call to the geometry processing service. Every operation reads its named input layers and
/// writes the declared output layer, or fails without one.
#[derive(Clone, Debug)]
pub enum Operation {
    Reproject {
        input: PathBuf,
        target_crs: Crs,
        output: PathBuf,
    },
    /// Cuts every line of `input` wherever a line of `lines` crosses it. When both are the same
    /// layer, every part is cut by every other part, but never by itself.
    SplitWithLines {
        input: PathBuf,
        lines: PathBuf,
        output: PathBuf,
    },
    Centroids {
        input: PathBuf,
        /// One point per part of multi-part geometries, instead of one per feature
        all_parts: bool,
        output: PathBuf,
    },
    /// Writes the spatial index sidecar in place; the output is the input.
    CreateSpatialIndex { input: PathBuf },
    /// Copies attributes from the first feature of `input_2` whose `field_2` equals `field`.
    JoinAttributesTable {
        input: PathBuf,
        field: String,
        input_2: PathBuf,
        field_2: String,
        /// Empty means every field
        fields_to_copy: Vec<String>,
        discard_nonmatching: bool,
        prefix: String,
        /// Holds the matched feature's id, or null when nothing matched
        id_field: String,
        output: PathBuf,
    },
    ExtractByAttribute {
        input: PathBuf,
        field: String,
        operator: Comparison,
        value: Value,
        output: PathBuf,
    },
    /// Keeps the features of `input` within `distance` of any feature of `reference`.
    ExtractWithinDistance {
        input: PathBuf,
        reference: PathBuf,
        distance: f64,
        output: PathBuf,
    },
    Dissolve {
        input: PathBuf,
        output: PathBuf,
    },
    /// Every point where a line of `input` meets a line of `intersect`, with both features'
    /// attributes.
    LineIntersections {
        input: PathBuf,
        intersect: PathBuf,
        output: PathBuf,
    },
    /// Vertex positions to extract; negative counts from the end.
    ExtractSpecificVertices {
        input: PathBuf,
        vertices: Vec<i64>,
        output: PathBuf,
    },
    MergeVectorLayers {
        layers: Vec<PathBuf>,
        crs: Crs,
        output: PathBuf,
    },
    Buffer {
        input: PathBuf,
        distance: f64,
        dissolve: bool,
        output: PathBuf,
    },
    PolygonsToLines {
        input: PathBuf,
        output: PathBuf,
    },
    LinesToPolygons {
        input: PathBuf,
        output: PathBuf,
    },
}

impl Operation {
    pub fn reproject(input: PathBuf, output: PathBuf) -> Operation {
        Operation::Reproject {
            input,
            target_crs: default_crs(),
            output,
        }
    }

    pub fn centroids(input: PathBuf, output: PathBuf) -> Operation {
        Operation::Centroids {
            input,
            all_parts: true,
            output,
        }
    }

    /// A left outer join taking every field, with the matched id in `FID_2`.
    pub fn join(
        input: PathBuf,
        field: &str,
        input_2: PathBuf,
        field_2: &str,
        output: PathBuf,
    ) -> Operation {
        Operation::JoinAttributesTable {
            input,
            field: field.to_string(),
            input_2,
            field_2: field_2.to_string(),
            fields_to_copy: Vec::new(),
            discard_nonmatching: false,
            prefix: String::new(),
            id_field: "FID_2".to_string(),
            output,
        }
    }

    /// The first and last vertex of every feature.
    pub fn endpoints(input: PathBuf, output: PathBuf) -> Operation {
        Operation::ExtractSpecificVertices {
            input,
            vertices: vec![0, -1],
            output,
        }
    }

    pub fn merge(layers: Vec<PathBuf>, output: PathBuf) -> Operation {
        Operation::MergeVectorLayers {
            layers,
            crs: default_crs(),
            output,
        }
    }

    pub fn buffer(input: PathBuf, distance: f64, output: PathBuf) -> Operation {
        Operation::Buffer {
            input,
            distance,
            dissolve: true,
            output,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Reproject { .. } => "reproject",
            Operation::SplitWithLines { .. } => "split with lines",
            Operation::Centroids { .. } => "centroids",
            Operation::CreateSpatialIndex { .. } => "create spatial index",
            Operation::JoinAttributesTable { .. } => "join attributes table",
            Operation::ExtractByAttribute { .. } => "extract by attribute",
            Operation::ExtractWithinDistance { .. } => "extract within distance",
            Operation::Dissolve { .. } => "dissolve",
            Operation::LineIntersections { .. } => "line intersections",
            Operation::ExtractSpecificVertices { .. } => "extract specific vertices",
            Operation::MergeVectorLayers { .. } => "merge vector layers",
            Operation::Buffer { .. } => "buffer",
            Operation::PolygonsToLines { .. } => "polygons to lines",
            Operation::LinesToPolygons { .. } => "lines to polygons",
        }
    }

    /// Where the result lands on success.
    pub fn output(&self) -> &PathBuf {
        match self {
            Operation::CreateSpatialIndex { input } => input,
            Operation::Reproject { output, .. }
            | Operation::SplitWithLines { output, .. }
            | Operation::Centroids { output, .. }
            | Operation::JoinAttributesTable { output, .. }
            | Operation::ExtractByAttribute { output, .. }
            | Operation::ExtractWithinDistance { output, .. }
            | Operation::Dissolve { output, .. }
            | Operation::LineIntersections { output, .. }
            | Operation::ExtractSpecificVertices { output, .. }
            | Operation::MergeVectorLayers { output, .. }
            | Operation::Buffer { output, .. }
            | Operation::PolygonsToLines { output, .. }
            | Operation::LinesToPolygons { output, .. } => output,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} -> {}", self.name(), self.output().display())
    }
}
