/*
Implements:
 - procedures to read and write the normalized json layout form
 - procedures to produce a layout database from it and vice-versa
*/
use std::fs;

use serde::{Serialize, Deserialize};

use crate::color::VertexId;
use crate::geometry::Coord;
use crate::layout::{Config, LayoutDb, MplError};

/// layer receiving residual conflict edges in the output
pub const CONFLICT_LAYER: i32 = 10000;
/// layer receiving taken stitch edges in the output
pub const STITCH_LAYER: i32 = 10001;

/** one shape of the normalized layout form */
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JsonShape {
    /// layer number
    pub layer: i32,
    /// vertex list (closed loops may repeat the first point)
    pub points: Vec<(Coord, Coord)>,
}

/** data structure to represent a layout in the normalized json form */
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JsonLayout {
    /// database unit in meter
    pub unit: f64,
    /// shapes, in record order
    pub shapes: Vec<JsonShape>,
}

impl JsonLayout {
    /** reads a layout from a json file */
    pub fn from_file(filename:&str) -> Result<Self, MplError> {
        let str = fs::read_to_string(filename)
            .map_err(|e| MplError::Io { path:filename.to_string(), source:e })?;
        serde_json::from_str(&str)
            .map_err(|e| MplError::Parse { path:filename.to_string(), msg:e.to_string() })
    }

    /** writes the layout into a json file */
    pub fn to_file(&self, filename:&str) -> Result<(), MplError> {
        let str = serde_json::to_string_pretty(self)
            .map_err(|e| MplError::Parse { path:filename.to_string(), msg:e.to_string() })?;
        fs::write(filename, str)
            .map_err(|e| MplError::Io { path:filename.to_string(), source:e })
    }

    /** converts to an initialized layout database.
    A malformed record aborts with a diagnostic naming it. */
    pub fn into_db(self, config:Config) -> Result<LayoutDb, MplError> {
        let mut db = LayoutDb::new(config);
        db.set_unit(self.unit);
        for (i, shape) in self.shapes.iter().enumerate() {
            db.add(shape.layer, &shape.points).map_err(|e| match e {
                MplError::Ingest(msg) => MplError::Ingest(format!("record {}: {}", i, msg)),
                other => other,
            })?;
        }
        db.initialize();
        Ok(db)
    }

    /** snapshot of a database in the input form (original layers),
    suitable for re-ingestion */
    pub fn snapshot(db:&LayoutDb) -> Self {
        Self {
            unit: db.unit(),
            shapes: db.patterns().iter().map(|p| JsonShape {
                layer: p.layer,
                points: p.rect.corners().to_vec(),
            }).collect(),
        }
    }

    /** colored result of a decomposition: each pattern lands on derived
    layer `layer*10 + color`, residual conflicts and taken stitches are
    two-point segments on dedicated layers */
    pub fn result(
        db:&LayoutDb,
        conflicts:&[(VertexId, VertexId)],
        stitches:&[(VertexId, VertexId)],
    ) -> Self {
        let mut shapes:Vec<JsonShape> = db.patterns().iter().map(|p| JsonShape {
            layer: if p.color >= 0 { p.layer*10 + p.color as i32 } else { p.layer },
            points: p.rect.corners().to_vec(),
        }).collect();
        for (layer, pairs) in &[(CONFLICT_LAYER, conflicts), (STITCH_LAYER, stitches)] {
            for (u,v) in pairs.iter() {
                shapes.push(JsonShape {
                    layer: *layer,
                    points: vec![db.pattern(*u).rect.center(), db.pattern(*v).rect.center()],
                });
            }
        }
        Self { unit: db.unit(), shapes }
    }
}
