//! XML layout of a stored scene.
//!
//! ```xml
//! <scene>
//!   <primitive type="disk_a" position="xy">
//!     <parameter name="inclination" value="0" min="-180" max="180" free="false"/>
//!     ...
//!     <offset name="x" value="0" min="-100" max="100" free="false"/>
//!   </primitive>
//! </scene>
//! ```
//!
//! Loading recreates each primitive through the registry, swaps in the
//! stored position model and then applies the stored records, which must
//! match the parameter layout of both. A missing `position` means `xy`.

use quick_xml::de::from_str;
use quick_xml::se::to_string_with_root;
use serde::{Deserialize, Serialize};

use crate::params::{ParameterError, ParameterSet};
use crate::position::PositionXy;
use crate::registry::{ModelRegistry, positions};

use super::{Scene, SceneError};

const ROOT: &str = "scene";

#[derive(Debug, Default, Serialize, Deserialize)]
struct SceneDocument {
    #[serde(default, rename = "primitive")]
    primitives: Vec<PrimitiveRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PrimitiveRecord {
    #[serde(rename = "@type")]
    identifier: String,
    #[serde(rename = "@position", default = "default_placement")]
    placement: String,
    #[serde(default, rename = "parameter")]
    parameters: Vec<ParameterRecord>,
    #[serde(default, rename = "offset")]
    position: Vec<ParameterRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ParameterRecord {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@value")]
    value: f64,
    #[serde(rename = "@min")]
    min: f64,
    #[serde(rename = "@max")]
    max: f64,
    #[serde(rename = "@free")]
    free: bool,
}

fn default_placement() -> String {
    PositionXy::IDENTIFIER.to_owned()
}

fn records(set: &ParameterSet) -> Vec<ParameterRecord> {
    set.iter()
        .map(|p| ParameterRecord {
            name: p.name().to_owned(),
            value: p.value(),
            min: p.min(),
            max: p.max(),
            free: p.is_free(),
        })
        .collect()
}

/// Serializes `scene` to XML.
pub fn to_xml(scene: &Scene) -> Result<String, SceneError> {
    let document = SceneDocument {
        primitives: scene
            .iter()
            .map(|p| PrimitiveRecord {
                identifier: p.identifier().to_owned(),
                placement: p.placement().identifier().to_owned(),
                parameters: records(p.parameters()),
                position: records(p.position()),
            })
            .collect(),
    };
    Ok(to_string_with_root(ROOT, &document)?)
}

/// Rebuilds a scene from XML, creating primitives through `registry`.
pub fn from_xml(xml: &str, registry: &ModelRegistry) -> Result<Scene, SceneError> {
    let document: SceneDocument = from_str(xml)?;
    log::debug!("loading scene with {} primitives", document.primitives.len());

    let mut scene = Scene::new();
    for (index, record) in document.primitives.iter().enumerate() {
        let mut primitive = registry.create(&record.identifier)?;
        if primitive.placement().identifier() != record.placement {
            primitive.set_placement(positions().create(&record.placement)?);
        }
        apply(&record.identifier, &record.parameters, primitive.parameters_mut())
            .and_then(|()| apply(&record.identifier, &record.position, primitive.position_mut()))
            .map_err(|err| match err {
                Applied::Layout(reason) => SceneError::LayoutMismatch {
                    identifier: record.identifier.clone(),
                    reason,
                },
                Applied::Parameter(source) => SceneError::Parameter { index, source },
            })?;
        scene.add_primitive(primitive);
    }
    Ok(scene)
}

enum Applied {
    Layout(String),
    Parameter(ParameterError),
}

fn apply(
    identifier: &str,
    stored: &[ParameterRecord],
    set: &mut ParameterSet,
) -> Result<(), Applied> {
    if stored.len() != set.len() {
        return Err(Applied::Layout(format!(
            "expected {} parameters, found {}",
            set.len(),
            stored.len()
        )));
    }
    for (index, record) in stored.iter().enumerate() {
        let expected = set.get(index).map_err(Applied::Parameter)?.name();
        if expected != record.name {
            return Err(Applied::Layout(format!(
                "parameter {index} of `{identifier}` is `{expected}`, found `{}`",
                record.name
            )));
        }
        set.assign(index, record.value, record.min, record.max, record.free)
            .map_err(Applied::Parameter)?;
    }
    Ok(())
}
