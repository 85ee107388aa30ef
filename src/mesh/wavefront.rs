use super::AttributedMesh;
use crate::math::{Point, Point2, Real};
use obj::{Group, IndexTuple, Obj, ObjData, ObjError, Object, SimplePolygon};
use std::path::Path;

impl AttributedMesh {
    /// Outputs a Wavefront (`.obj`) file containing the positions and
    /// triangles of this mesh.
    pub fn to_obj_file(&self, path: &Path) -> Result<(), ObjError> {
        let mut file = std::fs::File::create(path)?;

        ObjData {
            position: self.vertices.iter().map(|v| [v.x, v.y, v.z]).collect(),
            objects: vec![Object {
                groups: vec![Group {
                    polys: self
                        .indices
                        .iter()
                        .map(|tri| {
                            SimplePolygon(vec![
                                IndexTuple(tri[0] as usize, None, None),
                                IndexTuple(tri[1] as usize, None, None),
                                IndexTuple(tri[2] as usize, None, None),
                            ])
                        })
                        .collect(),
                    name: "".to_string(),
                    index: 0,
                    material: None,
                }],
                name: "".to_string(),
            }],
            ..Default::default()
        }
        .write_to_buf(&mut file)
    }

    /// Loads a Wavefront (`.obj`) file.
    ///
    /// Polygons are fan-triangulated. Each OBJ group becomes a triangle group
    /// id; the first texture-coordinate layer is kept when every corner of the
    /// file references one.
    pub fn from_obj_file(path: &Path) -> Result<Self, ObjError> {
        let obj = Obj::load(path)?;
        Ok(Self::from_obj_data(&obj.data))
    }

    /// Converts already-parsed OBJ data.
    pub fn from_obj_data(data: &ObjData) -> Self {
        let mut vertices = Vec::new();
        let mut uvs = Vec::new();
        let mut has_uvs = true;
        let mut indices = Vec::new();
        let mut group_ids = Vec::new();
        let mut corner_ids = hashbrown::HashMap::new();

        let mut group_counter = 0u32;
        for object in &data.objects {
            for group in &object.groups {
                for poly in &group.polys {
                    let mut ids = Vec::with_capacity(poly.0.len());
                    for corner in &poly.0 {
                        let key = (corner.0, corner.1);
                        let id = *corner_ids.entry(key).or_insert_with(|| {
                            let p = data.position[corner.0];
                            vertices.push(Point::new(p[0] as Real, p[1] as Real, p[2] as Real));
                            match corner.1.and_then(|t| data.texture.get(t)) {
                                Some(t) => uvs.push(Point2::new(t[0] as Real, t[1] as Real)),
                                None => {
                                    has_uvs = false;
                                    uvs.push(Point2::origin());
                                }
                            }
                            vertices.len() as u32 - 1
                        });
                        ids.push(id);
                    }
                    for k in 1..ids.len().saturating_sub(1) {
                        indices.push([ids[0], ids[k], ids[k + 1]]);
                        group_ids.push(group_counter);
                    }
                }
                group_counter += 1;
            }
        }

        let mut mesh = AttributedMesh::new(vertices, indices);
        mesh.group_ids = group_ids;
        if has_uvs && !mesh.vertices.is_empty() {
            mesh.uv_layers.push(uvs);
        }
        mesh
    }
}
