use crate::collision::CollisionShape;
use crate::error::SourceError;
use crate::mesh::AttributedMesh;
use std::sync::Arc;

/// The name of a material, shared by every mesh referencing it.
pub type MaterialRef = Arc<str>;

/// The identity of a part source: instances with equal keys share one part.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum SourceKey {
    /// A standalone mesh, identified by name.
    Static(String),
    /// An entry of a reusable LOD set.
    LodSet {
        /// Name of the LOD set.
        set: String,
        /// Index of the entry in the set.
        index: usize,
    },
}

/// Gives access to the raw geometry of a part source.
///
/// Implementors only expose what is stored: LOD fallbacks are handled by
/// [`load_part_sources`](super::load_part_sources).
pub trait SourceMeshProvider: Send + Sync {
    /// The identity shared by every instance of this source.
    fn source_key(&self) -> SourceKey;

    /// Checks that this source can be read at all.
    fn validate(&self) -> Result<(), SourceError> {
        Ok(())
    }

    /// The number of LODs stored by this source.
    fn num_lods(&self) -> usize;

    /// The mesh of the given LOD.
    ///
    /// Triangle material ids index [`Self::materials`].
    fn lod_mesh(&self, lod: usize) -> Result<AttributedMesh, SourceError>;

    /// The triangle count of the given LOD, or 0 if it is unavailable.
    fn num_triangles(&self, lod: usize) -> usize {
        self.lod_mesh(lod).map(|m| m.num_triangles()).unwrap_or(0)
    }

    /// The default material of each material slot.
    fn materials(&self) -> Vec<MaterialRef>;

    /// The simple collision primitives, in the source space.
    fn collision_shapes(&self) -> Vec<CollisionShape>;
}

/// A source backed by its own list of LOD meshes.
#[derive(Clone, Debug, Default)]
pub struct StaticSource {
    /// Unique name of this source.
    pub name: String,
    /// The LOD meshes, from the most detailed.
    pub lods: Vec<AttributedMesh>,
    /// Default material of each slot.
    pub materials: Vec<MaterialRef>,
    /// Simple collision primitives.
    pub collision: Vec<CollisionShape>,
}

impl StaticSource {
    /// Creates a source with the given LODs, one default material and no
    /// collision.
    pub fn new(name: impl Into<String>, lods: Vec<AttributedMesh>) -> Self {
        let name = name.into();
        Self {
            materials: vec![MaterialRef::from(name.as_str())],
            name,
            lods,
            collision: Vec::new(),
        }
    }

    /// Replaces the default materials.
    pub fn with_materials(mut self, materials: Vec<MaterialRef>) -> Self {
        self.materials = materials;
        self
    }

    /// Replaces the collision primitives.
    pub fn with_collision_shapes(mut self, collision: Vec<CollisionShape>) -> Self {
        self.collision = collision;
        self
    }

    /// Loads one LOD per Wavefront file.
    #[cfg(feature = "wavefront")]
    pub fn from_obj_files(
        name: impl Into<String>,
        paths: &[impl AsRef<std::path::Path>],
    ) -> Result<Self, SourceError> {
        let lods = paths
            .iter()
            .map(|path| {
                AttributedMesh::from_obj_file(path.as_ref()).map_err(|e| SourceError::Io(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(name, lods))
    }
}

impl SourceMeshProvider for StaticSource {
    fn source_key(&self) -> SourceKey {
        SourceKey::Static(self.name.clone())
    }

    fn num_lods(&self) -> usize {
        self.lods.len()
    }

    fn lod_mesh(&self, lod: usize) -> Result<AttributedMesh, SourceError> {
        self.lods.get(lod).cloned().ok_or(SourceError::MissingLod(lod))
    }

    fn num_triangles(&self, lod: usize) -> usize {
        self.lods.get(lod).map_or(0, |m| m.num_triangles())
    }

    fn materials(&self) -> Vec<MaterialRef> {
        self.materials.clone()
    }

    fn collision_shapes(&self) -> Vec<CollisionShape> {
        self.collision.clone()
    }
}

/// A reusable set of LOD chains, shared by several [`LodSetSource`]s.
#[derive(Clone, Debug, Default)]
pub struct LodSet {
    /// Name of the set.
    pub name: String,
    /// The entries, each a complete source.
    pub entries: Vec<StaticSource>,
}

/// A source referencing one entry of a shared [`LodSet`].
#[derive(Clone, Debug)]
pub struct LodSetSource {
    /// The shared set.
    pub set: Arc<LodSet>,
    /// The referenced entry.
    pub index: usize,
}

impl LodSetSource {
    /// References the `index`-th entry of `set`.
    pub fn new(set: Arc<LodSet>, index: usize) -> Self {
        Self { set, index }
    }

    fn entry(&self) -> Result<&StaticSource, SourceError> {
        self.set
            .entries
            .get(self.index)
            .ok_or(SourceError::InvalidLodSetIndex {
                index: self.index,
                len: self.set.entries.len(),
            })
    }
}

impl SourceMeshProvider for LodSetSource {
    fn source_key(&self) -> SourceKey {
        SourceKey::LodSet {
            set: self.set.name.clone(),
            index: self.index,
        }
    }

    fn validate(&self) -> Result<(), SourceError> {
        self.entry().map(|_| ())
    }

    fn num_lods(&self) -> usize {
        self.entry().map_or(0, |e| e.lods.len())
    }

    fn lod_mesh(&self, lod: usize) -> Result<AttributedMesh, SourceError> {
        self.entry()?.lod_mesh(lod)
    }

    fn num_triangles(&self, lod: usize) -> usize {
        self.entry().map_or(0, |e| e.num_triangles(lod))
    }

    fn materials(&self) -> Vec<MaterialRef> {
        self.entry().map(|e| e.materials.clone()).unwrap_or_default()
    }

    fn collision_shapes(&self) -> Vec<CollisionShape> {
        self.entry().map(|e| e.collision.clone()).unwrap_or_default()
    }
}
