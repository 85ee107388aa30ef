use super::SourceMeshProvider;
use crate::collision::CollisionShape;
use crate::error::SourceError;
use crate::math::Real;
use crate::mesh::AttributedMesh;
use crate::planar::planar_retriangulate_part_mesh;

/// What [`load_part_sources`] extracts from a provider.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SourceRequest {
    /// Number of source LODs in the returned chain.
    pub num_lods: usize,
    /// Source LODs from this index on are planar-retriangulated.
    pub retriangulate_start_lod: Option<usize>,
    /// Tolerance of the source retriangulation.
    pub retriangulate_tolerance: Real,
}

/// The raw geometry of one part.
#[derive(Clone, Debug, Default)]
pub struct PartSources {
    /// Exactly as many LODs as requested, or none if the source has no
    /// geometry at all.
    pub lods: Vec<AttributedMesh>,
    /// Simple collision primitives, in the part space.
    pub collision: Vec<CollisionShape>,
}

impl PartSources {
    /// The `lod`-th source LOD, clamped to the available chain.
    pub fn lod(&self, lod: usize) -> Option<&AttributedMesh> {
        self.lods.get(lod.min(self.lods.len().saturating_sub(1)))
    }
}

fn fetch(provider: &dyn SourceMeshProvider, lod: usize) -> Option<AttributedMesh> {
    match provider.lod_mesh(lod) {
        Ok(mesh) if mesh.num_triangles() > 0 => Some(mesh),
        Ok(_) | Err(SourceError::MissingLod(_)) => None,
        Err(err) => {
            log::warn!("Failed to extract LOD {} of {:?}: {}", lod, provider.source_key(), err);
            None
        }
    }
}

/// Extracts the source LOD chain and collision primitives of a part.
///
/// Levels the provider does not store fall back to LOD 0. Any level still
/// missing is filled with a copy of the previous available one, and an empty
/// LOD 0 takes the first non-empty level, so the chain always has
/// `request.num_lods` entries unless the provider has no geometry at all.
pub fn load_part_sources(provider: &dyn SourceMeshProvider, request: &SourceRequest) -> PartSources {
    let collision = provider.collision_shapes();
    if request.num_lods == 0 {
        return PartSources {
            lods: Vec::new(),
            collision,
        };
    }

    let stored = provider.num_lods();
    let base = fetch(provider, 0);

    let mut lods: Vec<Option<AttributedMesh>> = (0..request.num_lods)
        .map(|lod| match lod {
            0 => base.clone(),
            lod if lod >= stored => base.clone(),
            lod => fetch(provider, lod),
        })
        .collect();

    // Back-fill from the previous available LOD; leading gaps take the first
    // available one.
    let Some(first) = lods.iter().flatten().next().cloned() else {
        log::warn!("Source {:?} has no geometry.", provider.source_key());
        return PartSources {
            lods: Vec::new(),
            collision,
        };
    };
    let mut previous = first;
    for lod in &mut lods {
        match lod {
            Some(mesh) => previous = mesh.clone(),
            None => *lod = Some(previous.clone()),
        }
    }

    let mut lods: Vec<AttributedMesh> = lods.into_iter().flatten().collect();
    if let Some(start) = request.retriangulate_start_lod {
        for mesh in lods.iter_mut().skip(start) {
            let retriangulated = planar_retriangulate_part_mesh(mesh, request.retriangulate_tolerance);
            if retriangulated.num_triangles() > 0 && retriangulated.num_triangles() < mesh.num_triangles() {
                *mesh = retriangulated;
            }
        }
    }

    PartSources { lods, collision }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::approximation::box_mesh;
    use crate::math::{Isometry, Vector};
    use crate::source::StaticSource;

    fn request(num_lods: usize) -> SourceRequest {
        SourceRequest {
            num_lods,
            retriangulate_start_lod: None,
            retriangulate_tolerance: 0.01,
        }
    }

    #[test]
    fn missing_lods_are_back_filled() {
        let cube = box_mesh(&Isometry::identity(), &Vector::repeat(1.0));
        let source = StaticSource::new("cube", vec![cube.clone(), AttributedMesh::default()]);
        let sources = load_part_sources(&source, &request(4));
        assert_eq!(sources.lods.len(), 4);
        assert!(sources.lods.iter().all(|l| l.num_triangles() == 12));
        assert_eq!(sources.lod(10).map(|l| l.num_triangles()), Some(12));
    }

    #[test]
    fn empty_first_lod_takes_the_next_one() {
        let cube = box_mesh(&Isometry::identity(), &Vector::repeat(1.0));
        let source = StaticSource::new("cube", vec![AttributedMesh::default(), cube]);
        let sources = load_part_sources(&source, &request(3));
        let counts: Vec<usize> = sources.lods.iter().map(|l| l.num_triangles()).collect();
        assert_eq!(counts, vec![12, 12, 12]);
    }

    #[test]
    fn empty_source_yields_nothing() {
        let source = StaticSource::new("empty", vec![]);
        assert!(load_part_sources(&source, &request(2)).lods.is_empty());
    }
}
