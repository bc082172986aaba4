//! Block mesh extraction.

use super::PvldReader;
use crate::algs::communicator::Communicator;
use crate::algs::missing_parts::append_degenerate_elements;
use crate::algs::renumber::remap_raw_connectivity;
use crate::data::block::BlockMesh;
use crate::data::node_cache::{NODE_COORDINATE_DATASET, NodeCache};
use crate::io::file::StoreOpener;
use crate::io::{ArrayStore, ArrayStoreExt, Hyperslab};
use crate::pvld_error::{PvldError, ResultExt};
use crate::topology::element_class::ElementClass;

impl<O: StoreOpener, C: Communicator> PvldReader<O, C> {
    /// Mesh of one block: block-local coordinates and connectivity.
    ///
    /// Block 0 of a material class also carries one degenerate element per
    /// missing part, after the real elements.
    pub fn read_block_mesh(
        &mut self,
        class: ElementClass,
        block: usize,
    ) -> Result<BlockMesh, PvldError> {
        if block >= self.block_count(class) {
            return Ok(BlockMesh::default());
        }
        self.ensure_block_mesh(class, block)
            .context(|| format!("Failure in read_block_mesh({class}, {block})"))?;
        let mut mesh = self.meshes[&(class, block)].clone();
        let n_missing = self.missing_for(class, block).len();
        mesh.synthetic_nodes = append_degenerate_elements(
            &mut mesh.connectivity,
            &mut mesh.coords,
            mesh.arity,
            n_missing,
        );
        mesh.missing_elements = n_missing;
        Ok(mesh)
    }

    /// Block-local → reader-local node map of a block, built on first use.
    pub fn block_vmap(
        &mut self,
        class: ElementClass,
        block: usize,
    ) -> Result<&[usize], PvldError> {
        if block >= self.block_count(class) {
            return Ok(&[][..]);
        }
        self.ensure_block_mesh(class, block)?;
        Ok(&self.meshes[&(class, block)].vmap)
    }

    /// Number of synthetic nodes block `block` gains from missing parts.
    pub(super) fn synthetic_node_count(
        &mut self,
        class: ElementClass,
        block: usize,
    ) -> Result<usize, PvldError> {
        if self.missing_for(class, block).is_empty() {
            return Ok(0);
        }
        self.ensure_block_mesh(class, block)?;
        let real = &self.meshes[&(class, block)];
        Ok(usize::from(real.connectivity.len() < real.arity.max(1)))
    }

    pub(super) fn ensure_block_mesh(
        &mut self,
        class: ElementClass,
        block: usize,
    ) -> Result<(), PvldError> {
        if self.meshes.contains_key(&(class, block)) {
            return Ok(());
        }
        let mesh = if class.uses_node_connectivity() {
            self.extract_element_mesh(class, block)?
        } else {
            self.extract_particle_mesh(class, block)?
        };
        log::debug!(
            "{class} block {block}: {} elements over {} nodes",
            mesh.element_count(),
            mesh.node_count()
        );
        self.meshes.insert((class, block), mesh);
        Ok(())
    }

    /// Connectivity slab → node remap → block-local coordinates.
    fn extract_element_mesh(
        &mut self,
        class: ElementClass,
        block: usize,
    ) -> Result<BlockMesh, PvldError> {
        let arity = class.arity();
        let mut mesh = BlockMesh {
            class: Some(class),
            block,
            arity,
            ..Default::default()
        };
        let Some(table) = self.toc.class(class) else {
            return Ok(mesh);
        };
        let range = table.partition.range(block).unwrap_or(0..0);
        if range.is_empty() {
            return Ok(mesh);
        }
        let shape = class
            .connectivity_datasets()
            .iter()
            .find_map(|name| table.dataset(name))
            .cloned()
            .ok_or_else(|| {
                PvldError::missing_dataset(
                    class.group_name(),
                    &class.connectivity_datasets().join("|"),
                )
                .with_context(format!("No element definition for {class}"))
            })?;
        if shape.row_width() != arity {
            return Err(PvldError::TypeMismatch {
                name: shape.name.clone(),
                expected: "one row of node ids per element",
                found: format!("shape {:?} for {arity}-node {class} elements", shape.dims),
            });
        }

        let raw: Vec<i64> = {
            let store = self.file.get()?;
            let g = store.open_group(&store.root(), class.group_name())?;
            let slab = Hyperslab::rows(range.start, range.len(), &shape.dims);
            let raw = store.read_values(&g, &shape.name, Some(&slab))?;
            store.close_group(g);
            raw
        };

        let cache = self
            .node_cache
            .get_or_try_init(|| NodeCache::load(self.file.get()?, &self.comm))
            .context(|| "Failure in reading the node cache")?;
        let remap = remap_raw_connectivity(&raw, |id| cache.position(id))?;
        mesh.coords = remap.vmap.iter().map(|&p| cache.coordinate(p)).collect();
        mesh.vmap = remap.vmap;
        mesh.connectivity = remap.connectivity;
        Ok(mesh)
    }

    /// Particles carry their own coordinates; connectivity is the identity.
    fn extract_particle_mesh(
        &mut self,
        class: ElementClass,
        block: usize,
    ) -> Result<BlockMesh, PvldError> {
        let mut mesh = BlockMesh {
            class: Some(class),
            block,
            arity: 1,
            ..Default::default()
        };
        let Some(table) = self.toc.class(class) else {
            return Ok(mesh);
        };
        let range = table.partition.range(block).unwrap_or(0..0);
        if range.is_empty() {
            return Ok(mesh);
        }
        let shape = table
            .dataset(NODE_COORDINATE_DATASET)
            .cloned()
            .ok_or_else(|| {
                PvldError::missing_dataset(class.group_name(), NODE_COORDINATE_DATASET)
                    .with_context(format!("No element definition for {class}"))
            })?;
        if shape.row_width() != 3 {
            return Err(PvldError::TypeMismatch {
                name: shape.name.clone(),
                expected: "three coordinates per particle",
                found: format!("shape {:?}", shape.dims),
            });
        }
        let store = self.file.get()?;
        let g = store.open_group(&store.root(), class.group_name())?;
        let slab = Hyperslab::rows(range.start, range.len(), &shape.dims);
        let xyz: Vec<f64> = store.read_values(&g, &shape.name, Some(&slab))?;
        store.close_group(g);
        mesh.coords = xyz.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
        mesh.connectivity = (0..mesh.coords.len()).collect();
        Ok(mesh)
    }
}
