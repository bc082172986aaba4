//! Per-block outputs of the reader.

use crate::topology::element_class::ElementClass;

/// One block of one element class, over a dense block-local node space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockMesh {
    pub class: Option<ElementClass>,
    pub block: usize,
    /// Nodes per element.
    pub arity: usize,
    /// Block-local node → reader-local node position, for real nodes only.
    pub vmap: Vec<usize>,
    /// Coordinates of every block-local node; synthetic nodes come last.
    pub coords: Vec<[f64; 3]>,
    /// Flattened connectivity, `arity` block-local indices per element.
    pub connectivity: Vec<usize>,
    /// Nodes appended for missing parts (not in `vmap`).
    pub synthetic_nodes: usize,
    /// Degenerate elements appended for missing parts, at the end.
    pub missing_elements: usize,
}

impl BlockMesh {
    pub fn element_count(&self) -> usize {
        if self.arity == 0 {
            0
        } else {
            self.connectivity.len() / self.arity
        }
    }

    pub fn node_count(&self) -> usize {
        self.coords.len()
    }

    /// Block-local node indices of element `e`.
    pub fn element(&self, e: usize) -> &[usize] {
        &self.connectivity[e * self.arity..(e + 1) * self.arity]
    }

    pub fn elements(&self) -> impl Iterator<Item = &[usize]> {
        self.connectivity.chunks(self.arity.max(1))
    }

    pub fn is_empty(&self) -> bool {
        self.connectivity.is_empty() && self.coords.is_empty()
    }
}

/// Values of one variable over one block, row-major.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockData {
    /// `dims[0]` rows; trailing dims mirror the source dataset.
    pub dims: Vec<usize>,
    pub values: Vec<f64>,
}

impl BlockData {
    pub fn rows(&self) -> usize {
        self.dims.first().copied().unwrap_or(0)
    }

    /// Scalars per row.
    pub fn row_width(&self) -> usize {
        self.dims.iter().skip(1).product()
    }

    pub fn row(&self, r: usize) -> &[f64] {
        let w = self.row_width();
        &self.values[r * w..(r + 1) * w]
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Grow `dims[0]` after rows were appended to `values`.
    pub(crate) fn sync_rows(&mut self) {
        let w = self.row_width();
        if let Some(first) = self.dims.first_mut() {
            *first = if w == 0 { 0 } else { self.values.len() / w };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_elements_split_by_arity() {
        let mesh = BlockMesh {
            arity: 2,
            connectivity: vec![0, 1, 0, 2],
            coords: vec![[0.0; 3]; 3],
            ..Default::default()
        };
        assert_eq!(mesh.element_count(), 2);
        assert_eq!(mesh.element(1), &[0, 2]);
        assert_eq!(mesh.elements().count(), 2);
        assert!(BlockMesh::default().is_empty());
    }

    #[test]
    fn data_rows_follow_trailing_dims() {
        let mut data = BlockData {
            dims: vec![2, 3],
            values: (0..6).map(f64::from).collect(),
        };
        assert_eq!(data.row(1), &[3.0, 4.0, 5.0]);
        data.values.extend([9.0; 3]);
        data.sync_rows();
        assert_eq!(data.rows(), 3);
    }
}
