//! Element classes stored in a plot file and their per-class layout rules.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mesh entity classes of a plot file.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum ElementClass {
    /// Global node table (indices and coordinates); never partitioned.
    Node,
    /// 8-node hexahedral solids.
    Solid,
    /// 2-node beams.
    Beam,
    /// 4-node shells.
    Shell,
    /// 8-node thick shells.
    TShell,
    /// Smoothed-particle hydrodynamics particles.
    Sph,
    /// 4-node surface segments.
    Surface,
    /// 3-node tied node sets.
    TiedNodeSet,
    /// 4-node contact master segments.
    Contact,
}

impl ElementClass {
    /// Every class, `Node` first.
    pub const ALL: [ElementClass; 9] = [
        ElementClass::Node,
        ElementClass::Solid,
        ElementClass::Beam,
        ElementClass::Shell,
        ElementClass::TShell,
        ElementClass::Sph,
        ElementClass::Surface,
        ElementClass::TiedNodeSet,
        ElementClass::Contact,
    ];

    /// Classes that are divided into blocks.
    pub const PARTITIONED: [ElementClass; 8] = [
        ElementClass::Solid,
        ElementClass::Beam,
        ElementClass::Shell,
        ElementClass::TShell,
        ElementClass::Sph,
        ElementClass::Surface,
        ElementClass::TiedNodeSet,
        ElementClass::Contact,
    ];

    /// Classes whose elements carry a material id.
    pub const MATERIAL: [ElementClass; 5] = [
        ElementClass::Solid,
        ElementClass::Beam,
        ElementClass::Shell,
        ElementClass::TShell,
        ElementClass::Sph,
    ];

    /// Name of the store group holding this class.
    pub fn group_name(self) -> &'static str {
        match self {
            ElementClass::Node => "Node",
            ElementClass::Solid => "Solid",
            ElementClass::Beam => "Beam",
            ElementClass::Shell => "Shell",
            ElementClass::TShell => "TShell",
            ElementClass::Sph => "SPH",
            ElementClass::Surface => "Surface",
            ElementClass::TiedNodeSet => "TiedNodeSet",
            ElementClass::Contact => "ContactSlave",
        }
    }

    /// Number of node references per element.
    pub fn arity(self) -> usize {
        match self {
            ElementClass::Solid | ElementClass::TShell => 8,
            ElementClass::Shell | ElementClass::Surface | ElementClass::Contact => 4,
            ElementClass::TiedNodeSet => 3,
            ElementClass::Beam => 2,
            ElementClass::Sph | ElementClass::Node => 1,
        }
    }

    /// Connectivity dataset names, in lookup order.
    pub fn connectivity_datasets(self) -> &'static [&'static str] {
        match self {
            ElementClass::Contact => &["MstSeg", "Nodes"],
            ElementClass::Node | ElementClass::Sph => &[],
            _ => &["Nodes"],
        }
    }

    /// Attribute names holding the entity count, in lookup order.
    pub fn count_attributes(self) -> &'static [&'static str] {
        &["number", "NumNodes"]
    }

    /// Material type bit for classes that carry materials.
    pub fn material_type(self) -> Option<MaterialType> {
        match self {
            ElementClass::Solid => Some(MaterialType::SOLID),
            ElementClass::Beam => Some(MaterialType::BEAM),
            ElementClass::Shell => Some(MaterialType::SHELL),
            ElementClass::TShell => Some(MaterialType::TSHELL),
            ElementClass::Sph => Some(MaterialType::SPH),
            _ => None,
        }
    }

    /// True when block meshes are built from node connectivity.
    pub fn uses_node_connectivity(self) -> bool {
        !matches!(self, ElementClass::Node | ElementClass::Sph)
    }
}

impl fmt::Display for ElementClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.group_name())
    }
}

/// Bit mask over the element types a material is used with.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct MaterialType(u8);

impl MaterialType {
    pub const NONE: MaterialType = MaterialType(0);
    pub const SOLID: MaterialType = MaterialType(1);
    pub const BEAM: MaterialType = MaterialType(1 << 1);
    pub const SHELL: MaterialType = MaterialType(1 << 2);
    pub const TSHELL: MaterialType = MaterialType(1 << 3);
    pub const SPH: MaterialType = MaterialType(1 << 4);

    /// Decode a stored `PartElementType` code.
    ///
    /// Codes: 1 solid, 2 beam, 3 shell, 4 thick shell, 5 SPH.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(MaterialType::SOLID),
            2 => Some(MaterialType::BEAM),
            3 => Some(MaterialType::SHELL),
            4 => Some(MaterialType::TSHELL),
            5 => Some(MaterialType::SPH),
            _ => None,
        }
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: MaterialType) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, other: MaterialType) {
        self.0 |= other.0;
    }

    /// Whether an element of `class` may legally use a material of this type.
    ///
    /// SPH particles may also reference materials declared as solid.
    pub fn accepts(self, class: ElementClass) -> bool {
        match class.material_type() {
            Some(MaterialType::SPH) => {
                self.contains(MaterialType::SPH) || self.contains(MaterialType::SOLID)
            }
            Some(bit) => self.contains(bit),
            None => false,
        }
    }
}

impl std::ops::BitOr for MaterialType {
    type Output = MaterialType;

    fn bitor(self, rhs: MaterialType) -> MaterialType {
        MaterialType(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sph_accepts_solid_materials() {
        assert!(MaterialType::SOLID.accepts(ElementClass::Sph));
        assert!(MaterialType::SPH.accepts(ElementClass::Sph));
        assert!(!MaterialType::SPH.accepts(ElementClass::Solid));
        assert!(!MaterialType::BEAM.accepts(ElementClass::Shell));
        assert!((MaterialType::SOLID | MaterialType::SPH).accepts(ElementClass::Solid));
    }

    #[test]
    fn codes_decode_to_single_bits() {
        assert_eq!(MaterialType::from_code(3), Some(MaterialType::SHELL));
        assert_eq!(MaterialType::from_code(0), None);
        assert!(MaterialType::NONE.is_empty());
    }

    #[test]
    fn material_classes_have_type_bits() {
        for class in ElementClass::MATERIAL {
            assert!(class.material_type().is_some(), "{class}");
        }
        assert_eq!(ElementClass::Contact.group_name(), "ContactSlave");
    }
}
