//! Material catalog: titles, element types and per-class material lists.
//!
//! Material ids are 1-based. Id `num_materials + 1` is the "Unknown" sentinel
//! assigned to every element of a class that stores no `Material` dataset.

use crate::algs::collective::collective_read;
use crate::algs::communicator::Communicator;
use crate::algs::missing_parts::missing_materials;
use crate::data::toc::{GENERAL_GROUP, Toc};
use crate::io::{ArrayStore, ArrayStoreExt};
use crate::pvld_error::{PvldError, ResultExt};
use crate::topology::element_class::{ElementClass, MaterialType};
use itertools::Itertools;
use std::collections::{BTreeMap, HashSet};

pub const MATERIAL_DATASET: &str = "Material";
pub const PART_ELEMENT_TYPE_ATTRIBUTE: &str = "PartElementType";
pub const PART_TITLE_PREFIX: &str = "PartTitle_";
pub const UNKNOWN_MATERIAL_TITLE: &str = "Unknown";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaterialCatalog {
    num_materials: usize,
    titles: Vec<String>,
    types: Vec<MaterialType>,
    present: BTreeMap<ElementClass, Vec<i64>>,
    missing: BTreeMap<ElementClass, Vec<i64>>,
}

impl MaterialCatalog {
    /// Read titles, element types and the present material ids of every
    /// material-bearing class, then derive the missing parts.
    pub fn load<S, C>(store: &S, toc: &Toc, comm: &C) -> Result<Self, PvldError>
    where
        S: ArrayStore,
        C: Communicator + ?Sized,
    {
        let nmmat = toc.general.num_materials;
        let general = store.open_group(&store.root(), GENERAL_GROUP)?;

        let mut raw_titles = Vec::with_capacity(nmmat);
        for id in 1..=nmmat {
            let name = format!("{PART_TITLE_PREFIX}{id}");
            let title = match store.read_optional_attribute(&general, &name)? {
                Some(attr) => attr.as_text(&name)?.trim().to_string(),
                None => format!("Part {id}"),
            };
            raw_titles.push(title);
        }

        let stored_types = collective_read(comm, || {
            match store.read_optional_attribute(&general, PART_ELEMENT_TYPE_ATTRIBUTE)? {
                Some(attr) => attr.as_int_array(PART_ELEMENT_TYPE_ATTRIBUTE),
                None => Ok(Vec::new()),
            }
        })?;
        store.close_group(general);
        let stored_types = (!stored_types.is_empty()).then_some(stored_types);

        let mut present = BTreeMap::new();
        for class in ElementClass::MATERIAL {
            let Some(table) = toc.class(class) else {
                continue;
            };
            if table.count == 0 {
                present.insert(class, Vec::new());
                continue;
            }
            let ids = if table.has_dataset(MATERIAL_DATASET) {
                collective_read(comm, || {
                    let g = store.open_group(&store.root(), class.group_name())?;
                    let ids = store.read_values::<i64>(&g, MATERIAL_DATASET, None)?;
                    store.close_group(g);
                    Ok(ids.into_iter().sorted_unstable().dedup().collect())
                })
                .context(|| format!("Failure in reading {class} materials"))?
            } else {
                log::warn!("{class} has no {MATERIAL_DATASET} dataset; using the Unknown material");
                vec![nmmat as i64 + 1]
            };
            present.insert(class, ids);
        }

        Self::from_parts(nmmat, raw_titles, stored_types.as_deref(), present)
    }

    /// Assemble a catalog from already-read pieces.
    ///
    /// `present` lists must be sorted and unique.
    pub fn from_parts(
        num_materials: usize,
        raw_titles: Vec<String>,
        stored_types: Option<&[i64]>,
        present: BTreeMap<ElementClass, Vec<i64>>,
    ) -> Result<Self, PvldError> {
        let mut titles = unique_titles(raw_titles);
        titles.resize_with(num_materials, String::new);
        titles.push(UNKNOWN_MATERIAL_TITLE.to_string());

        let types = resolve_types(num_materials, stored_types, &present)?;
        let mut missing = BTreeMap::new();
        for class in ElementClass::MATERIAL {
            let have = present.get(&class).map(Vec::as_slice).unwrap_or(&[]);
            let m = missing_materials(&types, have, class);
            if !m.is_empty() {
                log::info!("{class}: synthesizing missing parts {m:?}");
                missing.insert(class, m);
            }
        }
        Ok(Self {
            num_materials,
            titles,
            types,
            present,
            missing,
        })
    }

    pub fn num_materials(&self) -> usize {
        self.num_materials
    }

    /// Id used for elements without a stored material.
    pub fn unknown_material(&self) -> i64 {
        self.num_materials as i64 + 1
    }

    /// Titles indexed by `id - 1`; the last entry is the Unknown sentinel.
    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn title(&self, id: i64) -> Option<&str> {
        let idx = usize::try_from(id.checked_sub(1)?).ok()?;
        self.titles.get(idx).map(String::as_str)
    }

    pub fn material_type(&self, id: i64) -> MaterialType {
        usize::try_from(id - 1)
            .ok()
            .and_then(|i| self.types.get(i).copied())
            .unwrap_or(MaterialType::NONE)
    }

    /// Sorted material ids present in the data of `class`.
    pub fn present(&self, class: ElementClass) -> &[i64] {
        self.present.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sorted material ids `class` should have but does not.
    pub fn missing(&self, class: ElementClass) -> &[i64] {
        self.missing.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Make titles unique by suffixing repeats with `@<id>`.
pub fn unique_titles(raw: Vec<String>) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::with_capacity(raw.len());
    raw.into_iter()
        .enumerate()
        .map(|(i, title)| {
            let mut candidate = title.clone();
            let mut n = i + 1;
            while used.contains(&candidate) {
                candidate = format!("{title}@{n}");
                n += 1;
            }
            used.insert(candidate.clone());
            candidate
        })
        .collect()
}

/// Element-type mask of every material, either decoded from stored codes and
/// validated against `present`, or inferred from `present`.
pub fn resolve_types(
    num_materials: usize,
    stored: Option<&[i64]>,
    present: &BTreeMap<ElementClass, Vec<i64>>,
) -> Result<Vec<MaterialType>, PvldError> {
    let sentinel = num_materials as i64 + 1;
    let in_range = |class: ElementClass, id: i64| -> Result<Option<usize>, PvldError> {
        if id == sentinel {
            Ok(None)
        } else if id >= 1 && id <= num_materials as i64 {
            Ok(Some(id as usize - 1))
        } else {
            Err(PvldError::InconsistentMetadata(format!(
                "{class} references material {id} outside 1..={num_materials}"
            )))
        }
    };

    match stored {
        Some(codes) => {
            if codes.len() < num_materials {
                return Err(PvldError::InconsistentMetadata(format!(
                    "{PART_ELEMENT_TYPE_ATTRIBUTE} has {} entries for {num_materials} materials",
                    codes.len()
                )));
            }
            let types = codes[..num_materials]
                .iter()
                .enumerate()
                .map(|(i, &code)| {
                    MaterialType::from_code(code).ok_or_else(|| {
                        PvldError::InconsistentMetadata(format!(
                            "unknown element type code {code} for material {}",
                            i + 1
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            for (&class, ids) in present {
                for &id in ids {
                    let Some(idx) = in_range(class, id)? else {
                        continue;
                    };
                    if !types[idx].accepts(class) {
                        return Err(PvldError::InconsistentMetadata(format!(
                            "material {id} is used by {class} elements but declared as type {:#07b}",
                            types[idx].bits()
                        )));
                    }
                }
            }
            Ok(types)
        }
        None => {
            let mut types = vec![MaterialType::SOLID; num_materials];
            let solid = present.get(&ElementClass::Solid);
            for class in [ElementClass::Beam, ElementClass::Shell, ElementClass::TShell, ElementClass::Sph] {
                let Some(ids) = present.get(&class) else {
                    continue;
                };
                for &id in ids {
                    let Some(idx) = in_range(class, id)? else {
                        continue;
                    };
                    types[idx] = match class {
                        ElementClass::Sph if solid.is_some_and(|s| s.binary_search(&id).is_ok()) => {
                            MaterialType::SOLID | MaterialType::SPH
                        }
                        other => other.material_type().unwrap_or(MaterialType::SOLID),
                    };
                }
            }
            if let Some(ids) = solid {
                for &id in ids {
                    in_range(ElementClass::Solid, id)?;
                }
            }
            Ok(types)
        }
    }
}
