//! Face generation driver.
//!
//! Hashes every local node once, emits face descriptors block by block into
//! one table per block ([`GenerationMode::PerBlock`]) or a single table for
//! the whole model ([`GenerationMode::WholeModel`]), then resolves
//! partition-cut faces when running on more than one rank.
//!
//! # Example
//! ```rust
//! # fn try_main() -> Result<(), mesh_faces::mesh_error::MeshFaceError> {
//! use mesh_faces::algs::face_generator::{FaceGenerator, GenerationConfig, MeshModel};
//! use mesh_faces::topology::block::ElementBlock;
//! use mesh_faces::topology::cell_type::CellType;
//!
//! let mut mesh = MeshModel::new((1..=4).collect());
//! mesh.add_block(ElementBlock::new("tets", CellType::Tet4, vec![0, 1, 2, 3])?)?;
//!
//! let result = FaceGenerator::serial(&mesh).generate(&GenerationConfig::default())?;
//! assert_eq!(result.table("tets").map(|t| t.len()), Some(4));
//! assert_eq!(result.stats.boundary_faces, 4);
//! # Ok(())
//! # }
//! # try_main().unwrap();
//! ```

use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::algs::communicator::{Communicator, NoComm};
use crate::algs::face_keys::{ElementIdSource, FaceKeyBuilder};
use crate::algs::face_resolve::{ParallelFaceResolver, ResolveStats};
use crate::algs::node_hash::HashScheme;
use crate::algs::sharing::NodeSharingMap;
use crate::mesh_error::MeshFaceError;
use crate::topology::block::ElementBlock;
use crate::topology::face::{FaceTable, GlobalNodeId};

/// Key of the single table produced in [`GenerationMode::WholeModel`].
pub const WHOLE_MODEL_KEY: &str = "ALL";

/// How element blocks are grouped into face tables.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// One independent table per block; faces between blocks never merge.
    #[default]
    PerBlock,
    /// One table across all blocks.
    WholeModel,
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GenerationMode::PerBlock => "per_block",
            GenerationMode::WholeModel => "whole_model",
        })
    }
}

impl FromStr for GenerationMode {
    type Err = MeshFaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "per_block" | "block" | "blocks" => Ok(GenerationMode::PerBlock),
            "whole_model" | "model" | "all" => Ok(GenerationMode::WholeModel),
            _ => Err(MeshFaceError::UnknownGenerationMode(s.to_string())),
        }
    }
}

/// Which node numbering faces are expressed in.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum NodeNumbering {
    /// Global node ids; required for cross-rank resolution.
    #[default]
    Global,
    /// 1-based local node indices. Rank-local view: resolution is skipped.
    Local,
}

/// Knobs of one generation run.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
#[serde(default)]
pub struct GenerationConfig {
    pub mode: GenerationMode,
    pub hash_scheme: HashScheme,
    pub element_ids: ElementIdSource,
    pub node_numbering: NodeNumbering,
}

impl GenerationConfig {
    pub fn with_mode(mut self, mode: GenerationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_hash_scheme(mut self, hash_scheme: HashScheme) -> Self {
        self.hash_scheme = hash_scheme;
        self
    }

    pub fn with_element_ids(mut self, element_ids: ElementIdSource) -> Self {
        self.element_ids = element_ids;
        self
    }

    pub fn with_node_numbering(mut self, node_numbering: NodeNumbering) -> Self {
        self.node_numbering = node_numbering;
        self
    }
}

/// One rank's view of the mesh: node ids, element blocks, sharing map.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MeshModel {
    global_node_ids: Vec<GlobalNodeId>,
    blocks: Vec<ElementBlock>,
    sharing: NodeSharingMap,
}

impl MeshModel {
    pub fn new(global_node_ids: Vec<GlobalNodeId>) -> Self {
        Self {
            global_node_ids,
            ..Self::default()
        }
    }

    /// Append a block; names must be unique.
    pub fn add_block(&mut self, block: ElementBlock) -> Result<(), MeshFaceError> {
        if self.blocks.iter().any(|b| b.name() == block.name()) {
            return Err(MeshFaceError::DuplicateBlockName(block.name().to_string()));
        }
        self.blocks.push(block);
        Ok(())
    }

    pub fn with_sharing(mut self, sharing: NodeSharingMap) -> Self {
        self.sharing = sharing;
        self
    }

    pub fn set_sharing(&mut self, sharing: NodeSharingMap) {
        self.sharing = sharing;
    }

    pub fn global_node_ids(&self) -> &[GlobalNodeId] {
        &self.global_node_ids
    }

    pub fn node_count(&self) -> usize {
        self.global_node_ids.len()
    }

    pub fn blocks(&self) -> &[ElementBlock] {
        &self.blocks
    }

    pub fn block(&self, name: &str) -> Option<&ElementBlock> {
        self.blocks.iter().find(|b| b.name() == name)
    }

    pub fn sharing(&self) -> &NodeSharingMap {
        &self.sharing
    }

    /// Face-bearing blocks that carry no element ids and therefore fall
    /// back to positional ids under [`ElementIdSource::FromBlock`].
    pub fn blocks_with_positional_ids(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .filter(|b| {
                b.element_ids().is_none()
                    && b.element_count() > 0
                    && b.cell_type().parametric_dimension() == 3
            })
            .map(ElementBlock::name)
            .collect()
    }
}

/// Counters of one generation run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct GenerationStats {
    pub blocks: usize,
    pub elements: usize,
    /// `(element, local face)` descriptors emitted.
    pub descriptors: usize,
    /// Unique faces over all tables.
    pub faces: usize,
    pub boundary_faces: usize,
    pub interior_faces: usize,
    pub resolve: ResolveStats,
}

/// Tables produced by one run, keyed by block name or [`WHOLE_MODEL_KEY`].
#[derive(Clone, Debug, Default)]
pub struct FaceGeneration {
    pub tables: BTreeMap<String, FaceTable>,
    pub stats: GenerationStats,
}

impl FaceGeneration {
    pub fn table(&self, key: &str) -> Option<&FaceTable> {
        self.tables.get(key)
    }

    pub fn whole_model(&self) -> Option<&FaceTable> {
        self.table(WHOLE_MODEL_KEY)
    }

    pub fn into_tables(self) -> BTreeMap<String, FaceTable> {
        self.tables
    }
}

/// Orchestrates hashing, descriptor emission and parallel resolution.
pub struct FaceGenerator<'a, C: Communicator = NoComm> {
    mesh: &'a MeshModel,
    comm: &'a C,
}

impl<'a> FaceGenerator<'a, NoComm> {
    /// Single-process generator.
    pub fn serial(mesh: &'a MeshModel) -> Self {
        Self {
            mesh,
            comm: &NoComm,
        }
    }
}

impl<'a, C: Communicator> FaceGenerator<'a, C> {
    pub fn new(mesh: &'a MeshModel, comm: &'a C) -> Self {
        Self { mesh, comm }
    }

    /// Shorthand for [`generate`](Self::generate) with default id handling.
    pub fn generate_with(
        &self,
        mode: GenerationMode,
        hash_scheme: HashScheme,
    ) -> Result<FaceGeneration, MeshFaceError> {
        self.generate(
            &GenerationConfig::default()
                .with_mode(mode)
                .with_hash_scheme(hash_scheme),
        )
    }

    /// Run one generation pass.
    ///
    /// Every rank must call this with the same config and the same block
    /// sequence. All validation runs before the first collective call; a
    /// [`MeshFaceError::FaceOveruse`] aborts the run and no table is returned.
    pub fn generate(&self, config: &GenerationConfig) -> Result<FaceGeneration, MeshFaceError> {
        let mesh = self.mesh;
        let node_ids = self.node_ids(config.node_numbering)?;
        for block in mesh.blocks() {
            block.validate(node_ids.len())?;
        }
        let distributed = !self.comm.is_no_comm() && self.comm.size() > 1;
        let resolver = match (distributed, config.node_numbering) {
            (true, NodeNumbering::Global) => Some(ParallelFaceResolver::new(
                self.comm,
                mesh.sharing(),
                &node_ids,
            )?),
            (true, NodeNumbering::Local) => {
                log::warn!(
                    "rank {}: local node numbering requested; partition-cut faces stay unresolved",
                    self.comm.rank()
                );
                None
            }
            (false, _) => None,
        };

        if resolver.is_some() && config.element_ids == ElementIdSource::FromBlock {
            for name in mesh.blocks_with_positional_ids() {
                log::warn!(
                    "rank {}: block `{name}` has no element ids; positional ids are rank-local \
                     and may repeat across ranks",
                    self.comm.rank()
                );
            }
        }

        let hashed = config.hash_scheme.hash_all(&node_ids);
        let builder = FaceKeyBuilder::new(&node_ids, &hashed, config.element_ids)?;

        let mut stats = GenerationStats {
            blocks: mesh.blocks().len(),
            elements: mesh.blocks().iter().map(ElementBlock::element_count).sum(),
            ..GenerationStats::default()
        };
        // Local generation for every table first; a local failure is held
        // back so this rank still joins every resolve phase below.
        let mut first_err: Option<MeshFaceError> = None;
        let mut position = 1u64;
        let mut built: Vec<(String, FaceTable)> = Vec::new();
        match config.mode {
            GenerationMode::PerBlock => {
                for block in mesh.blocks() {
                    let mut table = FaceTable::with_capacity(estimated_faces(block));
                    if first_err.is_none() {
                        match builder.build_into(block, &mut position, &mut table) {
                            Ok(emitted) => {
                                log::debug!(
                                    "block `{}`: {emitted} face descriptors, {} unique faces",
                                    block.name(),
                                    table.len()
                                );
                                stats.descriptors += emitted;
                            }
                            Err(err) => first_err = Some(err),
                        }
                    }
                    built.push((block.name().to_string(), table));
                }
            }
            GenerationMode::WholeModel => {
                let capacity = mesh.blocks().iter().map(estimated_faces).sum();
                let mut table = FaceTable::with_capacity(capacity);
                for block in mesh.blocks() {
                    match builder.build_into(block, &mut position, &mut table) {
                        Ok(emitted) => {
                            log::debug!("block `{}`: {emitted} face descriptors", block.name());
                            stats.descriptors += emitted;
                        }
                        Err(err) => {
                            first_err = Some(err);
                            break;
                        }
                    }
                }
                built.push((WHOLE_MODEL_KEY.to_string(), table));
            }
        }

        let mut tables = BTreeMap::new();
        for (key, mut table) in built {
            if let Some(resolver) = &resolver {
                if first_err.is_some() {
                    // keep the collectives in step with zero counts
                    let _ = resolver.resolve(&mut FaceTable::new());
                } else {
                    match resolver.resolve(&mut table) {
                        Ok(resolved) => stats.resolve += resolved,
                        Err(err) => first_err = Some(err),
                    }
                }
            }
            tables.insert(key, table);
        }
        if let Some(err) = first_err {
            log::error!("rank {}: face generation failed: {err}", self.comm.rank());
            return Err(err);
        }

        for table in tables.values() {
            stats.faces += table.len();
            stats.boundary_faces += table.boundary_faces().count();
            stats.interior_faces += table.interior_faces().count();
        }
        log::info!(
            "rank {}: {} faces ({} boundary, {} interior) from {} elements in {} blocks [{}, {}]",
            self.comm.rank(),
            stats.faces,
            stats.boundary_faces,
            stats.interior_faces,
            stats.elements,
            stats.blocks,
            config.mode,
            config.hash_scheme
        );
        Ok(FaceGeneration { tables, stats })
    }

    fn node_ids(&self, numbering: NodeNumbering) -> Result<Cow<'a, [GlobalNodeId]>, MeshFaceError> {
        let ids = self.mesh.global_node_ids();
        match numbering {
            NodeNumbering::Global => {
                if let Some(index) = ids.iter().position(|&id| id == 0) {
                    return Err(MeshFaceError::ZeroGlobalNodeId { index });
                }
                let mut seen = HashSet::with_capacity(ids.len());
                if ids.iter().any(|id| !seen.insert(*id)) {
                    log::warn!("global node ids are not unique on this rank");
                }
                Ok(Cow::Borrowed(ids))
            }
            NodeNumbering::Local => Ok(Cow::Owned((1..=ids.len() as u64).collect())),
        }
    }
}

/// Rough unique-face estimate: about half of all element faces.
fn estimated_faces(block: &ElementBlock) -> usize {
    block.element_count() * block.cell_type().number_faces() / 2 + 1
}
