//! Line-oriented scene description format.
//!
//! ```text
//! # comment
//! GRID sizeX sizeZ spacing originX originZ renderHalfExtent collisionHalfExtent
//! FLOOR posY halfX halfZ
//! KILLZONE posY
//! DISABLE ix iz tag
//! MODIFY_TOP_Y ix iz value tag
//! REPLACE_PRESET ix iz presetName tag
//! ```
//!
//! `GRID`, `FLOOR` and `KILLZONE` must each appear exactly once. At most one
//! overlay op may target a given cell. Loading either yields a fully validated
//! [`SceneDescription`] or a [`SceneLoadError`]; nothing is built from a partial
//! scene.

use std::{collections::HashMap, fmt, path::Path, str::FromStr};

use crate::level::CubePreset;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum LoadStatus {
    #[error("I/O failure")]
    Io,
    #[error("malformed line")]
    Malformed,
    #[error("unknown directive")]
    UnknownDirective,
    #[error("duplicate primitive")]
    DuplicatePrimitive,
    #[error("missing primitive")]
    MissingPrimitive,
    #[error("duplicate cell")]
    DuplicateCell,
    #[error("cell out of range")]
    CellOutOfRange,
    #[error("unknown preset")]
    UnknownPreset,
    #[error("invalid value")]
    InvalidValue,
}

/// Why a scene could not be loaded. `line` is 1-based; 0 means the whole file.
#[derive(Debug, thiserror::Error)]
#[error("{status} at line {line}: {message}")]
pub struct SceneLoadError {
    pub status: LoadStatus,
    pub message: String,
    pub line: usize,
    #[source]
    pub source: Option<std::io::Error>,
}

impl SceneLoadError {
    fn new(status: LoadStatus, line: usize, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            line,
            source: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GridPrimitive {
    pub size_x: u32,
    pub size_z: u32,
    pub spacing: f32,
    pub origin_x: f32,
    pub origin_z: f32,
    pub render_half_extent: f32,
    pub collision_half_extent: f32,
}

/// The three required primitives. The `has_*` flags record which were seen.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BaseSceneSource {
    pub has_grid: bool,
    pub has_floor: bool,
    pub has_kill_zone: bool,
    pub grid: GridPrimitive,
    pub floor_y: f32,
    pub floor_half_x: f32,
    pub floor_half_z: f32,
    pub kill_y: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OverlayOp {
    Disable,
    /// Absolute top of the cube.
    ModifyTopY(f32),
    ReplacePreset(CubePreset),
}

#[derive(Clone, Debug, PartialEq)]
pub struct CellOverlay {
    pub ix: u32,
    pub iz: u32,
    pub op: OverlayOp,
    pub tag: String,
    /// Source line, for diagnostics.
    pub line: usize,
}

/// A validated scene: every base primitive present, every overlay in range.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneDescription {
    pub base: BaseSceneSource,
    pub overlays: Vec<CellOverlay>,
}

impl SceneDescription {
    pub fn overlay_at(&self, ix: u32, iz: u32) -> Option<&CellOverlay> {
        self.overlays.iter().find(|o| o.ix == ix && o.iz == iz)
    }

    /// Overlays keyed by cell. Cells are unique after validation.
    pub fn overlays_by_cell(&self) -> HashMap<(u32, u32), &CellOverlay> {
        self.overlays.iter().map(|o| ((o.ix, o.iz), o)).collect()
    }
}

impl fmt::Display for SceneDescription {
    /// Writes the description back in scene file syntax.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.base;
        let g = &b.grid;
        writeln!(
            f,
            "GRID {} {} {} {} {} {} {}",
            g.size_x, g.size_z, g.spacing, g.origin_x, g.origin_z, g.render_half_extent, g.collision_half_extent
        )?;
        writeln!(f, "FLOOR {} {} {}", b.floor_y, b.floor_half_x, b.floor_half_z)?;
        writeln!(f, "KILLZONE {}", b.kill_y)?;
        for o in &self.overlays {
            match o.op {
                OverlayOp::Disable => writeln!(f, "DISABLE {} {} {}", o.ix, o.iz, o.tag)?,
                OverlayOp::ModifyTopY(y) => writeln!(f, "MODIFY_TOP_Y {} {} {} {}", o.ix, o.iz, y, o.tag)?,
                OverlayOp::ReplacePreset(p) => {
                    writeln!(f, "REPLACE_PRESET {} {} {} {}", o.ix, o.iz, p.name(), o.tag)?
                }
            }
        }
        Ok(())
    }
}

fn expect_tokens(tokens: &[&str], count: usize, line: usize) -> Result<(), SceneLoadError> {
    if tokens.len() != count {
        return Err(SceneLoadError::new(
            LoadStatus::Malformed,
            line,
            format!("{} expects {} values, found {}", tokens[0], count - 1, tokens.len() - 1),
        ));
    }
    Ok(())
}

fn parse_value<T: FromStr>(token: &str, what: &str, line: usize) -> Result<T, SceneLoadError> {
    token
        .parse()
        .map_err(|_| SceneLoadError::new(LoadStatus::Malformed, line, format!("bad {what} `{token}`")))
}

fn parse_finite(token: &str, what: &str, line: usize) -> Result<f32, SceneLoadError> {
    let v: f32 = parse_value(token, what, line)?;
    if !v.is_finite() {
        return Err(SceneLoadError::new(
            LoadStatus::InvalidValue,
            line,
            format!("{what} must be finite"),
        ));
    }
    Ok(v)
}

fn parse_positive(token: &str, what: &str, line: usize) -> Result<f32, SceneLoadError> {
    let v = parse_finite(token, what, line)?;
    if v <= 0.0 {
        return Err(SceneLoadError::new(
            LoadStatus::InvalidValue,
            line,
            format!("{what} must be positive, got {v}"),
        ));
    }
    Ok(v)
}

fn parse_cell(tokens: &[&str], line: usize) -> Result<(i64, i64), SceneLoadError> {
    Ok((
        parse_value(tokens[1], "cell x", line)?,
        parse_value(tokens[2], "cell z", line)?,
    ))
}

fn duplicate_primitive(name: &str, line: usize) -> SceneLoadError {
    SceneLoadError::new(LoadStatus::DuplicatePrimitive, line, format!("{name} appears more than once"))
}

/// Overlay as parsed, before the grid is known to bound its cell.
struct PendingOverlay {
    cell: (i64, i64),
    op: OverlayOp,
    tag: String,
    line: usize,
}

/// Parse and validate scene text.
pub fn parse_scene(text: &str) -> Result<SceneDescription, SceneLoadError> {
    let mut base = BaseSceneSource::default();
    let mut pending: Vec<PendingOverlay> = Vec::new();
    let mut claimed: HashMap<(i64, i64), usize> = HashMap::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let content = raw.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        let tokens: Vec<&str> = content.split_whitespace().collect();

        match tokens[0] {
            "GRID" => {
                expect_tokens(&tokens, 8, line)?;
                if base.has_grid {
                    return Err(duplicate_primitive("GRID", line));
                }
                let size_x: u32 = parse_value(tokens[1], "grid size x", line)?;
                let size_z: u32 = parse_value(tokens[2], "grid size z", line)?;
                if size_x == 0 || size_z == 0 {
                    return Err(SceneLoadError::new(LoadStatus::InvalidValue, line, "grid must have cells"));
                }
                base.grid = GridPrimitive {
                    size_x,
                    size_z,
                    spacing: parse_positive(tokens[3], "spacing", line)?,
                    origin_x: parse_finite(tokens[4], "origin x", line)?,
                    origin_z: parse_finite(tokens[5], "origin z", line)?,
                    render_half_extent: parse_positive(tokens[6], "render half extent", line)?,
                    collision_half_extent: parse_positive(tokens[7], "collision half extent", line)?,
                };
                base.has_grid = true;
            }
            "FLOOR" => {
                expect_tokens(&tokens, 4, line)?;
                if base.has_floor {
                    return Err(duplicate_primitive("FLOOR", line));
                }
                base.floor_y = parse_finite(tokens[1], "floor y", line)?;
                base.floor_half_x = parse_positive(tokens[2], "floor half x", line)?;
                base.floor_half_z = parse_positive(tokens[3], "floor half z", line)?;
                base.has_floor = true;
            }
            "KILLZONE" => {
                expect_tokens(&tokens, 2, line)?;
                if base.has_kill_zone {
                    return Err(duplicate_primitive("KILLZONE", line));
                }
                base.kill_y = parse_finite(tokens[1], "kill zone y", line)?;
                base.has_kill_zone = true;
            }
            op @ ("DISABLE" | "MODIFY_TOP_Y" | "REPLACE_PRESET") => {
                let (op, tag) = match op {
                    "DISABLE" => {
                        expect_tokens(&tokens, 4, line)?;
                        (OverlayOp::Disable, tokens[3])
                    }
                    "MODIFY_TOP_Y" => {
                        expect_tokens(&tokens, 5, line)?;
                        (OverlayOp::ModifyTopY(parse_finite(tokens[3], "top y", line)?), tokens[4])
                    }
                    _ => {
                        expect_tokens(&tokens, 5, line)?;
                        let preset = CubePreset::from_name(tokens[3]).ok_or_else(|| {
                            SceneLoadError::new(
                                LoadStatus::UnknownPreset,
                                line,
                                format!("no preset named `{}`", tokens[3]),
                            )
                        })?;
                        (OverlayOp::ReplacePreset(preset), tokens[4])
                    }
                };
                let cell = parse_cell(&tokens, line)?;
                if let Some(first) = claimed.insert(cell, line) {
                    return Err(SceneLoadError::new(
                        LoadStatus::DuplicateCell,
                        line,
                        format!("cell ({}, {}) already modified on line {first}", cell.0, cell.1),
                    ));
                }
                pending.push(PendingOverlay {
                    cell,
                    op,
                    tag: tag.to_owned(),
                    line,
                });
            }
            other => {
                return Err(SceneLoadError::new(
                    LoadStatus::UnknownDirective,
                    line,
                    format!("unknown directive `{other}`"),
                ));
            }
        }
    }

    for (present, name) in [
        (base.has_grid, "GRID"),
        (base.has_floor, "FLOOR"),
        (base.has_kill_zone, "KILLZONE"),
    ] {
        if !present {
            return Err(SceneLoadError::new(
                LoadStatus::MissingPrimitive,
                0,
                format!("{name} is required"),
            ));
        }
    }

    let g = &base.grid;
    let mut overlays = Vec::with_capacity(pending.len());
    for p in pending {
        let (x, z) = p.cell;
        if x < 0 || z < 0 || x >= i64::from(g.size_x) || z >= i64::from(g.size_z) {
            return Err(SceneLoadError::new(
                LoadStatus::CellOutOfRange,
                p.line,
                format!("cell ({x}, {z}) outside {}x{} grid", g.size_x, g.size_z),
            ));
        }
        if let OverlayOp::ModifyTopY(top) = p.op {
            if top <= base.floor_y {
                return Err(SceneLoadError::new(
                    LoadStatus::InvalidValue,
                    p.line,
                    format!("top {top} is not above the floor at {}", base.floor_y),
                ));
            }
        }
        overlays.push(CellOverlay {
            ix: x as u32,
            iz: z as u32,
            op: p.op,
            tag: p.tag,
            line: p.line,
        });
    }

    Ok(SceneDescription { base, overlays })
}

/// Read and parse a scene file.
pub fn load_scene_file(path: impl AsRef<Path>) -> Result<SceneDescription, SceneLoadError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| SceneLoadError {
        status: LoadStatus::Io,
        message: format!("cannot read {}", path.display()),
        line: 0,
        source: Some(e),
    })?;
    parse_scene(&text)
}
