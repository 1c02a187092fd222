//! Verification conditions and state checks for scenarios

use glam::IVec2;
use serde::{Deserialize, Serialize};
use tsubu_core::World;
use tsubu_core::simulation::{MaterialId, Particle};

/// Conditions that can be verified against world state
///
/// Materials are referenced by registry name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum VerificationCondition {
    // === MATERIAL CHECKS ===
    /// Assert the material at a cell (`None` = empty)
    MaterialAt {
        x: i32,
        y: i32,
        expected: Option<String>,
    },

    /// Assert exact material count in region
    MaterialCount {
        material: String,
        region: Region,
        expected: usize,
        tolerance: Option<usize>, // Allow ±N variance
    },

    /// Assert material count within range
    MaterialCountRange {
        material: String,
        region: Region,
        min: usize,
        max: usize,
    },

    /// Assert no particle in region
    RegionEmpty { region: Region },

    /// Assert every cell of the region is occupied
    RegionFilled { region: Region },

    // === THERMAL CHECKS ===
    /// Assert the temperature of every particle in the region
    TemperatureRange { region: Region, min: f32, max: f32 },

    /// Assert the temperature of a single particle
    TemperatureAt { x: i32, y: i32, min: f32, max: f32 },

    // === ELECTRICAL CHECKS ===
    /// Assert whether the particle at a cell holds a charge
    Charged { x: i32, y: i32, expected: bool },

    // === PHYSICS CHECKS ===
    /// Assert the largest field pressure (passes trivially with the
    /// extension off)
    MaxPressureBelow { value: f32 },

    /// Assert the grid/particle invariant
    Consistent,

    // === LOGICAL OPERATORS ===
    /// All conditions must pass
    All {
        conditions: Vec<VerificationCondition>,
    },

    /// Any condition must pass
    Any {
        conditions: Vec<VerificationCondition>,
    },

    /// Condition must NOT pass
    Not {
        condition: Box<VerificationCondition>,
    },
}

/// Spatial region for verification
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Region {
    /// Rectangular region (inclusive)
    Rect {
        min_x: i32,
        min_y: i32,
        max_x: i32,
        max_y: i32,
    },

    /// Circular region
    Circle {
        center_x: i32,
        center_y: i32,
        radius: u32,
    },

    /// Entire grid
    Whole,
}

impl Region {
    pub fn contains(&self, pos: IVec2) -> bool {
        match *self {
            Region::Rect {
                min_x,
                min_y,
                max_x,
                max_y,
            } => pos.x >= min_x && pos.x <= max_x && pos.y >= min_y && pos.y <= max_y,
            Region::Circle {
                center_x,
                center_y,
                radius,
            } => {
                let d = pos - IVec2::new(center_x, center_y);
                i64::from(d.x).pow(2) + i64::from(d.y).pow(2) <= i64::from(radius).pow(2)
            }
            Region::Whole => true,
        }
    }

    /// Every in-bounds cell of the region
    fn cells(&self, world: &World) -> Vec<IVec2> {
        let mut cells = Vec::new();
        for y in 0..world.height() {
            for x in 0..world.width() {
                let pos = IVec2::new(x, y);
                if self.contains(pos) {
                    cells.push(pos);
                }
            }
        }
        cells
    }
}

/// Result of a verification check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub passed: bool,
    pub message: String,
    pub actual_value: Option<String>, // For debugging
}

impl VerificationResult {
    fn unknown_material(name: &str) -> Self {
        Self {
            passed: false,
            message: format!("Unknown material `{}`", name),
            actual_value: None,
        }
    }
}

impl VerificationCondition {
    /// Evaluate condition against world state
    pub fn evaluate(&self, world: &World) -> VerificationResult {
        match self {
            VerificationCondition::MaterialAt { x, y, expected } => {
                let expected_id = match expected {
                    Some(name) => match world.materials().id_of(name) {
                        Some(id) => Some(id),
                        None => return VerificationResult::unknown_material(name),
                    },
                    None => None,
                };
                let actual = world.material_at(*x, *y);
                let passed = actual == expected_id;

                VerificationResult {
                    passed,
                    message: format!(
                        "Material at ({}, {}): expected {}, got {}",
                        x,
                        y,
                        expected.as_deref().unwrap_or("empty"),
                        material_name(world, actual)
                    ),
                    actual_value: Some(material_name(world, actual)),
                }
            }

            VerificationCondition::MaterialCount {
                material,
                region,
                expected,
                tolerance,
            } => {
                let Some(id) = world.materials().id_of(material) else {
                    return VerificationResult::unknown_material(material);
                };
                let actual = count_material_in_region(world, id, region);
                let tol = tolerance.unwrap_or(0);
                let passed = actual >= expected.saturating_sub(tol) && actual <= expected + tol;

                VerificationResult {
                    passed,
                    message: format!(
                        "Material {} count in {:?}: expected {}±{}, got {}",
                        material, region, expected, tol, actual
                    ),
                    actual_value: Some(actual.to_string()),
                }
            }

            VerificationCondition::MaterialCountRange {
                material,
                region,
                min,
                max,
            } => {
                let Some(id) = world.materials().id_of(material) else {
                    return VerificationResult::unknown_material(material);
                };
                let actual = count_material_in_region(world, id, region);
                let passed = actual >= *min && actual <= *max;

                VerificationResult {
                    passed,
                    message: format!(
                        "Material {} count in {:?}: expected {}-{}, got {}",
                        material, region, min, max, actual
                    ),
                    actual_value: Some(actual.to_string()),
                }
            }

            VerificationCondition::RegionEmpty { region } => {
                let occupied = particles_in_region(world, region).count();
                let passed = occupied == 0;

                VerificationResult {
                    passed,
                    message: format!("Region {:?} empty: {} particles", region, occupied),
                    actual_value: Some(occupied.to_string()),
                }
            }

            VerificationCondition::RegionFilled { region } => {
                let cells = region.cells(world);
                let vacant = cells
                    .iter()
                    .filter(|pos| world.get(pos.x, pos.y).is_none())
                    .count();
                let passed = vacant == 0;

                VerificationResult {
                    passed,
                    message: format!(
                        "Region {:?} filled: {} vacant / {} cells",
                        region,
                        vacant,
                        cells.len()
                    ),
                    actual_value: Some(format!("{}/{}", vacant, cells.len())),
                }
            }

            VerificationCondition::TemperatureRange { region, min, max } => {
                let mut lowest = f32::INFINITY;
                let mut highest = f32::NEG_INFINITY;
                for particle in particles_in_region(world, region) {
                    lowest = lowest.min(particle.temperature);
                    highest = highest.max(particle.temperature);
                }
                // An empty region has nothing out of range
                let passed = lowest > highest || (lowest >= *min && highest <= *max);

                VerificationResult {
                    passed,
                    message: format!(
                        "Temperature in {:?}: expected {:.1}..{:.1}, got {:.1}..{:.1}",
                        region, min, max, lowest, highest
                    ),
                    actual_value: Some(format!("{:.1}..{:.1}", lowest, highest)),
                }
            }

            VerificationCondition::TemperatureAt { x, y, min, max } => {
                let actual = world.temperature_at(*x, *y);
                let passed = actual.is_some_and(|t| t >= *min && t <= *max);

                VerificationResult {
                    passed,
                    message: format!(
                        "Temperature at ({}, {}): expected {:.1}..{:.1}, got {}",
                        x,
                        y,
                        min,
                        max,
                        actual.map_or("empty".to_string(), |t| format!("{:.1}", t))
                    ),
                    actual_value: actual.map(|t| format!("{:.1}", t)),
                }
            }

            VerificationCondition::Charged { x, y, expected } => {
                let actual = world.get(*x, *y).map(|p| p.electric.is_charged());
                let passed = actual == Some(*expected);

                VerificationResult {
                    passed,
                    message: format!(
                        "Charge at ({}, {}): expected {}, got {:?}",
                        x, y, expected, actual
                    ),
                    actual_value: actual.map(|c| c.to_string()),
                }
            }

            VerificationCondition::MaxPressureBelow { value } => {
                let actual = world.field().map_or(0.0, |f| f.max_pressure());
                let passed = actual < *value;

                VerificationResult {
                    passed,
                    message: format!(
                        "Max field pressure: expected < {}, got {:.4}",
                        value, actual
                    ),
                    actual_value: Some(format!("{:.4}", actual)),
                }
            }

            VerificationCondition::Consistent => match world.check_consistency() {
                Ok(()) => VerificationResult {
                    passed: true,
                    message: "Grid consistent".to_string(),
                    actual_value: None,
                },
                Err(e) => VerificationResult {
                    passed: false,
                    message: format!("Grid inconsistent: {}", e),
                    actual_value: Some(e.to_string()),
                },
            },

            VerificationCondition::All { conditions } => {
                let mut all_passed = true;
                let mut messages = Vec::new();

                for cond in conditions {
                    let result = cond.evaluate(world);
                    if !result.passed {
                        all_passed = false;
                        messages.push(result.message);
                    }
                }

                VerificationResult {
                    passed: all_passed,
                    message: if all_passed {
                        format!("All {} conditions passed", conditions.len())
                    } else {
                        format!("Failed: {}", messages.join("; "))
                    },
                    actual_value: None,
                }
            }

            VerificationCondition::Any { conditions } => {
                let results: Vec<_> = conditions.iter().map(|c| c.evaluate(world)).collect();
                let any_passed = results.iter().any(|r| r.passed);

                VerificationResult {
                    passed: any_passed,
                    message: if any_passed {
                        "At least one condition passed".to_string()
                    } else {
                        format!(
                            "None passed: {}",
                            results
                                .iter()
                                .map(|r| r.message.as_str())
                                .collect::<Vec<_>>()
                                .join("; ")
                        )
                    },
                    actual_value: None,
                }
            }

            VerificationCondition::Not { condition } => {
                let result = condition.evaluate(world);

                VerificationResult {
                    passed: !result.passed,
                    message: format!("NOT ({})", result.message),
                    actual_value: result.actual_value,
                }
            }
        }
    }
}

fn particles_in_region<'a>(
    world: &'a World,
    region: &'a Region,
) -> impl Iterator<Item = &'a Particle> + 'a {
    world
        .grid()
        .iter()
        .filter(move |p| region.contains(p.position))
}

fn count_material_in_region(world: &World, material: MaterialId, region: &Region) -> usize {
    particles_in_region(world, region)
        .filter(|p| p.material == material)
        .count()
}

fn material_name(world: &World, id: Option<MaterialId>) -> String {
    match id {
        Some(id) => world.materials().get(id).name.clone(),
        None => "empty".to_string(),
    }
}
