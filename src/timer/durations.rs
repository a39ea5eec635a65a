//! Crop, planter and stage types plus the fixed growth duration table.

use serde::{Deserialize, Serialize};

/// Crop grown in the planter. Decides which row of the duration table applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropType {
    Coca,
    #[serde(alias = "marijuana")]
    Cannabis,
}

impl CropType {
    pub fn display_name(self) -> &'static str {
        match self {
            CropType::Coca => "Coca",
            CropType::Cannabis => "Cannabis",
        }
    }
}

impl std::fmt::Display for CropType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Planter the crop sits in. Only the Flowering duration depends on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanterType {
    Basic,
    #[serde(alias = "planter_box")]
    Box,
}

impl std::fmt::Display for PlanterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanterType::Basic => write!(f, "Basic"),
            PlanterType::Box => write!(f, "Planter Box"),
        }
    }
}

/// Crop label read off the screen alongside the percentage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CropLabel {
    Coca,
    Cannabis,
    #[default]
    Unknown,
}

impl CropLabel {
    /// The crop this label identifies, if any.
    pub fn crop(self) -> Option<CropType> {
        match self {
            CropLabel::Coca => Some(CropType::Coca),
            CropLabel::Cannabis => Some(CropType::Cannabis),
            CropLabel::Unknown => None,
        }
    }
}

/// Growth stages in the order a plant passes through them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Growing,
    Ready,
    Flowering,
    Seeding,
}

impl Stage {
    /// The stage that follows this one. Seeding is terminal.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Growing => Some(Stage::Ready),
            Stage::Ready => Some(Stage::Flowering),
            Stage::Flowering => Some(Stage::Seeding),
            Stage::Seeding => None,
        }
    }

    /// Whether this stage counts down to a next stage.
    pub fn is_timed(self) -> bool {
        self != Stage::Seeding
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Growing => write!(f, "Growing"),
            Stage::Ready => write!(f, "Ready"),
            Stage::Flowering => write!(f, "Flowering"),
            Stage::Seeding => write!(f, "Seeding"),
        }
    }
}

const MINUTE: f64 = 60.0;

/// Duration of `stage` in seconds, or `None` for the unbounded Seeding stage.
pub fn stage_duration(crop: CropType, stage: Stage, planter: PlanterType) -> Option<f64> {
    let minutes = match (crop, stage, planter) {
        (_, Stage::Seeding, _) => return None,
        (crop, Stage::Growing, _) => growing_minutes(crop),
        (CropType::Coca, Stage::Ready, _) => 7.5,
        (CropType::Coca, Stage::Flowering, PlanterType::Basic) => 8.0,
        (CropType::Coca, Stage::Flowering, PlanterType::Box) => 7.5,
        (CropType::Cannabis, Stage::Ready, _) => 4.0,
        (CropType::Cannabis, Stage::Flowering, PlanterType::Basic) => 3.5,
        (CropType::Cannabis, Stage::Flowering, PlanterType::Box) => 3.0,
    };
    Some(minutes * MINUTE)
}

/// Growing is the same in every planter.
fn growing_minutes(crop: CropType) -> f64 {
    match crop {
        CropType::Coca => 38.0,
        CropType::Cannabis => 19.0,
    }
}

/// Full Growing duration for `crop`, equal to the Growing row of
/// [`stage_duration`] for any planter.
pub fn growing_duration(crop: CropType) -> f64 {
    growing_minutes(crop) * MINUTE
}
