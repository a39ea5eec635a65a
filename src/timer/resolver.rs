//! Effective crop resolution.
//!
//! The configured crop is used until auto-detection reads a crop label off the
//! screen. The first label seen during a run wins and stays latched until the
//! run ends, so a later unreadable or contradictory label never flips it back.

use super::durations::{CropLabel, CropType, PlanterType};

/// Read-only view of the configuration values the engine cares about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerSettings {
    pub crop: CropType,
    pub planter: PlanterType,
    pub auto_detect: bool,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            crop: CropType::Coca,
            planter: PlanterType::Basic,
            auto_detect: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CropResolver {
    manual: CropType,
    auto_detect: bool,
    latched: Option<CropType>,
}

impl CropResolver {
    pub fn new(settings: &TimerSettings) -> Self {
        Self {
            manual: settings.crop,
            auto_detect: settings.auto_detect,
            latched: None,
        }
    }

    /// Crop used for duration lookups right now.
    pub fn effective(&self) -> CropType {
        match (self.auto_detect, self.latched) {
            (true, Some(crop)) => crop,
            _ => self.manual,
        }
    }

    /// Feeds one detected label. Returns the new effective crop when this label
    /// latched a crop different from the one in effect before.
    pub fn observe(&mut self, label: CropLabel) -> Option<CropType> {
        if !self.auto_detect || self.latched.is_some() {
            return None;
        }
        let crop = label.crop()?;
        let before = self.effective();
        self.latched = Some(crop);
        (crop != before).then_some(crop)
    }

    /// Turns auto-detection on or off. Disabling drops any latched detection.
    /// Returns true when the effective crop changed as a result.
    pub fn set_auto_detect(&mut self, enabled: bool) -> bool {
        if enabled == self.auto_detect {
            return false;
        }
        let before = self.effective();
        self.auto_detect = enabled;
        if !enabled {
            self.latched = None;
        }
        before != self.effective()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(crop: CropType, auto_detect: bool) -> TimerSettings {
        TimerSettings {
            crop,
            planter: PlanterType::Basic,
            auto_detect,
        }
    }

    #[test]
    fn test_manual_crop_without_detection() {
        let resolver = CropResolver::new(&settings(CropType::Cannabis, true));
        assert_eq!(resolver.effective(), CropType::Cannabis);
    }

    #[test]
    fn test_first_detection_latches() {
        let mut resolver = CropResolver::new(&settings(CropType::Cannabis, true));
        assert_eq!(resolver.observe(CropLabel::Coca), Some(CropType::Coca));
        assert_eq!(resolver.observe(CropLabel::Unknown), None);
        assert_eq!(resolver.observe(CropLabel::Cannabis), None);
        assert_eq!(resolver.effective(), CropType::Coca);
    }

    #[test]
    fn test_detection_matching_manual_latches_without_change() {
        let mut resolver = CropResolver::new(&settings(CropType::Coca, true));
        assert_eq!(resolver.observe(CropLabel::Coca), None);
        assert_eq!(resolver.observe(CropLabel::Cannabis), None);
        assert_eq!(resolver.effective(), CropType::Coca);
    }

    #[test]
    fn test_detection_ignored_when_disabled() {
        let mut resolver = CropResolver::new(&settings(CropType::Coca, false));
        assert_eq!(resolver.observe(CropLabel::Cannabis), None);
        assert_eq!(resolver.effective(), CropType::Coca);
    }

    #[test]
    fn test_disabling_drops_latch() {
        let mut resolver = CropResolver::new(&settings(CropType::Coca, true));
        resolver.observe(CropLabel::Cannabis);
        assert!(resolver.set_auto_detect(false));
        assert_eq!(resolver.effective(), CropType::Coca);
        assert!(!resolver.set_auto_detect(true));
        assert_eq!(resolver.observe(CropLabel::Cannabis), Some(CropType::Cannabis));
    }
}
