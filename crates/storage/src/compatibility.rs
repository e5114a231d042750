//! Storage compatibility between what a product requires and what a zone supports.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use wareflow_core::ValueObject;

use crate::zone::{StorageCondition, TemperatureRange, Zone, ZoneId};

/// What a product needs from the zone it is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRequirement {
    pub temperature: TemperatureRange,
    pub condition: StorageCondition,
}

impl ValueObject for StorageRequirement {}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompatibilityError {
    #[error("requires {required}, zone {zone_id} supports {supported}")]
    Temperature {
        zone_id: ZoneId,
        required: TemperatureRange,
        supported: TemperatureRange,
    },

    #[error("requires {required} storage, zone {zone_id} supports {supported:?}")]
    Condition {
        zone_id: ZoneId,
        required: StorageCondition,
        supported: Vec<StorageCondition>,
    },
}

/// The product range must be a subset of the zone range (bounds inclusive).
pub fn is_temperature_compatible(product: &TemperatureRange, zone: &TemperatureRange) -> bool {
    zone.contains(product)
}

pub fn is_condition_compatible(product: StorageCondition, zone: &[StorageCondition]) -> bool {
    zone.contains(&product)
}

impl StorageRequirement {
    /// Check both axes against `zone`, temperature first.
    pub fn check(&self, zone: &Zone) -> Result<(), CompatibilityError> {
        if !is_temperature_compatible(&self.temperature, zone.temperature()) {
            return Err(CompatibilityError::Temperature {
                zone_id: zone.id_typed(),
                required: self.temperature,
                supported: *zone.temperature(),
            });
        }
        if !is_condition_compatible(self.condition, zone.conditions()) {
            return Err(CompatibilityError::Condition {
                zone_id: zone.id_typed(),
                required: self.condition,
                supported: zone.conditions().to_vec(),
            });
        }
        Ok(())
    }

    pub fn is_satisfied_by(&self, zone: &Zone) -> bool {
        self.check(zone).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::fixtures::{range, zone};

    #[test]
    fn boundary_inclusive_containment() {
        assert!(is_temperature_compatible(&range(5, 8), &range(2, 8)));
        assert!(is_temperature_compatible(&range(2, 8), &range(2, 8)));
        assert!(!is_temperature_compatible(&range(5, 9), &range(2, 8)));
        assert!(!is_temperature_compatible(&range(1, 4), &range(2, 8)));
    }

    #[test]
    fn overlap_alone_is_not_enough() {
        assert!(!is_temperature_compatible(&range(0, 10), &range(2, 8)));
    }

    #[test]
    fn check_reports_the_failing_axis() {
        let z = zone(100, 0); // [2, 8], refrigerated

        let too_warm = StorageRequirement { temperature: range(5, 9), condition: StorageCondition::Refrigerated };
        assert!(matches!(too_warm.check(&z), Err(CompatibilityError::Temperature { .. })));

        let wrong_kind = StorageRequirement { temperature: range(3, 5), condition: StorageCondition::Frozen };
        assert!(matches!(wrong_kind.check(&z), Err(CompatibilityError::Condition { .. })));

        let fits = StorageRequirement { temperature: range(3, 5), condition: StorageCondition::Refrigerated };
        assert!(fits.is_satisfied_by(&z));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: compatibility is exactly closed-interval containment.
            #[test]
            fn compatible_iff_contained(
                zmin in -40i64..40, zspan in 1i64..40,
                pmin in -40i64..40, pspan in 0i64..40
            ) {
                let zone_range = range(zmin, zmin + zspan);
                let product_range = range(pmin, pmin + pspan);
                let expected = pmin >= zmin && pmin + pspan <= zmin + zspan;
                prop_assert_eq!(is_temperature_compatible(&product_range, &zone_range), expected);
            }
        }
    }
}
