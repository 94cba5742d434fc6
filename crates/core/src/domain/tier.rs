use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Bronze, Tier::Silver, Tier::Gold, Tier::Platinum];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
            Self::Platinum => "platinum",
        }
    }

    /// Ordinal rank, bronze lowest.
    pub fn rank(self) -> u8 {
        match self {
            Self::Bronze => 1,
            Self::Silver => 2,
            Self::Gold => 3,
            Self::Platinum => 4,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bronze" => Ok(Self::Bronze),
            "silver" => Ok(Self::Silver),
            "gold" => Ok(Self::Gold),
            "platinum" => Ok(Self::Platinum),
            other => Err(ValidationError::UnsupportedValue { field: "tier", value: other.to_owned() }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierProfile {
    pub tier: Tier,
    pub display_name: String,
    pub benefits: Vec<String>,
    /// Inclusive lower bound of annual sales volume.
    pub min_annual_volume: Decimal,
    /// Exclusive upper bound; `None` for the top tier.
    pub max_annual_volume: Option<Decimal>,
}

impl TierProfile {
    fn contains_volume(&self, volume: Decimal) -> bool {
        volume >= self.min_annual_volume
            && self.max_annual_volume.map_or(true, |max| volume < max)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TierRegistry {
    profiles: Vec<TierProfile>,
}

impl Default for TierRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl TierRegistry {
    pub fn standard() -> Self {
        let profile = |tier: Tier, name: &str, benefits: &[&str], min: i64, max: Option<i64>| {
            TierProfile {
                tier,
                display_name: name.to_owned(),
                benefits: benefits.iter().map(|benefit| (*benefit).to_owned()).collect(),
                min_annual_volume: Decimal::from(min),
                max_annual_volume: max.map(Decimal::from),
            }
        };

        Self {
            profiles: vec![
                profile(
                    Tier::Bronze,
                    "Bronze",
                    &["Basic commission rates", "Standard support", "Quarterly reviews"],
                    0,
                    Some(50_000),
                ),
                profile(
                    Tier::Silver,
                    "Silver",
                    &[
                        "Enhanced commission rates",
                        "Priority support",
                        "Monthly reviews",
                        "Training access",
                    ],
                    50_000,
                    Some(250_000),
                ),
                profile(
                    Tier::Gold,
                    "Gold",
                    &[
                        "Premium commission rates",
                        "Dedicated support",
                        "Weekly reviews",
                        "Marketing support",
                    ],
                    250_000,
                    Some(1_000_000),
                ),
                profile(
                    Tier::Platinum,
                    "Platinum",
                    &[
                        "VIP commission rates",
                        "24/7 support",
                        "Daily insights",
                        "Co-marketing programs",
                        "Executive access",
                    ],
                    1_000_000,
                    None,
                ),
            ],
        }
    }

    pub fn profile(&self, tier: Tier) -> Option<&TierProfile> {
        self.profiles.iter().find(|profile| profile.tier == tier)
    }

    pub fn profiles(&self) -> &[TierProfile] {
        &self.profiles
    }

    /// Tier whose annual volume band contains `volume`. Negative volumes map to no tier.
    pub fn tier_for_volume(&self, volume: Decimal) -> Option<Tier> {
        self.profiles.iter().find(|profile| profile.contains_volume(volume)).map(|profile| profile.tier)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{Tier, TierRegistry};

    #[test]
    fn ranks_are_ordinal() {
        let ranks: Vec<u8> = Tier::ALL.iter().map(|tier| tier.rank()).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
        assert!(Tier::Platinum > Tier::Bronze);
    }

    #[test]
    fn parses_case_insensitively_and_rejects_unknown() {
        assert_eq!(" Gold ".parse::<Tier>(), Ok(Tier::Gold));
        assert!("diamond".parse::<Tier>().is_err());
    }

    #[test]
    fn volume_bands_are_contiguous() {
        let registry = TierRegistry::standard();
        assert_eq!(registry.tier_for_volume(Decimal::ZERO), Some(Tier::Bronze));
        assert_eq!(registry.tier_for_volume(Decimal::from(49_999)), Some(Tier::Bronze));
        assert_eq!(registry.tier_for_volume(Decimal::from(50_000)), Some(Tier::Silver));
        assert_eq!(registry.tier_for_volume(Decimal::from(999_999)), Some(Tier::Gold));
        assert_eq!(registry.tier_for_volume(Decimal::from(5_000_000)), Some(Tier::Platinum));
        assert_eq!(registry.tier_for_volume(Decimal::from(-1)), None);
    }

    #[test]
    fn every_tier_has_a_profile() {
        let registry = TierRegistry::default();
        for tier in Tier::ALL {
            let profile = registry.profile(tier).expect("profile");
            assert!(!profile.benefits.is_empty());
        }
    }
}
