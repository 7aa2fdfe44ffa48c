//! Core data models for poemarket
//!
//! This module contains the data types used throughout the application for
//! representing leagues, currency and item price lines, characters and
//! their items. Per-upstream wire formats live with their clients; these
//! are the normalized shapes the UI consumes.

pub mod account;
pub mod auth;
pub mod fallback;
pub mod leagues;
pub mod ninja;
pub mod prices;
pub mod trade;
pub mod wiki;

pub use account::{AccountClient, AccountError};
pub use auth::{AuthClient, AuthError, AuthToken, PkceMaterial, TokenStore};
pub use fallback::{resolve_candidates, Exhausted};
pub use leagues::{LeaguesClient, LeaguesError};
pub use ninja::{CurrencyKind, CurrencyOverview, NinjaClient, NinjaError};
pub use prices::{PricePrediction, PricePredictionClient, PricePredictionError};
pub use trade::{TradeClient, TradeError, TradeQuery};
pub use wiki::{WikiClient, WikiError};

use serde::{Deserialize, Serialize};

/// Game realm a request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Realm {
    #[default]
    Pc,
    Xbox,
    Sony,
}

impl Realm {
    /// Wire value used in upstream query strings
    pub fn as_str(&self) -> &'static str {
        match self {
            Realm::Pc => "pc",
            Realm::Xbox => "xbox",
            Realm::Sony => "sony",
        }
    }

    /// Parses a realm argument, case-insensitively.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pc" => Some(Realm::Pc),
            "xbox" => Some(Realm::Xbox),
            "sony" | "psn" | "playstation" => Some(Realm::Sony),
            _ => None,
        }
    }
}

/// Broad league classification derived from the league id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeagueKind {
    /// The permanent softcore league
    Standard,
    /// Permanent or seasonal hardcore
    Hardcore,
    /// A temporary challenge league
    Challenge,
}

/// A league as presented to the UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct League {
    /// League id, e.g. "Mercenaries"
    pub id: String,
    /// Realm this league belongs to
    pub realm: Realm,
    /// Human-readable description, when the upstream provides one
    pub description: Option<String>,
    /// Broad classification
    pub kind: LeagueKind,
    /// True for active, non-permanent challenge leagues
    pub current: bool,
    /// League start, RFC 3339 as supplied upstream
    pub start_at: Option<String>,
    /// League end, RFC 3339 as supplied upstream
    pub end_at: Option<String>,
}

impl League {
    /// True for the two core permanent leagues, which sort ahead of
    /// everything else in the picker.
    pub fn is_core(&self) -> bool {
        self.id.eq_ignore_ascii_case("Standard") || self.id.eq_ignore_ascii_case("Hardcore")
    }
}

/// Price history sparkline: one sample per day, with gaps where the
/// aggregator had no confident datapoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SparkLine {
    /// Relative change per sample; `None` marks a gap
    #[serde(default)]
    pub data: Vec<Option<f64>>,
    /// Total change over the window, percent
    #[serde(rename = "totalChange", default)]
    pub total_change: f64,
}

/// One side of a currency exchange (pay or receive) as aggregated upstream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeSide {
    /// Exchange rate in chaos terms
    pub value: f64,
    /// Number of listings sampled
    #[serde(default)]
    pub count: u32,
    /// Distinct datapoints behind the sample
    #[serde(default)]
    pub data_point_count: Option<u32>,
}

/// A currency price line, normalized for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyLine {
    /// Display name, e.g. "Divine Orb"
    pub currency_type_name: String,
    /// Value in Chaos Orbs
    pub chaos_equivalent: Option<f64>,
    /// Value in Divine Orbs, derived from the divine line of the same
    /// overview when present
    pub divine_equivalent: Option<f64>,
    /// Stable slug used by the aggregator, e.g. "divine-orb"
    pub details_id: String,
    /// Icon URL joined from the overview's details section
    pub icon: Option<String>,
    /// Buy side
    pub pay: Option<ExchangeSide>,
    /// Sell side
    pub receive: Option<ExchangeSide>,
    /// Buy-side price history
    pub pay_spark_line: Option<SparkLine>,
    /// Sell-side price history
    pub receive_spark_line: Option<SparkLine>,
}

/// An item price line (uniques, maps, cards, ...), normalized for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemLine {
    /// Item name
    pub name: String,
    /// Base type, where the category has one
    pub base_type: Option<String>,
    /// Value in Chaos Orbs
    pub chaos_value: Option<f64>,
    /// Value in Divine Orbs
    pub divine_value: Option<f64>,
    /// Icon URL
    pub icon: Option<String>,
    /// Stable slug used by the aggregator
    pub details_id: Option<String>,
    /// Listings behind the price
    pub listing_count: Option<u32>,
    /// Price history
    pub spark_line: Option<SparkLine>,
    /// Map tier, for map categories
    pub map_tier: Option<u32>,
    /// Gem level, for gem categories
    pub gem_level: Option<u32>,
    /// Socket links, for linked uniques
    pub links: Option<u32>,
}

/// Item overview categories understood by the price aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    UniqueWeapon,
    UniqueArmour,
    UniqueAccessory,
    UniqueFlask,
    UniqueJewel,
    UniqueMap,
    UniqueTincture,
    Map,
    DivinationCard,
    SkillGem,
    Essence,
    Scarab,
    Runegraft,
    AllflameEmber,
    Artifact,
    BaseType,
}

impl ItemType {
    /// Primary wire name for the overview `type` parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::UniqueWeapon => "UniqueWeapon",
            ItemType::UniqueArmour => "UniqueArmour",
            ItemType::UniqueAccessory => "UniqueAccessory",
            ItemType::UniqueFlask => "UniqueFlask",
            ItemType::UniqueJewel => "UniqueJewel",
            ItemType::UniqueMap => "UniqueMap",
            ItemType::UniqueTincture => "UniqueTincture",
            ItemType::Map => "Map",
            ItemType::DivinationCard => "DivinationCard",
            ItemType::SkillGem => "SkillGem",
            ItemType::Essence => "Essence",
            ItemType::Scarab => "Scarab",
            ItemType::Runegraft => "Runegraft",
            ItemType::AllflameEmber => "AllflameEmber",
            ItemType::Artifact => "Artifact",
            ItemType::BaseType => "BaseType",
        }
    }

    /// Alternate wire names for categories whose upstream naming has
    /// shifted between league cycles. Tried in order when the primary
    /// name yields no lines.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            ItemType::UniqueTincture => &["Tincture"],
            ItemType::Runegraft => &["Runegrafts"],
            ItemType::AllflameEmber => &["AllflameEmbers"],
            ItemType::Artifact => &["Artifacts"],
            ItemType::BaseType => &["Base Types", "BaseTypes"],
            _ => &[],
        }
    }

    /// Parses a CLI/user argument into a category, accepting a few short
    /// forms alongside the wire names.
    pub fn from_arg(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "uniqueweapon" | "weapon" | "weapons" => Some(ItemType::UniqueWeapon),
            "uniquearmour" | "armour" | "armor" => Some(ItemType::UniqueArmour),
            "uniqueaccessory" | "accessory" | "accessories" => Some(ItemType::UniqueAccessory),
            "uniqueflask" | "flask" | "flasks" => Some(ItemType::UniqueFlask),
            "uniquejewel" | "jewel" | "jewels" => Some(ItemType::UniqueJewel),
            "uniquemap" | "uniquemaps" => Some(ItemType::UniqueMap),
            "uniquetincture" | "tincture" | "tinctures" => Some(ItemType::UniqueTincture),
            "map" | "maps" => Some(ItemType::Map),
            "divinationcard" | "card" | "cards" => Some(ItemType::DivinationCard),
            "skillgem" | "gem" | "gems" => Some(ItemType::SkillGem),
            "essence" | "essences" => Some(ItemType::Essence),
            "scarab" | "scarabs" => Some(ItemType::Scarab),
            "runegraft" | "runegrafts" => Some(ItemType::Runegraft),
            "allflameember" | "ember" | "embers" => Some(ItemType::AllflameEmber),
            "artifact" | "artifacts" => Some(ItemType::Artifact),
            "basetype" | "basetypes" => Some(ItemType::BaseType),
            _ => None,
        }
    }
}

/// A character on the authenticated account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    /// Character name
    pub name: String,
    /// Level, 1-100
    pub level: u32,
    /// Class name, e.g. "Witch"
    pub class: String,
    /// Numeric class id, when supplied
    pub class_id: Option<u32>,
    /// League the character plays in
    pub league: Option<String>,
    /// Ascendancy class index, when ascended
    pub ascendancy_class: Option<u32>,
    /// Last-activity marker as supplied upstream
    pub last_active: Option<bool>,
}

/// Socket on an equipped item, normalized to group + colour letter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSocket {
    /// Link group index
    pub group: u32,
    /// Socket colour: "r", "g", "b", "w"
    pub colour: String,
}

/// A gem socketed into an item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketedGem {
    pub id: String,
    pub name: String,
    pub type_line: String,
    pub icon: Option<String>,
    /// True for support gems, detected from the type line
    pub support: bool,
}

/// A named property carried through from the upstream item payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemProperty {
    pub name: String,
    /// Value tuples as supplied upstream; kept opaque
    #[serde(default)]
    pub values: Vec<serde_json::Value>,
}

/// An item in a character's equipment or inventory, trimmed for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterItem {
    pub id: String,
    pub name: String,
    pub type_line: String,
    pub icon: Option<String>,
    /// Equipment slot or stash grid, e.g. "Weapon", "MainInventory"
    pub inventory_id: String,
    /// Rarity frame: 0 normal, 1 magic, 2 rare, 3 unique
    pub frame_type: u32,
    /// Grid width in cells
    pub w: u32,
    /// Grid height in cells
    pub h: u32,
    pub ilvl: Option<u32>,
    pub corrupted: bool,
    pub note: Option<String>,
    pub sockets: Vec<ItemSocket>,
    pub socketed_items: Vec<SocketedGem>,
    pub properties: Vec<ItemProperty>,
    pub implicit_mods: Vec<String>,
    pub explicit_mods: Vec<String>,
    pub crafted_mods: Vec<String>,
    pub enchant_mods: Vec<String>,
    pub fractured_mods: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn realm_wire_values() {
        assert_eq!(Realm::Pc.as_str(), "pc");
        assert_eq!(Realm::Xbox.as_str(), "xbox");
        assert_eq!(Realm::Sony.as_str(), "sony");
    }

    #[test]
    fn realm_parsing() {
        assert_eq!(Realm::from_str("PC"), Some(Realm::Pc));
        assert_eq!(Realm::from_str("playstation"), Some(Realm::Sony));
        assert_eq!(Realm::from_str("switch"), None);
    }

    #[test]
    fn item_type_aliases_only_where_naming_is_uncertain() {
        assert!(ItemType::UniqueWeapon.aliases().is_empty());
        assert_eq!(ItemType::UniqueTincture.aliases(), &["Tincture"]);
        assert_eq!(ItemType::BaseType.aliases(), &["Base Types", "BaseTypes"]);
    }

    #[test]
    fn item_type_arg_parsing() {
        assert_eq!(ItemType::from_arg("weapons"), Some(ItemType::UniqueWeapon));
        assert_eq!(ItemType::from_arg("Map"), Some(ItemType::Map));
        assert_eq!(ItemType::from_arg("cards"), Some(ItemType::DivinationCard));
        assert_eq!(ItemType::from_arg("nonsense"), None);
    }

    #[test]
    fn sparkline_deserializes_null_gaps() {
        let json = r#"{"data": [0.0, null, -1.5, 2.0], "totalChange": 0.5}"#;
        let spark: SparkLine = serde_json::from_str(json).unwrap();
        assert_eq!(spark.data.len(), 4);
        assert_eq!(spark.data[1], None);
        assert!((spark.total_change - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn currency_line_round_trip() {
        let line = CurrencyLine {
            currency_type_name: "Divine Orb".to_string(),
            chaos_equivalent: Some(180.0),
            divine_equivalent: Some(1.0),
            details_id: "divine-orb".to_string(),
            icon: None,
            pay: Some(ExchangeSide {
                value: 0.0055,
                count: 40,
                data_point_count: Some(40),
            }),
            receive: None,
            pay_spark_line: None,
            receive_spark_line: Some(SparkLine {
                data: vec![Some(0.0), Some(1.2)],
                total_change: 1.2,
            }),
        };

        let json = serde_json::to_string(&line).unwrap();
        let back: CurrencyLine = serde_json::from_str(&json).unwrap();
        assert_eq!(back.currency_type_name, "Divine Orb");
        assert_eq!(back.chaos_equivalent, Some(180.0));
        assert!(back.receive_spark_line.is_some());
    }

    #[test]
    fn core_league_detection() {
        let standard = League {
            id: "Standard".to_string(),
            realm: Realm::Pc,
            description: None,
            kind: LeagueKind::Standard,
            current: false,
            start_at: None,
            end_at: None,
        };
        assert!(standard.is_core());

        let challenge = League {
            id: "Mercenaries".to_string(),
            realm: Realm::Pc,
            description: None,
            kind: LeagueKind::Challenge,
            current: true,
            start_at: None,
            end_at: None,
        };
        assert!(!challenge.is_core());
    }
}
