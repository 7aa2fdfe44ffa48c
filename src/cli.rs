//! Command-line interface parsing for poemarket
//!
//! This module handles parsing of CLI arguments using clap, including the
//! --items flag for direct item-overview access with an optional category.

use clap::Parser;
use thiserror::Error;

use crate::data::{ItemType, Realm};

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The specified realm is not recognized
    #[error("Invalid realm: '{0}'. Valid realms: pc, xbox, sony")]
    InvalidRealm(String),

    /// The specified item category is not recognized
    #[error("Invalid item category: '{0}'. Examples: weapons, armour, flasks, jewels, maps, cards, gems, essences, scarabs")]
    InvalidCategory(String),
}

/// poemarket - Path of Exile economy dashboard for the terminal
#[derive(Parser, Debug)]
#[command(name = "poemarket")]
#[command(about = "Path of Exile currency and item prices in the terminal")]
#[command(version)]
pub struct Cli {
    /// League to open with (defaults to the current challenge league)
    #[arg(long, value_name = "LEAGUE")]
    pub league: Option<String>,

    /// Realm to query: pc, xbox or sony
    #[arg(long, value_name = "REALM")]
    pub realm: Option<String>,

    /// Open directly in the item overview, optionally with a category
    ///
    /// Examples:
    ///   poemarket --items            # Open the item overview
    ///   poemarket --items maps       # Open with the map category selected
    ///   poemarket --items weapons    # Open with unique weapons selected
    #[arg(long, value_name = "CATEGORY")]
    pub items: Option<Option<String>>,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone, Default)]
pub struct StartupConfig {
    /// League requested on the command line, if any
    pub league: Option<String>,
    /// Realm to query
    pub realm: Realm,
    /// Whether to start directly in the item overview
    pub start_in_items: bool,
    /// Initial item category to select (if specified)
    pub initial_item_type: Option<ItemType>,
}

/// Parses a realm string argument into a Realm enum.
pub fn parse_realm_arg(s: &str) -> Result<Realm, CliError> {
    Realm::from_str(s).ok_or_else(|| CliError::InvalidRealm(s.to_string()))
}

/// Parses an item category string argument into an ItemType enum.
pub fn parse_category_arg(s: &str) -> Result<ItemType, CliError> {
    ItemType::from_arg(s).ok_or_else(|| CliError::InvalidCategory(s.to_string()))
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let realm = match &cli.realm {
            Some(raw) => parse_realm_arg(raw)?,
            None => Realm::Pc,
        };

        let (start_in_items, initial_item_type) = match &cli.items {
            None => (false, None),
            Some(None) => (true, None),
            Some(Some(raw)) => (true, Some(parse_category_arg(raw)?)),
        };

        Ok(StartupConfig {
            league: cli.league.clone(),
            realm,
            start_in_items,
            initial_item_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_realm_arg_valid() {
        assert_eq!(parse_realm_arg("pc").unwrap(), Realm::Pc);
        assert_eq!(parse_realm_arg("XBOX").unwrap(), Realm::Xbox);
        assert_eq!(parse_realm_arg("sony").unwrap(), Realm::Sony);
    }

    #[test]
    fn test_parse_realm_arg_invalid() {
        let err = parse_realm_arg("switch").unwrap_err();
        assert!(err.to_string().contains("Invalid realm"));
        assert!(err.to_string().contains("switch"));
    }

    #[test]
    fn test_parse_category_arg_aliases() {
        assert_eq!(parse_category_arg("weapons").unwrap(), ItemType::UniqueWeapon);
        assert_eq!(parse_category_arg("maps").unwrap(), ItemType::Map);
        assert_eq!(parse_category_arg("cards").unwrap(), ItemType::DivinationCard);
    }

    #[test]
    fn test_parse_category_arg_invalid() {
        let err = parse_category_arg("boots").unwrap_err();
        assert!(err.to_string().contains("Invalid item category"));
    }

    #[test]
    fn test_startup_config_default() {
        let config = StartupConfig::default();
        assert!(config.league.is_none());
        assert_eq!(config.realm, Realm::Pc);
        assert!(!config.start_in_items);
        assert!(config.initial_item_type.is_none());
    }

    #[test]
    fn test_cli_parse_no_args() {
        let cli = Cli::parse_from(["poemarket"]);
        assert!(cli.league.is_none());
        assert!(cli.realm.is_none());
        assert!(cli.items.is_none());
    }

    #[test]
    fn test_cli_parse_items_only() {
        let cli = Cli::parse_from(["poemarket", "--items"]);
        assert!(cli.items.is_some());
        assert!(cli.items.as_ref().unwrap().is_none());
    }

    #[test]
    fn test_cli_parse_items_with_category() {
        let cli = Cli::parse_from(["poemarket", "--items", "maps"]);
        assert_eq!(cli.items.as_ref().unwrap().as_deref(), Some("maps"));
    }

    #[test]
    fn test_startup_config_from_cli_items_with_category() {
        let cli = Cli::parse_from(["poemarket", "--items", "weapons"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert!(config.start_in_items);
        assert_eq!(config.initial_item_type, Some(ItemType::UniqueWeapon));
    }

    #[test]
    fn test_startup_config_from_cli_invalid_category() {
        let cli = Cli::parse_from(["poemarket", "--items", "boots"]);
        assert!(StartupConfig::from_cli(&cli).is_err());
    }

    #[test]
    fn test_startup_config_from_cli_league_and_realm() {
        let cli = Cli::parse_from(["poemarket", "--league", "Mercenaries", "--realm", "xbox"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(config.league.as_deref(), Some("Mercenaries"));
        assert_eq!(config.realm, Realm::Xbox);
    }
}
