//! Integration tests for CLI argument parsing
//!
//! Verifies the full path from argv through clap into StartupConfig.

use clap::Parser;
use poemarket::cli::{Cli, StartupConfig};
use poemarket::data::{ItemType, Realm};

#[test]
fn test_no_args_gives_defaults() {
    let cli = Cli::parse_from(["poemarket"]);
    let config = StartupConfig::from_cli(&cli).expect("default args should parse");

    assert!(config.league.is_none());
    assert_eq!(config.realm, Realm::Pc);
    assert!(!config.start_in_items);
    assert!(config.initial_item_type.is_none());
}

#[test]
fn test_league_flag_is_carried_through() {
    let cli = Cli::parse_from(["poemarket", "--league", "Mercenaries"]);
    let config = StartupConfig::from_cli(&cli).expect("league arg should parse");
    assert_eq!(config.league.as_deref(), Some("Mercenaries"));
}

#[test]
fn test_league_with_spaces() {
    let cli = Cli::parse_from(["poemarket", "--league", "Hardcore Mercenaries"]);
    let config = StartupConfig::from_cli(&cli).expect("league arg should parse");
    assert_eq!(config.league.as_deref(), Some("Hardcore Mercenaries"));
}

#[test]
fn test_realm_flag() {
    let cli = Cli::parse_from(["poemarket", "--realm", "sony"]);
    let config = StartupConfig::from_cli(&cli).expect("realm arg should parse");
    assert_eq!(config.realm, Realm::Sony);
}

#[test]
fn test_invalid_realm_is_an_error() {
    let cli = Cli::parse_from(["poemarket", "--realm", "gameboy"]);
    let result = StartupConfig::from_cli(&cli);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("gameboy"));
}

#[test]
fn test_items_flag_without_category() {
    let cli = Cli::parse_from(["poemarket", "--items"]);
    let config = StartupConfig::from_cli(&cli).expect("items flag should parse");
    assert!(config.start_in_items);
    assert!(config.initial_item_type.is_none());
}

#[test]
fn test_items_flag_with_category() {
    let cli = Cli::parse_from(["poemarket", "--items", "cards"]);
    let config = StartupConfig::from_cli(&cli).expect("items arg should parse");
    assert!(config.start_in_items);
    assert_eq!(config.initial_item_type, Some(ItemType::DivinationCard));
}

#[test]
fn test_items_flag_with_wire_name() {
    let cli = Cli::parse_from(["poemarket", "--items", "UniqueArmour"]);
    let config = StartupConfig::from_cli(&cli).expect("items arg should parse");
    assert_eq!(config.initial_item_type, Some(ItemType::UniqueArmour));
}

#[test]
fn test_items_flag_with_invalid_category() {
    let cli = Cli::parse_from(["poemarket", "--items", "boots"]);
    let result = StartupConfig::from_cli(&cli);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("boots"));
}

#[test]
fn test_combined_flags() {
    let cli = Cli::parse_from([
        "poemarket",
        "--league",
        "Standard",
        "--realm",
        "xbox",
        "--items",
        "maps",
    ]);
    let config = StartupConfig::from_cli(&cli).expect("combined args should parse");

    assert_eq!(config.league.as_deref(), Some("Standard"));
    assert_eq!(config.realm, Realm::Xbox);
    assert!(config.start_in_items);
    assert_eq!(config.initial_item_type, Some(ItemType::Map));
}
