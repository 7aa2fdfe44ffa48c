//! Application state management for poemarket
//!
//! This module contains the main application state, handling keyboard
//! input, data loading and transitions between the currency, item and
//! character views. It is also the composition root: the response caches
//! are constructed here and injected into each client.

use chrono::{DateTime, Local, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use std::collections::HashMap;

use poemarket::cache::SharedCache;
use poemarket::cli::StartupConfig;
use poemarket::config::Config;
use poemarket::data::account::{CHARACTERS_CACHE_TTL_SECS, ITEMS_CACHE_TTL_SECS};
use poemarket::data::leagues::LEAGUES_CACHE_TTL_SECS;
use poemarket::data::ninja::OVERVIEW_CACHE_TTL_SECS;
use poemarket::data::{
    AccountClient, Character, CurrencyKind, CurrencyOverview, ItemLine, ItemType, League,
    LeaguesClient, NinjaClient, Realm, TokenStore, TradeClient, TradeQuery,
};

/// Item categories reachable with the category-cycling keys, in order
const CATEGORY_CYCLE: [ItemType; 9] = [
    ItemType::UniqueWeapon,
    ItemType::UniqueArmour,
    ItemType::UniqueAccessory,
    ItemType::UniqueFlask,
    ItemType::UniqueJewel,
    ItemType::Map,
    ItemType::DivinationCard,
    ItemType::SkillGem,
    ItemType::Essence,
];

/// Application state enum representing the current view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppState {
    /// Initial loading state while fetching data
    Loading,
    /// Currency price table
    Currency,
    /// Item price table for the selected category
    Items,
    /// Character list for the logged-in account
    Characters,
}

/// Asynchronous work requested by a key press, run by the main loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    /// Reload leagues and all price data
    ReloadAll,
    /// Reload price data for the current league
    ReloadPrices,
    /// Reload the league list only
    ReloadLeagues,
    /// Load the character list
    LoadCharacters,
    /// Run a trade price check for the selected row
    TradeCheck,
}

/// Main application struct managing state and data
pub struct App {
    /// Current application state/view
    pub state: AppState,
    /// Realm being queried
    pub realm: Realm,
    /// Known leagues, sorted for the picker
    pub leagues: Vec<League>,
    /// Index of the selected league
    pub league_index: usize,
    /// Whether the currency view shows currency or fragments
    pub currency_kind: CurrencyKind,
    /// Latest currency overview for the selected league
    pub currency: Option<CurrencyOverview>,
    /// Item lines per category for the selected league
    pub items: HashMap<ItemType, Vec<ItemLine>>,
    /// Selected item category
    pub item_type: ItemType,
    /// Characters on the logged-in account
    pub characters: Vec<Character>,
    /// Selected row in the current table
    pub selected_row: usize,
    /// Flag indicating the application should quit
    pub should_quit: bool,
    /// Flag to show the help overlay
    pub show_help: bool,
    /// One-line status/error message shown in the footer
    pub status: Option<String>,
    /// Timestamp of the last completed data load
    pub last_refresh: Option<DateTime<Local>>,
    /// League requested on the command line, applied on first load
    requested_league: Option<String>,
    /// Transition to the item view once the first load completes
    pending_items_view: bool,
    /// Async work queued for the main loop
    pending: Option<PendingAction>,
    /// Price aggregation client
    ninja: NinjaClient,
    /// League list client
    leagues_client: LeaguesClient,
    /// Account/characters client
    account: AccountClient,
    /// Trade search client
    trade: TradeClient,
    /// Persisted OAuth token store
    token_store: Option<TokenStore>,
}

impl App {
    /// Creates a new App. All response caches are built here with their
    /// per-endpoint TTLs and handed to the clients that use them.
    pub fn new(config: Config, startup: StartupConfig) -> Self {
        let overview_ttl = chrono::Duration::seconds(OVERVIEW_CACHE_TTL_SECS);
        let currency_cache: SharedCache<CurrencyOverview> = SharedCache::new(overview_ttl);
        let item_cache: SharedCache<Vec<ItemLine>> = SharedCache::new(overview_ttl);
        let leagues_cache: SharedCache<Vec<League>> =
            SharedCache::new(chrono::Duration::seconds(LEAGUES_CACHE_TTL_SECS));
        let characters_cache: SharedCache<Vec<Character>> =
            SharedCache::new(chrono::Duration::seconds(CHARACTERS_CACHE_TTL_SECS));
        let character_items_cache =
            SharedCache::new(chrono::Duration::seconds(ITEMS_CACHE_TTL_SECS));

        Self {
            state: AppState::Loading,
            realm: startup.realm,
            leagues: Vec::new(),
            league_index: 0,
            currency_kind: CurrencyKind::Currency,
            currency: None,
            items: HashMap::new(),
            item_type: startup.initial_item_type.unwrap_or(ItemType::UniqueWeapon),
            characters: Vec::new(),
            selected_row: 0,
            should_quit: false,
            show_help: false,
            status: None,
            last_refresh: None,
            requested_league: startup.league,
            pending_items_view: startup.start_in_items,
            pending: None,
            ninja: NinjaClient::new(currency_cache, item_cache),
            leagues_client: LeaguesClient::new(leagues_cache),
            account: AccountClient::new(characters_cache, character_items_cache),
            trade: TradeClient::new(&config),
            token_store: TokenStore::new(),
        }
    }

    /// The id of the currently selected league, or Standard before the
    /// league list has loaded.
    pub fn league_id(&self) -> &str {
        self.leagues
            .get(self.league_index)
            .map(|l| l.id.as_str())
            .unwrap_or("Standard")
    }

    /// Item lines for the selected category, if loaded.
    pub fn current_items(&self) -> Option<&Vec<ItemLine>> {
        self.items.get(&self.item_type)
    }

    /// Takes the queued async action, if any.
    pub fn take_pending(&mut self) -> Option<PendingAction> {
        self.pending.take()
    }

    /// Loads leagues and initial price data. Called once at startup and on
    /// a full reload.
    pub async fn load_all_data(&mut self) {
        self.status = None;
        match self.leagues_client.leagues(self.realm).await {
            Ok(leagues) => {
                self.leagues = leagues;
                self.apply_requested_league();
            }
            Err(e) => {
                self.status = Some(format!("League list unavailable: {e}"));
            }
        }

        self.load_prices().await;

        if self.pending_items_view {
            self.state = AppState::Items;
            self.pending_items_view = false;
        } else if self.state == AppState::Loading {
            self.state = AppState::Currency;
        }
    }

    /// Picks the league asked for on the command line, once, falling back
    /// to the first current challenge league.
    fn apply_requested_league(&mut self) {
        if let Some(requested) = self.requested_league.take() {
            match self
                .leagues
                .iter()
                .position(|l| l.id.eq_ignore_ascii_case(&requested))
            {
                Some(index) => self.league_index = index,
                None => {
                    self.status = Some(format!("Unknown league '{requested}'"));
                    self.league_index = self.default_league_index();
                }
            }
        } else {
            self.league_index = self.default_league_index();
        }
    }

    fn default_league_index(&self) -> usize {
        self.leagues
            .iter()
            .position(|l| l.current)
            .unwrap_or(0)
    }

    /// Fetches the currency overview and the selected item category
    /// concurrently for the selected league.
    pub async fn load_prices(&mut self) {
        let league = self.league_id().to_string();

        let (currency, items) = futures::join!(
            self.ninja
                .currency_overview(self.realm, &league, self.currency_kind),
            self.ninja.item_overview(self.realm, &league, self.item_type),
        );

        match currency {
            Ok(overview) => {
                self.currency = Some(overview);
            }
            Err(e) => {
                self.status = Some(format!("Currency data unavailable: {e}"));
            }
        }
        match items {
            Ok(lines) => {
                self.items.insert(self.item_type, lines);
            }
            Err(e) => {
                self.status = Some(format!("Item data unavailable: {e}"));
            }
        }

        self.clamp_selection();
        self.last_refresh = Some(Local::now());
    }

    /// Reloads the league list only (background cadence).
    pub async fn reload_leagues(&mut self) {
        if let Ok(leagues) = self.leagues_client.leagues(self.realm).await {
            let selected = self.league_id().to_string();
            self.leagues = leagues;
            if let Some(index) = self.leagues.iter().position(|l| l.id == selected) {
                self.league_index = index;
            } else {
                self.league_index = self.default_league_index();
            }
        }
    }

    /// Loads the character list for the persisted login.
    pub async fn load_characters(&mut self) {
        let Some(store) = &self.token_store else {
            self.status = Some("No config directory available for login".to_string());
            return;
        };
        let Some(token) = store.load() else {
            self.status =
                Some("Not logged in: complete the OAuth flow to view characters".to_string());
            return;
        };
        if token.is_expired(Utc::now()) {
            self.status = Some("Login expired: authorize again to view characters".to_string());
            return;
        }

        match self.account.characters(&token.access_token).await {
            Ok(characters) => {
                self.characters = characters;
                self.state = AppState::Characters;
                self.clamp_selection();
            }
            Err(e) => {
                self.status = Some(format!("Characters unavailable: {e}"));
            }
        }
    }

    /// Runs a trade price check for the selected row and reports the
    /// result in the status line.
    pub async fn run_trade_check(&mut self) {
        let Some(name) = self.selected_item_name() else {
            return;
        };
        let league = self.league_id().to_string();

        let query = TradeQuery::for_item(name.as_str());
        match self.trade.search(&league, &query).await {
            Ok(search) => {
                let mut message = format!("{name}: {} listings", search.total);
                if let (Some(id), false) = (search.id.as_deref(), search.result.is_empty()) {
                    if let Ok(listings) = self.trade.fetch_listings(id, &search.result).await {
                        if let Some(price) = listings.first().and_then(|l| l.price.as_ref()) {
                            message.push_str(&format!(
                                ", from {} {}",
                                price.amount, price.currency
                            ));
                        }
                    }
                }
                self.status = Some(message);
            }
            Err(e) => {
                self.status = Some(format!("Trade check failed: {e}"));
            }
        }
    }

    /// Name of the item or currency under the cursor.
    pub fn selected_item_name(&self) -> Option<String> {
        match self.state {
            AppState::Currency => self
                .currency
                .as_ref()?
                .lines
                .get(self.selected_row)
                .map(|l| l.currency_type_name.clone()),
            AppState::Items => self
                .current_items()?
                .get(self.selected_row)
                .map(|l| l.name.clone()),
            _ => None,
        }
    }

    /// Number of selectable rows in the current view.
    fn row_count(&self) -> usize {
        match self.state {
            AppState::Currency => self.currency.as_ref().map(|o| o.lines.len()).unwrap_or(0),
            AppState::Items => self.current_items().map(Vec::len).unwrap_or(0),
            AppState::Characters => self.characters.len(),
            AppState::Loading => 0,
        }
    }

    fn clamp_selection(&mut self) {
        let count = self.row_count();
        if count == 0 {
            self.selected_row = 0;
        } else if self.selected_row >= count {
            self.selected_row = count - 1;
        }
    }

    /// Handles a keyboard event, possibly queueing async work.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.show_help {
            match key.code {
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('h') => self.show_help = false,
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') | KeyCode::Char('h') => self.show_help = true,
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_row = self.selected_row.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected_row = self.selected_row.saturating_add(1);
                self.clamp_selection();
            }
            KeyCode::Tab => {
                self.state = match self.state {
                    AppState::Currency => AppState::Items,
                    AppState::Items => AppState::Currency,
                    ref other => other.clone(),
                };
                self.selected_row = 0;
            }
            KeyCode::Esc => {
                if self.state == AppState::Characters {
                    self.state = AppState::Currency;
                    self.selected_row = 0;
                }
            }
            KeyCode::Char('f') => {
                if self.state == AppState::Currency {
                    self.currency_kind = match self.currency_kind {
                        CurrencyKind::Currency => CurrencyKind::Fragment,
                        CurrencyKind::Fragment => CurrencyKind::Currency,
                    };
                    self.selected_row = 0;
                    self.pending = Some(PendingAction::ReloadPrices);
                }
            }
            KeyCode::Char('[') => {
                if !self.leagues.is_empty() {
                    self.league_index = if self.league_index == 0 {
                        self.leagues.len() - 1
                    } else {
                        self.league_index - 1
                    };
                    self.selected_row = 0;
                    self.pending = Some(PendingAction::ReloadPrices);
                }
            }
            KeyCode::Char(']') => {
                if !self.leagues.is_empty() {
                    self.league_index = (self.league_index + 1) % self.leagues.len();
                    self.selected_row = 0;
                    self.pending = Some(PendingAction::ReloadPrices);
                }
            }
            KeyCode::Char(',') | KeyCode::Char('<') => {
                if self.state == AppState::Items {
                    self.cycle_category(-1);
                }
            }
            KeyCode::Char('.') | KeyCode::Char('>') => {
                if self.state == AppState::Items {
                    self.cycle_category(1);
                }
            }
            KeyCode::Char('r') => {
                self.pending = Some(PendingAction::ReloadAll);
            }
            KeyCode::Char('c') => {
                self.pending = Some(PendingAction::LoadCharacters);
            }
            KeyCode::Char('t') => {
                if matches!(self.state, AppState::Currency | AppState::Items) {
                    self.pending = Some(PendingAction::TradeCheck);
                }
            }
            _ => {}
        }
    }

    fn cycle_category(&mut self, direction: isize) {
        let position = CATEGORY_CYCLE
            .iter()
            .position(|t| *t == self.item_type)
            .unwrap_or(0);
        let len = CATEGORY_CYCLE.len() as isize;
        let next = (position as isize + direction).rem_euclid(len) as usize;
        self.item_type = CATEGORY_CYCLE[next];
        self.selected_row = 0;
        if !self.items.contains_key(&self.item_type) {
            self.pending = Some(PendingAction::ReloadPrices);
        }
    }
}
