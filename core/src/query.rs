//! Immutable query values.
//!
//! # Design
//! A `Query<R>` describes one search against resource `R`: filters, sort
//! directives and paging. Every builder method borrows the query and returns
//! a new one, so a query can be kept as a base and specialised many times:
//!
//! ```
//! use ifpa_core::Query;
//!
//! let base = Query::players().country("US");
//! let wa = base.state("WA").limit(25);
//! let or = base.state("OR").limit(25);
//! assert_eq!(base.params().len(), 1);
//! assert_ne!(wa.params(), or.params());
//! ```
//!
//! Filters are keyed by the closed `Param` set and stored in a sorted map,
//! so the order in which they were applied never reaches the wire. Filter
//! methods only exist on resources whose endpoint accepts them; the
//! capability traits (`Searchable`, `HasCountry`, `HasLocation`) gate them.
//!
//! Queries never perform I/O. Terminal operations live on `IfpaClient`.
//!
//! Upstream caveat: `stateprov` matching is a substring match on the server
//! and may return rows from other states. Nothing here can detect that.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use crate::types::{
    Director, DirectorSearchPage, Player, PlayerSearchPage, PlayerSummary, PvpRecord,
    RankingEntry, RankingPage, Tournament, TournamentResults, TournamentSearchPage,
};

/// Every parameter the API understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Param {
    Name,
    City,
    StateProv,
    Country,
    Tournament,
    TournamentPosition,
    StartDate,
    EndDate,
    TournamentType,
    Sort,
    StartPos,
    Count,
    PlayerId,
    OpponentId,
    TournamentId,
}

impl Param {
    pub const fn wire_name(self) -> &'static str {
        match self {
            Param::Name => "name",
            Param::City => "city",
            Param::StateProv => "stateprov",
            Param::Country => "country",
            Param::Tournament => "tournament",
            Param::TournamentPosition => "tourpos",
            Param::StartDate => "start_date",
            Param::EndDate => "end_date",
            Param::TournamentType => "tournament_type",
            Param::Sort => "sort",
            Param::StartPos => "start_pos",
            Param::Count => "count",
            Param::PlayerId => "player_id",
            Param::OpponentId => "opponent_id",
            Param::TournamentId => "tournament_id",
        }
    }

    /// Path parameters are validated but never sent as query parameters.
    pub const fn is_path(self) -> bool {
        matches!(self, Param::PlayerId | Param::OpponentId | Param::TournamentId)
    }
}

/// Resolved parameters keyed by `Param`, in wire order.
pub type Params = BTreeMap<Param, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Int(i64),
}

impl FilterValue {
    pub fn to_wire(&self) -> String {
        match self {
            FilterValue::Text(text) => text.clone(),
            FilterValue::Int(n) => n.to_string(),
        }
    }
}

/// A searchable endpoint and the shape of its result pages.
pub trait Resource: Copy + fmt::Debug + Eq + Send + Sync + 'static {
    /// Operation name used for validation rules and logging.
    const OPERATION: &'static str;

    /// Whether the endpoint honours `start_pos`/`count`.
    const HONORS_PAGING: bool;

    type Page: DeserializeOwned + Send;
    type Item: Send;

    fn items(page: Self::Page) -> Vec<Self::Item>;
}

/// Resources with a free-text `name` filter.
pub trait Searchable: Resource {}

/// Resources filterable by country.
pub trait HasCountry: Resource {}

/// Resources filterable by city and state/province.
pub trait HasLocation: HasCountry {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Players;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tournaments;

/// Director search. The endpoint ignores paging and always returns the full
/// result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directors;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rankings;

impl Resource for Players {
    const OPERATION: &'static str = "player.search";
    const HONORS_PAGING: bool = true;
    type Page = PlayerSearchPage;
    type Item = PlayerSummary;

    fn items(page: Self::Page) -> Vec<Self::Item> {
        page.search
    }
}

impl Resource for Tournaments {
    const OPERATION: &'static str = "tournament.search";
    const HONORS_PAGING: bool = true;
    type Page = TournamentSearchPage;
    type Item = Tournament;

    fn items(page: Self::Page) -> Vec<Self::Item> {
        page.tournaments
    }
}

impl Resource for Directors {
    const OPERATION: &'static str = "director.search";
    const HONORS_PAGING: bool = false;
    type Page = DirectorSearchPage;
    type Item = Director;

    fn items(page: Self::Page) -> Vec<Self::Item> {
        page.directors
    }
}

impl Resource for Rankings {
    const OPERATION: &'static str = "rankings";
    const HONORS_PAGING: bool = true;
    type Page = RankingPage;
    type Item = RankingEntry;

    fn items(page: Self::Page) -> Vec<Self::Item> {
        page.rankings
    }
}

impl Searchable for Players {}
impl Searchable for Tournaments {}
impl Searchable for Directors {}

impl HasCountry for Players {}
impl HasCountry for Tournaments {}
impl HasCountry for Directors {}
impl HasCountry for Rankings {}

impl HasLocation for Players {}
impl HasLocation for Tournaments {}
impl HasLocation for Directors {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingSystem {
    Wppr,
    Women,
    Youth,
    Pro,
}

impl RankingSystem {
    pub const fn path(self) -> &'static str {
        match self {
            RankingSystem::Wppr => "/rankings/wppr",
            RankingSystem::Women => "/rankings/women",
            RankingSystem::Youth => "/rankings/youth",
            RankingSystem::Pro => "/rankings/pro",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TournamentSort {
    StartDate,
    Name,
    PlayerCount,
}

impl TournamentSort {
    const fn wire_name(self) -> &'static str {
        match self {
            TournamentSort::StartDate => "event_start_date",
            TournamentSort::Name => "tournament_name",
            TournamentSort::PlayerCount => "player_count",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortDirective {
    pub key: &'static str,
    pub order: SortOrder,
}

/// An immutable search description for resource `R`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query<R> {
    path: &'static str,
    filters: BTreeMap<Param, FilterValue>,
    sort: Vec<SortDirective>,
    offset: Option<u32>,
    limit: Option<u32>,
    resource: PhantomData<fn() -> R>,
}

impl Query<Players> {
    pub fn players() -> Self {
        Self::new("/player/search")
    }
}

impl Query<Tournaments> {
    pub fn tournaments() -> Self {
        Self::new("/tournament/search")
    }
}

impl Query<Directors> {
    pub fn directors() -> Self {
        Self::new("/director/search")
    }
}

impl Query<Rankings> {
    pub fn rankings(system: RankingSystem) -> Self {
        Self::new(system.path())
    }
}

impl<R: Resource> Query<R> {
    fn new(path: &'static str) -> Self {
        Self {
            path,
            filters: BTreeMap::new(),
            sort: Vec::new(),
            offset: None,
            limit: None,
            resource: PhantomData,
        }
    }

    fn with_filter(&self, param: Param, value: FilterValue) -> Self {
        let mut next = self.clone();
        next.filters.insert(param, value);
        next
    }

    /// Start returning results at `offset` (zero-based).
    #[must_use]
    pub fn offset(&self, offset: u32) -> Self {
        let mut next = self.clone();
        next.offset = Some(offset);
        next
    }

    /// Request at most `limit` results.
    #[must_use]
    pub fn limit(&self, limit: u32) -> Self {
        let mut next = self.clone();
        next.limit = Some(limit);
        next
    }

    pub(crate) fn page(&self, offset: u32, limit: u32) -> Self {
        let mut next = self.clone();
        next.offset = Some(offset);
        next.limit = Some(limit);
        next
    }

    pub fn operation(&self) -> &'static str {
        R::OPERATION
    }

    pub fn path(&self) -> &'static str {
        self.path
    }

    pub fn filter(&self, param: Param) -> Option<&FilterValue> {
        self.filters.get(&param)
    }

    pub fn page_offset(&self) -> Option<u32> {
        self.offset
    }

    pub fn page_limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn sort_directives(&self) -> &[SortDirective] {
        &self.sort
    }

    /// Serialize into wire parameters. Deterministic for equal queries.
    pub fn params(&self) -> Params {
        let mut params: Params = self
            .filters
            .iter()
            .map(|(param, value)| (*param, value.to_wire()))
            .collect();
        if !self.sort.is_empty() {
            let sort: Vec<String> = self
                .sort
                .iter()
                .map(|d| match d.order {
                    SortOrder::Asc => d.key.to_string(),
                    SortOrder::Desc => format!("-{}", d.key),
                })
                .collect();
            params.insert(Param::Sort, sort.join(","));
        }
        if let Some(offset) = self.offset {
            params.insert(Param::StartPos, offset.to_string());
        }
        if let Some(limit) = self.limit {
            params.insert(Param::Count, limit.to_string());
        }
        params
    }
}

impl<R: Searchable> Query<R> {
    /// Free-text match on the resource name.
    #[must_use]
    pub fn name(&self, term: impl Into<String>) -> Self {
        self.with_filter(Param::Name, FilterValue::Text(term.into()))
    }
}

impl<R: HasCountry> Query<R> {
    /// Two-letter country code.
    #[must_use]
    pub fn country(&self, code: impl Into<String>) -> Self {
        self.with_filter(Param::Country, FilterValue::Text(code.into()))
    }
}

impl<R: HasLocation> Query<R> {
    #[must_use]
    pub fn city(&self, city: impl Into<String>) -> Self {
        self.with_filter(Param::City, FilterValue::Text(city.into()))
    }

    /// State or province abbreviation. The server substring-matches this
    /// value, so results may include other regions.
    #[must_use]
    pub fn state(&self, code: impl Into<String>) -> Self {
        self.with_filter(Param::StateProv, FilterValue::Text(code.into()))
    }
}

impl Query<Players> {
    /// Players who took part in a tournament matching `name`.
    #[must_use]
    pub fn tournament(&self, name: impl Into<String>) -> Self {
        self.with_filter(Param::Tournament, FilterValue::Text(name.into()))
    }

    /// Finishing position within the `tournament` filter. Requires it.
    #[must_use]
    pub fn tournament_position(&self, position: u32) -> Self {
        self.with_filter(Param::TournamentPosition, FilterValue::Int(position.into()))
    }
}

impl Query<Tournaments> {
    /// Earliest event date, `YYYY-MM-DD`. Must be paired with `end_date`.
    #[must_use]
    pub fn start_date(&self, date: impl Into<String>) -> Self {
        self.with_filter(Param::StartDate, FilterValue::Text(date.into()))
    }

    /// Latest event date, `YYYY-MM-DD`. Must be paired with `start_date`.
    #[must_use]
    pub fn end_date(&self, date: impl Into<String>) -> Self {
        self.with_filter(Param::EndDate, FilterValue::Text(date.into()))
    }

    #[must_use]
    pub fn date_range(&self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_date(start).end_date(end)
    }

    #[must_use]
    pub fn tournament_type(&self, kind: impl Into<String>) -> Self {
        self.with_filter(Param::TournamentType, FilterValue::Text(kind.into()))
    }

    /// Append a sort directive. Re-sorting on a key moves it to the end.
    #[must_use]
    pub fn sort_by(&self, key: TournamentSort, order: SortOrder) -> Self {
        let mut next = self.clone();
        let key = key.wire_name();
        next.sort.retain(|d| d.key != key);
        next.sort.push(SortDirective { key, order });
        next
    }
}

/// An immutable single-resource request.
pub struct Lookup<T> {
    operation: &'static str,
    path: String,
    params: Params,
    shape: PhantomData<fn() -> T>,
}

impl<T> Clone for Lookup<T> {
    fn clone(&self) -> Self {
        Self {
            operation: self.operation,
            path: self.path.clone(),
            params: self.params.clone(),
            shape: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Lookup<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lookup")
            .field("operation", &self.operation)
            .field("path", &self.path)
            .field("params", &self.params)
            .finish()
    }
}

impl<T> PartialEq for Lookup<T> {
    fn eq(&self, other: &Self) -> bool {
        self.operation == other.operation && self.path == other.path && self.params == other.params
    }
}

impl<T: DeserializeOwned> Lookup<T> {
    fn new(operation: &'static str, path: String, params: Params) -> Self {
        Self {
            operation,
            path,
            params,
            shape: PhantomData,
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path parameters, exposed for validation.
    pub fn params(&self) -> &Params {
        &self.params
    }
}

impl Lookup<Player> {
    pub fn player(player_id: u64) -> Self {
        Self::new(
            "player.get",
            format!("/player/{player_id}"),
            Params::from([(Param::PlayerId, player_id.to_string())]),
        )
    }
}

impl Lookup<PvpRecord> {
    pub fn player_vs_player(player_id: u64, opponent_id: u64) -> Self {
        Self::new(
            "player.pvp",
            format!("/player/{player_id}/pvp/{opponent_id}"),
            Params::from([
                (Param::PlayerId, player_id.to_string()),
                (Param::OpponentId, opponent_id.to_string()),
            ]),
        )
    }
}

impl Lookup<Tournament> {
    pub fn tournament(tournament_id: u64) -> Self {
        Self::new(
            "tournament.get",
            format!("/tournament/{tournament_id}"),
            Params::from([(Param::TournamentId, tournament_id.to_string())]),
        )
    }
}

impl Lookup<TournamentResults> {
    pub fn tournament_results(tournament_id: u64) -> Self {
        Self::new(
            "tournament.results",
            format!("/tournament/{tournament_id}/results"),
            Params::from([(Param::TournamentId, tournament_id.to_string())]),
        )
    }
}
