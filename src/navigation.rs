// Back-button context for dashboard sub-pages.
// Main pages become the remembered baseline; create, edit and detail pages
// read it back. State lives in a SessionStore so no browser is needed.

use std::cell::RefCell;
use std::collections::HashMap;

pub const PREVIOUS_PATH_KEY: &str = "previousPath";
pub const SOURCE_PAGE_KEY: &str = "sourcePage";
pub const FALLBACK_PATH: &str = "/dashboard/transactions";

const TRANSACTIONS_PREFIX: [&str; 2] = ["dashboard", "transactions"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainSection {
    Dashboard,
    Transactions,
    Receipts,
    Analytics,
    Assistant,
    Profile,
    Admin,
}

impl MainSection {
    pub const ALL: [MainSection; 7] = [
        MainSection::Dashboard,
        MainSection::Transactions,
        MainSection::Receipts,
        MainSection::Analytics,
        MainSection::Assistant,
        MainSection::Profile,
        MainSection::Admin,
    ];

    pub fn path(self) -> &'static str {
        match self {
            MainSection::Dashboard => "/dashboard",
            MainSection::Transactions => "/dashboard/transactions",
            MainSection::Receipts => "/dashboard/receipts",
            MainSection::Analytics => "/dashboard/analytics",
            MainSection::Assistant => "/dashboard/chat",
            MainSection::Profile => "/dashboard/profile",
            MainSection::Admin => "/dashboard/admin",
        }
    }

    pub fn back_label(self) -> &'static str {
        match self {
            MainSection::Dashboard => "Back to Dashboard",
            MainSection::Transactions => "Back to Transactions",
            MainSection::Receipts => "Back to Receipts",
            MainSection::Analytics => "Back to Analytics",
            MainSection::Assistant => "Back to Assistant",
            MainSection::Profile => "Back to Profile",
            MainSection::Admin => "Back to Admin",
        }
    }

    fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|section| section.path() == path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Main(MainSection),
    Create,
    Edit,
    TransactionDetail,
    Other,
}

// Drops query/fragment and trailing slashes
fn normalize(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let trimmed = path[..end].trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

pub fn classify(path: &str) -> RouteKind {
    let path = normalize(path);
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if segments.contains(&"edit") {
        return RouteKind::Edit;
    }
    if segments.contains(&"new") {
        return RouteKind::Create;
    }
    if let Some(section) = MainSection::from_path(path) {
        return RouteKind::Main(section);
    }
    if segments.len() == 3 && segments[..2] == TRANSACTIONS_PREFIX {
        return RouteKind::TransactionDetail;
    }
    RouteKind::Other
}

// Per-tab string storage, owned by one page at a time
pub trait SessionStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

#[derive(Debug, Default)]
pub struct MemorySession {
    values: RefCell<HashMap<String, String>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySession {
    fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values.borrow_mut().remove(key);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationState {
    pub previous_path: Option<String>,
    pub source_page: Option<String>,
}

impl NavigationState {
    pub fn can_go_back(&self) -> bool {
        self.previous_path.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackTarget {
    Path(String),
    BrowserHistory,
}

pub struct NavigationTracker<S: SessionStore> {
    session: S,
    state: NavigationState,
}

impl<S: SessionStore> NavigationTracker<S> {
    pub fn new(session: S) -> Self {
        Self {
            session,
            state: NavigationState::default(),
        }
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn on_route_change(&mut self, path: &str) -> RouteKind {
        let kind = classify(path);
        match kind {
            RouteKind::Create | RouteKind::Edit | RouteKind::TransactionDetail => {
                let source = self.session.get(SOURCE_PAGE_KEY);
                let previous = source
                    .clone()
                    .or_else(|| self.session.get(PREVIOUS_PATH_KEY))
                    .unwrap_or_else(|| FALLBACK_PATH.to_string());
                self.state = NavigationState {
                    previous_path: Some(previous),
                    source_page: source,
                };
            }
            RouteKind::Main(section) => self.remember(section),
            RouteKind::Other => {}
        }
        kind
    }

    /// Browser back/forward landed on `path`.
    pub fn on_popstate(&mut self, path: &str) {
        if let RouteKind::Main(section) = classify(path) {
            self.remember(section);
        }
    }

    pub fn set_navigation_source(&mut self, path: &str) {
        self.session.set(SOURCE_PAGE_KEY, path);
        self.state.source_page = Some(path.to_string());
        self.state.previous_path = Some(path.to_string());
    }

    pub fn go_back(&self) -> BackTarget {
        match &self.state.previous_path {
            Some(path) => BackTarget::Path(path.clone()),
            None => BackTarget::BrowserHistory,
        }
    }

    pub fn back_button_text(&self) -> &'static str {
        self.state
            .previous_path
            .as_deref()
            .and_then(|path| MainSection::from_path(normalize(path)))
            .map_or("Back", MainSection::back_label)
    }

    pub fn can_go_back(&self) -> bool {
        self.state.can_go_back()
    }

    fn remember(&mut self, section: MainSection) {
        self.session.set(PREVIOUS_PATH_KEY, section.path());
        self.session.remove(SOURCE_PAGE_KEY);
        self.state = NavigationState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> NavigationTracker<MemorySession> {
        NavigationTracker::new(MemorySession::new())
    }

    #[test]
    fn classifies_routes() {
        assert_eq!(
            classify("/dashboard/transactions"),
            RouteKind::Main(MainSection::Transactions)
        );
        assert_eq!(classify("/dashboard/"), RouteKind::Main(MainSection::Dashboard));
        assert_eq!(classify("/dashboard/transactions/new"), RouteKind::Create);
        assert_eq!(classify("/dashboard/transactions/rent-march/edit"), RouteKind::Edit);
        assert_eq!(classify("/dashboard/receipts/new?from=camera"), RouteKind::Create);
        assert_eq!(
            classify("/dashboard/transactions/rent-march"),
            RouteKind::TransactionDetail
        );
        assert_eq!(classify("/dashboard/newsletter"), RouteKind::Other);
        assert_eq!(classify("/login"), RouteKind::Other);
        assert_eq!(classify("/dashboard/receipts/abc"), RouteKind::Other);
    }

    #[test]
    fn detail_page_goes_back_to_list() {
        let mut nav = tracker();
        nav.on_route_change("/dashboard/transactions");
        assert!(!nav.can_go_back());

        nav.on_route_change("/dashboard/transactions/some-slug");
        assert!(nav.can_go_back());
        assert_eq!(nav.back_button_text(), "Back to Transactions");
        assert_eq!(
            nav.go_back(),
            BackTarget::Path("/dashboard/transactions".to_string())
        );
    }

    #[test]
    fn edit_without_history_falls_back_to_transactions() {
        let mut nav = tracker();
        nav.on_route_change("/dashboard/transactions/some-slug/edit");
        assert_eq!(
            nav.go_back(),
            BackTarget::Path(FALLBACK_PATH.to_string())
        );
        assert_eq!(nav.back_button_text(), "Back to Transactions");
    }

    #[test]
    fn create_page_returns_to_dashboard_home() {
        let mut nav = tracker();
        nav.on_route_change("/dashboard");
        nav.on_route_change("/settings");
        nav.on_route_change("/dashboard/transactions/new");
        assert_eq!(nav.back_button_text(), "Back to Dashboard");
        assert_eq!(nav.go_back(), BackTarget::Path("/dashboard".to_string()));
    }

    #[test]
    fn explicit_source_wins_until_next_main_page() {
        let mut nav = tracker();
        nav.on_route_change("/dashboard/transactions");
        nav.set_navigation_source("/dashboard/analytics");
        nav.on_route_change("/dashboard/transactions/coffee/edit");
        assert_eq!(nav.back_button_text(), "Back to Analytics");

        nav.on_route_change("/dashboard/receipts");
        assert_eq!(nav.session().get(SOURCE_PAGE_KEY), None);
        nav.on_route_change("/dashboard/receipts/new");
        assert_eq!(nav.back_button_text(), "Back to Receipts");
    }

    #[test]
    fn popstate_keeps_baseline_in_sync() {
        let mut nav = tracker();
        nav.on_route_change("/dashboard/transactions");
        nav.on_popstate("/dashboard/chat");
        assert_eq!(
            nav.session().get(PREVIOUS_PATH_KEY).as_deref(),
            Some("/dashboard/chat")
        );

        nav.on_popstate("/dashboard/transactions/x/edit");
        assert_eq!(
            nav.session().get(PREVIOUS_PATH_KEY).as_deref(),
            Some("/dashboard/chat")
        );
    }

    #[test]
    fn unknown_source_gets_generic_label() {
        let mut nav = tracker();
        assert_eq!(nav.go_back(), BackTarget::BrowserHistory);
        assert_eq!(nav.back_button_text(), "Back");

        nav.set_navigation_source("/reports/2024");
        assert_eq!(nav.back_button_text(), "Back");
        assert_eq!(nav.go_back(), BackTarget::Path("/reports/2024".to_string()));
    }

    #[test]
    fn memory_session_stores_plain_strings() {
        let session = MemorySession::new();
        session.set(PREVIOUS_PATH_KEY, "/dashboard");
        session.set(PREVIOUS_PATH_KEY, "/dashboard/receipts");
        assert_eq!(session.get(PREVIOUS_PATH_KEY).as_deref(), Some("/dashboard/receipts"));
        session.remove(PREVIOUS_PATH_KEY);
        assert_eq!(session.get(PREVIOUS_PATH_KEY), None);
    }

    #[test]
    fn other_routes_leave_state_alone() {
        let mut nav = tracker();
        nav.on_route_change("/dashboard/transactions/a");
        let before = nav.state().clone();
        nav.on_route_change("/privacy");
        assert_eq!(nav.state(), &before);
    }
}
