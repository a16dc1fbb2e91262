//! Role-gated navigation
//!
//! Selects which screen tree is reachable from the session state. Selection
//! is a pure function of (user present, is admin); `Navigator` re-evaluates
//! it on every published snapshot.

use league_backend::AuthUser;
use tokio::sync::watch;

use crate::session::SessionSnapshot;

/// Top-level screen tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenTree {
    /// Signed out
    Auth,
    /// Management screens for admins
    Admin,
    /// Tabbed league screens for players and followers
    Main,
}

/// Individual screens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Login,
    Register,
    ForgotPassword,
    TeamsManagement,
    PlayersManagement,
    MatchesManagement,
    UsersManagement,
    Home,
    Teams,
    Matches,
    Stats,
    Profile,
}

impl Screen {
    /// Tab or header title
    pub fn title(&self) -> &'static str {
        match self {
            Screen::Login => "Iniciar sesión",
            Screen::Register => "Registrarse",
            Screen::ForgotPassword => "Recuperar contraseña",
            Screen::TeamsManagement => "Gestión de equipos",
            Screen::PlayersManagement => "Gestión de jugadores",
            Screen::MatchesManagement => "Gestión de partidos",
            Screen::UsersManagement => "Gestión de usuarios",
            Screen::Home => "Inicio",
            Screen::Teams => "Equipos",
            Screen::Matches => "Partidos",
            Screen::Stats => "Estadísticas",
            Screen::Profile => "Perfil",
        }
    }
}

impl ScreenTree {
    /// Screens reachable in this tree, the first one shown initially
    pub fn screens(&self) -> &'static [Screen] {
        match self {
            ScreenTree::Auth => &[Screen::Login, Screen::Register, Screen::ForgotPassword],
            ScreenTree::Admin => &[
                Screen::TeamsManagement,
                Screen::PlayersManagement,
                Screen::MatchesManagement,
                Screen::UsersManagement,
            ],
            ScreenTree::Main => &[
                Screen::Home,
                Screen::Teams,
                Screen::Matches,
                Screen::Stats,
                Screen::Profile,
            ],
        }
    }

    pub fn initial_screen(&self) -> Screen {
        self.screens()[0]
    }

    pub fn contains(&self, screen: Screen) -> bool {
        self.screens().contains(&screen)
    }
}

impl std::fmt::Display for ScreenTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScreenTree::Auth => write!(f, "auth"),
            ScreenTree::Admin => write!(f, "admin"),
            ScreenTree::Main => write!(f, "main"),
        }
    }
}

pub fn select_tree(user: Option<&AuthUser>, is_admin: bool) -> ScreenTree {
    match (user, is_admin) {
        (None, _) => ScreenTree::Auth,
        (Some(_), true) => ScreenTree::Admin,
        (Some(_), false) => ScreenTree::Main,
    }
}

fn tree_for(snapshot: &SessionSnapshot) -> ScreenTree {
    select_tree(snapshot.user.as_ref(), snapshot.is_admin())
}

/// Follows the session state and reports screen tree changes
#[derive(Debug)]
pub struct Navigator {
    session: watch::Receiver<SessionSnapshot>,
    current: ScreenTree,
}

impl Navigator {
    pub fn new(mut session: watch::Receiver<SessionSnapshot>) -> Self {
        let current = tree_for(&session.borrow_and_update());
        Self { session, current }
    }

    pub fn current(&self) -> ScreenTree {
        self.current
    }

    /// Wait for the next tree change. `None` once the session manager is gone.
    pub async fn changed(&mut self) -> Option<ScreenTree> {
        loop {
            self.session.changed().await.ok()?;
            let next = tree_for(&self.session.borrow_and_update());
            if next != self.current {
                tracing::debug!(from = %self.current, to = %next, "Screen tree changed");
                self.current = next;
                return Some(next);
            }
        }
    }
}
