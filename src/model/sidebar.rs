use rocket::{
    http::{Cookie, CookieJar, SameSite},
    request::{self, FromRequest, Request},
    time::Duration,
};
use serde::Serialize;

pub const SIDEBAR_COOKIE: &str = "sidebar-collapsed";
const SIDEBAR_COOKIE_MAX_AGE_DAYS: i64 = 7;

/// Viewports narrower than this get the slide-over sheet instead of the rail.
const MOBILE_BREAKPOINT: u32 = 768;

pub struct NavItem {
    pub name: &'static str,
    pub href: &'static str,
}

pub const NAVIGATION: &[NavItem] = &[
    NavItem {
        name: "Dashboard",
        href: "/dashboard",
    },
    NavItem {
        name: "Elections",
        href: "/dashboard/elections",
    },
    NavItem {
        name: "Voters",
        href: "/dashboard/voters",
    },
    NavItem {
        name: "Results",
        href: "/dashboard/results",
    },
    NavItem {
        name: "Audit Logs",
        href: "/dashboard/audit",
    },
    NavItem {
        name: "Settings",
        href: "/dashboard/settings",
    },
];

/// The client's viewport, from the `Viewport-Width` client hint.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    width: Option<u32>,
}

impl Viewport {
    pub fn new(width: Option<u32>) -> Self {
        Self { width }
    }

    /// Without a hint the client is assumed to be a desktop.
    pub fn is_mobile(&self) -> bool {
        self.width.map_or(false, |width| width < MOBILE_BREAKPOINT)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Viewport {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let width = req
            .headers()
            .get_one("Viewport-Width")
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|width| width.is_finite() && *width >= 0.0)
            .map(|width| width as u32);
        request::Outcome::Success(Viewport::new(width))
    }
}

/// Dashboard sidebar state for one admin session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Sidebar {
    collapsed: bool,
    open_mobile: bool,
}

impl Sidebar {
    /// Restore the collapse preference from the request's cookies.
    pub fn from_cookies(cookies: &CookieJar<'_>) -> Self {
        let collapsed = cookies
            .get(SIDEBAR_COOKIE)
            .map_or(false, |cookie| cookie.value() == "true");
        Self {
            collapsed,
            open_mobile: false,
        }
    }

    /// On mobile this opens or closes the sheet; otherwise it collapses or
    /// expands the rail and returns the new preference to persist.
    pub fn toggle(&mut self, viewport: Viewport) -> Option<bool> {
        if viewport.is_mobile() {
            self.open_mobile = !self.open_mobile;
            None
        } else {
            self.collapsed = !self.collapsed;
            Some(self.collapsed)
        }
    }

    pub fn set_open_mobile(&mut self, open: bool) {
        self.open_mobile = open;
    }

    /// Whether the main layout should leave room for a collapsed rail.
    /// Always false on mobile, where the rail is not shown.
    pub fn layout_collapsed(&self, viewport: Viewport) -> bool {
        !viewport.is_mobile() && self.collapsed
    }

    pub fn view(&self, viewport: Viewport, path: &str) -> SidebarView {
        let mobile = viewport.is_mobile();
        let rail = self.layout_collapsed(viewport);
        SidebarView {
            collapsed: rail,
            is_mobile: mobile,
            open_mobile: mobile && self.open_mobile,
            show_logo: !rail,
            navigation: NAVIGATION
                .iter()
                .map(|item| NavItemView {
                    name: item.name,
                    href: item.href,
                    active: item.href == path,
                    tooltip: rail.then_some(item.name),
                })
                .collect(),
        }
    }
}

/// The cookie that remembers the collapse preference.
pub fn collapsed_cookie(collapsed: bool) -> Cookie<'static> {
    Cookie::build(SIDEBAR_COOKIE, collapsed.to_string())
        .path("/")
        .max_age(Duration::days(SIDEBAR_COOKIE_MAX_AGE_DAYS))
        .same_site(SameSite::Lax)
        .finish()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SidebarView {
    pub collapsed: bool,
    pub is_mobile: bool,
    pub open_mobile: bool,
    pub show_logo: bool,
    pub navigation: Vec<NavItemView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavItemView {
    pub name: &'static str,
    pub href: &'static str,
    pub active: bool,
    /// Names are only shown on hover when the rail is collapsed.
    pub tooltip: Option<&'static str>,
}
