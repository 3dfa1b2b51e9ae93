use serde::Serialize;

use crate::model::{
    election::Election,
    grid::{ElectionsGrid, GridView},
    sidebar::{Sidebar, SidebarView, Viewport},
};

/// Path of the elections page inside the dashboard shell.
pub const ELECTIONS_PATH: &str = "/dashboard/elections";

/// One administrator's view of the dashboard.
#[derive(Debug, Clone)]
pub struct DashboardSession {
    pub sidebar: Sidebar,
    pub grid: ElectionsGrid,
}

impl DashboardSession {
    pub fn new(sidebar: Sidebar, elections: Vec<Election>) -> Self {
        Self {
            sidebar,
            grid: ElectionsGrid::new(elections),
        }
    }

    pub fn screen(&mut self, viewport: Viewport) -> DashboardScreen {
        DashboardScreen {
            path: ELECTIONS_PATH,
            sidebar: self.sidebar.view(viewport, ELECTIONS_PATH),
            grid: self.grid.view(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardScreen {
    pub path: &'static str,
    pub sidebar: SidebarView,
    pub grid: GridView,
}
