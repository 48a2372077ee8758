use std::collections::VecDeque;

use buildsense_api::models::{Building, BuildingId, DebugLevel, DebugLogEntry};
use serde::Serialize;

/// Entries the debug console keeps; older ones are dropped first.
pub const DEBUG_LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppState {
    pub buildings: Vec<Building>,
    pub loading: bool,
    pub connected: bool,
    pub selected_building: Option<BuildingId>,
    pub debug_logs: VecDeque<DebugLogEntry>,
    pub show_debug: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            buildings: Vec::new(),
            loading: true,
            connected: false,
            selected_building: None,
            debug_logs: VecDeque::new(),
            show_debug: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetLoading(bool),
    SetConnected(bool),
    /// Replaces the list and ends loading
    SetBuildings(Vec<Building>),
    AddBuilding(Building),
    UpdateBuilding(Building),
    RemoveBuilding(BuildingId),
    SelectBuilding(Option<BuildingId>),
    AddDebugLog(DebugLogEntry),
    ClearDebugLogs,
    /// Sets the panel visibility, or flips it on `None`
    ToggleDebug(Option<bool>),
}

/// Per-level totals shown above the debug console.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LogCounts {
    pub info: usize,
    pub warning: usize,
    pub error: usize,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reduce(mut self, action: Action) -> Self {
        match action {
            Action::SetLoading(loading) => self.loading = loading,
            Action::SetConnected(connected) => self.connected = connected,
            Action::SetBuildings(buildings) => {
                self.buildings = buildings;
                self.loading = false;
            }
            Action::AddBuilding(building) => self.buildings.push(building),
            Action::UpdateBuilding(building) => {
                if let Some(existing) = self.buildings.iter_mut().find(|b| b.id == building.id) {
                    *existing = building;
                }
            }
            Action::RemoveBuilding(id) => {
                self.buildings.retain(|building| building.id != id);
                if self.selected_building.as_ref() == Some(&id) {
                    self.selected_building = None;
                }
            }
            Action::SelectBuilding(id) => self.selected_building = id,
            Action::AddDebugLog(entry) => {
                while self.debug_logs.len() >= DEBUG_LOG_CAPACITY {
                    self.debug_logs.pop_front();
                }
                self.debug_logs.push_back(entry);
            }
            Action::ClearDebugLogs => self.debug_logs.clear(),
            Action::ToggleDebug(show) => self.show_debug = show.unwrap_or(!self.show_debug),
        }

        self
    }

    pub fn building(&self, id: &str) -> Option<&Building> {
        self.buildings.iter().find(|building| building.id == id)
    }

    pub fn selected(&self) -> Option<&Building> {
        self.selected_building.as_deref().and_then(|id| self.building(id))
    }

    pub fn log_counts(&self) -> LogCounts {
        self.debug_logs.iter().fold(LogCounts::default(), |mut counts, entry| {
            match entry.level {
                DebugLevel::Info => counts.info += 1,
                DebugLevel::Warning => counts.warning += 1,
                DebugLevel::Error => counts.error += 1,
            }
            counts
        })
    }
}
