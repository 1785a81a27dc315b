use crate::ids::IdGenerator;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardTab {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TabError {
    #[error("no tab with id {0}")]
    NotFound(String),
    #[error("tab title must not be empty")]
    EmptyTitle,
    #[error("a dashboard needs at least one tab")]
    LastTab,
    #[error("position {0} is out of range")]
    OutOfRange(usize),
}

pub struct DashboardTabs {
    tabs: Vec<DashboardTab>,
    active: String,
    ids: Arc<dyn IdGenerator>,
}

impl DashboardTabs {
    /// A dashboard starts with a single "Overview" tab.
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        let first = DashboardTab {
            id: ids.next_id("tab"),
            title: "Overview".to_string(),
        };
        Self {
            active: first.id.clone(),
            tabs: vec![first],
            ids,
        }
    }

    pub fn tabs(&self) -> &[DashboardTab] {
        &self.tabs
    }

    pub fn active(&self) -> &str {
        &self.active
    }

    fn index_of(&self, id: &str) -> Result<usize, TabError> {
        self.tabs
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| TabError::NotFound(id.to_string()))
    }

    /// Append a tab and make it active.
    pub fn add(&mut self, title: &str) -> Result<DashboardTab, TabError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TabError::EmptyTitle);
        }
        let tab = DashboardTab {
            id: self.ids.next_id("tab"),
            title: title.to_string(),
        };
        self.tabs.push(tab.clone());
        self.active = tab.id.clone();
        Ok(tab)
    }

    pub fn rename(&mut self, id: &str, title: &str) -> Result<(), TabError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TabError::EmptyTitle);
        }
        let index = self.index_of(id)?;
        self.tabs[index].title = title.to_string();
        Ok(())
    }

    /// Remove a tab. Removing the active tab activates its right neighbour,
    /// or the left one when it was last.
    pub fn remove(&mut self, id: &str) -> Result<DashboardTab, TabError> {
        let index = self.index_of(id)?;
        if self.tabs.len() == 1 {
            return Err(TabError::LastTab);
        }
        let removed = self.tabs.remove(index);
        if self.active == removed.id {
            let next = index.min(self.tabs.len() - 1);
            self.active = self.tabs[next].id.clone();
        }
        Ok(removed)
    }

    pub fn set_active(&mut self, id: &str) -> Result<(), TabError> {
        self.index_of(id)?;
        self.active = id.to_string();
        Ok(())
    }

    pub fn move_to(&mut self, id: &str, position: usize) -> Result<(), TabError> {
        if position >= self.tabs.len() {
            return Err(TabError::OutOfRange(position));
        }
        let index = self.index_of(id)?;
        let tab = self.tabs.remove(index);
        self.tabs.insert(position, tab);
        Ok(())
    }
}
