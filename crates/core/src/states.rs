use std::collections::HashMap;

use crate::elements::ElementRegistry;
use crate::logger;

/// Closed set of named screen states, each bound to one indicator element.
#[derive(Debug, Clone, Default)]
pub struct StateModel {
    states: HashMap<String, String>,
}

impl StateModel {
    pub fn new(states: HashMap<String, String>) -> Self {
        Self { states }
    }

    pub fn with(mut self, state: &str, indicator: &str) -> Self {
        self.states.insert(state.to_string(), indicator.to_string());
        self
    }

    /// Indicator element of `state`. Unknown states are a caller error and
    /// are logged as such.
    pub fn indicator(&self, state: &str) -> Option<&str> {
        let found = self.states.get(state).map(String::as_str);
        if found.is_none() {
            logger::error_p("nav", &format!("unknown state '{}'", state));
        }
        found
    }

    /// States whose indicator is missing from the registry.
    pub fn dangling(&self, elements: &ElementRegistry) -> Vec<String> {
        let mut out: Vec<String> = self
            .states
            .iter()
            .filter(|(_, e)| elements.get(e).is_none())
            .map(|(s, _)| s.clone())
            .collect();
        out.sort();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::Element;

    #[test]
    fn lookup_and_unknown() {
        let m = StateModel::default()
            .with("main_menu", "main_menu_indicators")
            .with("base_panel", "base_panel_indicator");
        assert_eq!(m.indicator("main_menu"), Some("main_menu_indicators"));
        assert_eq!(m.indicator("base_panel"), Some("base_panel_indicator"));
        assert_eq!(m.indicator("store_panel"), None);
    }

    #[test]
    fn dangling_indicators() {
        let m = StateModel::default()
            .with("main_menu", "main_menu_indicators")
            .with("base_panel", "base_panel_indicator");
        let reg = ElementRegistry::new().with(Element::click_only("main_menu_indicators", 0, 0));
        assert_eq!(m.dangling(&reg), vec!["base_panel".to_string()]);
    }
}
