use crate::shared::{DisplayState, Screen};

// state local to tui, resolves keys into the events that make sense on
// the current screen. synced from DisplayState once per loop
#[derive(Clone, Debug)]
pub struct TuiState {
    pub screen: Screen,
}

impl Default for TuiState {
    fn default() -> Self {
        Self { screen: Screen::Record }
    }
}

impl TuiState {
    pub fn sync(&mut self, ds: &DisplayState) {
        self.screen = ds.screen;
    }
}
