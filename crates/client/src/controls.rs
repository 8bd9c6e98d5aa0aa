//! The control panel: one component, parameterized by labels and by which
//! actions each mode shows.

use crate::session::Mode;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    SelectMode(Mode),
    Reset,
    Undo,
    Flip,
    CopyLink,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlLabels {
    pub local: String,
    pub remote_link: String,
    pub ai: String,
    pub reset: String,
    pub undo: String,
    pub flip: String,
    pub copy_link: String,
    pub link_hint: String,
}

impl Default for ControlLabels {
    fn default() -> Self {
        Self {
            local: "Local".into(),
            remote_link: "Online".into(),
            ai: "Vs Gemini".into(),
            reset: "Reset".into(),
            undo: "Undo".into(),
            flip: "Flip".into(),
            copy_link: "Share game link".into(),
            link_hint: "Play your move, then share the link with your friend.".into(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ControlPanel {
    labels: ControlLabels,
}

const MODES: [Mode; 3] = [Mode::Local, Mode::RemoteLink, Mode::Ai];

impl ControlPanel {
    pub fn new(labels: ControlLabels) -> Self {
        Self { labels }
    }

    /// Actions shown in `mode`, in display order.
    pub fn visible_actions(&self, mode: Mode) -> Vec<Action> {
        let mut actions: Vec<Action> = MODES.iter().map(|m| Action::SelectMode(*m)).collect();
        if mode == Mode::RemoteLink {
            actions.push(Action::CopyLink);
        }
        actions.extend([Action::Reset, Action::Undo, Action::Flip]);
        actions
    }

    pub fn is_visible(&self, action: Action, mode: Mode) -> bool {
        match action {
            Action::CopyLink => mode == Mode::RemoteLink,
            _ => true,
        }
    }

    pub fn label(&self, action: Action) -> &str {
        match action {
            Action::SelectMode(Mode::Local) => &self.labels.local,
            Action::SelectMode(Mode::RemoteLink) => &self.labels.remote_link,
            Action::SelectMode(Mode::Ai) => &self.labels.ai,
            Action::Reset => &self.labels.reset,
            Action::Undo => &self.labels.undo,
            Action::Flip => &self.labels.flip,
            Action::CopyLink => &self.labels.copy_link,
        }
    }

    /// Hint shown under the main action area.
    pub fn hint(&self, mode: Mode) -> Option<&str> {
        (mode == Mode::RemoteLink).then_some(self.labels.link_hint.as_str())
    }
}
