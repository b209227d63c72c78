use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    playback::ChangeCategory,
    view::{ViewId, WidgetView},
};

/// Screen of the player app opened by tapping the widget body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    NowPlaying,
    Browse,
}

/// Transport command addressed to the background media service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCommand {
    TogglePause,
    Next,
    Previous,
    CycleShuffle,
    CycleRepeat,
}

impl ServiceCommand {
    pub fn action_name(self) -> &'static str {
        match self {
            ServiceCommand::TogglePause => "togglepause",
            ServiceCommand::Next => "next",
            ServiceCommand::Previous => "previous",
            ServiceCommand::CycleShuffle => "shuffle",
            ServiceCommand::CycleRepeat => "repeat",
        }
    }

    /// Notification the service sends once it has carried the command out.
    pub fn resulting_change(self) -> ChangeCategory {
        match self {
            ServiceCommand::TogglePause => ChangeCategory::PlaystateChanged,
            ServiceCommand::Next | ServiceCommand::Previous => ChangeCategory::MetaChanged,
            ServiceCommand::CycleShuffle => ChangeCategory::ShuffleChanged,
            ServiceCommand::CycleRepeat => ChangeCategory::RepeatChanged,
        }
    }
}

/// Deferred action bound to a widget control.
///
/// Carries nothing beyond routing, so it can be handed to the host and
/// replayed in another process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum PendingAction {
    Open(Screen),
    Service(ServiceCommand),
}

impl PendingAction {
    pub fn name(&self) -> &'static str {
        match self {
            PendingAction::Open(Screen::NowPlaying) => "open-now-playing",
            PendingAction::Open(Screen::Browse) => "open-browse",
            PendingAction::Service(command) => command.action_name(),
        }
    }
}

impl fmt::Display for PendingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Receives the service commands a host dispatches when a control is tapped.
pub trait CommandSink {
    fn execute(&mut self, command: ServiceCommand) -> Result<()>;
}

/// Binds every interactive control of the widget.
///
/// With an active player the widget body opens the now-playing screen,
/// otherwise the library browser.
pub fn link_buttons(view: &mut WidgetView, player_active: bool) {
    let root = if player_active {
        Screen::NowPlaying
    } else {
        Screen::Browse
    };
    view.set_on_click(ViewId::Root, PendingAction::Open(root));

    for (id, command) in [
        (ViewId::ControlPlay, ServiceCommand::TogglePause),
        (ViewId::ControlNext, ServiceCommand::Next),
        (ViewId::ControlPrev, ServiceCommand::Previous),
        (ViewId::Shuffle, ServiceCommand::CycleShuffle),
        (ViewId::Repeat, ServiceCommand::CycleRepeat),
    ] {
        view.set_on_click(id, PendingAction::Service(command));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_target_follows_player_activity() {
        let mut active = WidgetView::new();
        link_buttons(&mut active, true);
        assert_eq!(
            active.click(ViewId::Root),
            Some(PendingAction::Open(Screen::NowPlaying))
        );

        let mut idle = WidgetView::new();
        link_buttons(&mut idle, false);
        assert_eq!(
            idle.click(ViewId::Root),
            Some(PendingAction::Open(Screen::Browse))
        );
    }

    #[test]
    fn every_control_is_bound() {
        let mut view = WidgetView::new();
        link_buttons(&mut view, false);
        for id in ViewId::CONTROLS {
            assert!(view.click(id).is_some(), "{id:?} is not bound");
        }
        assert_eq!(
            view.click(ViewId::ControlPlay),
            Some(PendingAction::Service(ServiceCommand::TogglePause))
        );
        assert_eq!(
            view.click(ViewId::Repeat),
            Some(PendingAction::Service(ServiceCommand::CycleRepeat))
        );
    }

    #[test]
    fn actions_have_stable_names() {
        assert_eq!(PendingAction::Open(Screen::Browse).name(), "open-browse");
        assert_eq!(
            PendingAction::Service(ServiceCommand::Next).to_string(),
            "next"
        );
    }

    #[test]
    fn commands_map_to_notifications() {
        assert_eq!(
            ServiceCommand::TogglePause.resulting_change(),
            ChangeCategory::PlaystateChanged
        );
        assert_eq!(
            ServiceCommand::Previous.resulting_change(),
            ChangeCategory::MetaChanged
        );
    }
}
