//! Seam between the monitor loop and whatever owns the network link

use crate::proximity::Proximity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectivityStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectivityStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Disconnected => "OFF",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
        }
    }
}

/// Receives confirmed proximity transitions and reports link status.
///
/// `on_proximity_changed` is called from the monitor loop and must return
/// quickly; connecting and retrying happen elsewhere, typically in a task
/// fed through a channel.
pub trait ConnectivityManager {
    /// `Near` asks for a connection, `Far` asks for it to be released
    fn on_proximity_changed(&mut self, proximity: Proximity);

    fn status(&self) -> ConnectivityStatus;
}

/// Request queued for whatever owns the radio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRequest {
    Connect,
    Disconnect,
}

impl LinkRequest {
    /// `None` for `Unknown`, which never changes the link
    pub const fn for_transition(proximity: Proximity) -> Option<Self> {
        match proximity {
            Proximity::Near => Some(Self::Connect),
            Proximity::Far => Some(Self::Disconnect),
            Proximity::Unknown => None,
        }
    }
}

/// What a link owner should do with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    Join,
    Leave,
    Nothing,
}

/// A request that matches the current status is a no-op; a repeated
/// `Connect` must not tear down a working link. `Connect` while still
/// connecting restarts the attempt.
pub const fn link_action(request: LinkRequest, status: ConnectivityStatus) -> LinkAction {
    match (request, status) {
        (LinkRequest::Connect, ConnectivityStatus::Connected) => LinkAction::Nothing,
        (LinkRequest::Connect, _) => LinkAction::Join,
        (LinkRequest::Disconnect, ConnectivityStatus::Disconnected) => LinkAction::Nothing,
        (LinkRequest::Disconnect, _) => LinkAction::Leave,
    }
}

/// For builds without a radio. Always reports `Disconnected`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConnectivity;

impl ConnectivityManager for NoConnectivity {
    fn on_proximity_changed(&mut self, proximity: Proximity) {
        log::debug!("Ignoring proximity change to {:?}, no radio", proximity);
    }

    fn status(&self) -> ConnectivityStatus {
        ConnectivityStatus::Disconnected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_map_to_requests() {
        assert_eq!(LinkRequest::for_transition(Proximity::Near), Some(LinkRequest::Connect));
        assert_eq!(LinkRequest::for_transition(Proximity::Far), Some(LinkRequest::Disconnect));
        assert_eq!(LinkRequest::for_transition(Proximity::Unknown), None);
    }

    #[test]
    fn test_connect_while_connected_keeps_the_link() {
        assert_eq!(
            link_action(LinkRequest::Connect, ConnectivityStatus::Connected),
            LinkAction::Nothing
        );
        assert_eq!(
            link_action(LinkRequest::Connect, ConnectivityStatus::Disconnected),
            LinkAction::Join
        );
        assert_eq!(
            link_action(LinkRequest::Connect, ConnectivityStatus::Connecting),
            LinkAction::Join
        );
    }

    #[test]
    fn test_disconnect_only_when_up() {
        assert_eq!(
            link_action(LinkRequest::Disconnect, ConnectivityStatus::Disconnected),
            LinkAction::Nothing
        );
        assert_eq!(
            link_action(LinkRequest::Disconnect, ConnectivityStatus::Connected),
            LinkAction::Leave
        );
        assert_eq!(
            link_action(LinkRequest::Disconnect, ConnectivityStatus::Connecting),
            LinkAction::Leave
        );
    }
}
