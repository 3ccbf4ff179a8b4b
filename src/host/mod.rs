//! Ports towards the host environment. The monitor never looks at windows itself, it only
//! reacts to [events::HostEvent]s and asks the host to show notifications through
//! [notification::NotificationSink].

pub mod events;
pub mod notification;
