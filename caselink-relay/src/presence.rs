/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Presence and notification hub.
//!
//! Tracks which authenticated users are active and which case or document
//! each is viewing, and fans events out to subscribers. Independent of the
//! meeting signaling path — signaling sessions only report online/offline
//! here. Notification records are emitted to a CRUD-layer sink for
//! persistence; this hub never stores history.

use crate::metrics::NOTIFICATIONS_CREATED_TOTAL;
use actix::{Actor, Context, Handler, Message as ActixMessage, MessageResult, Recipient};
use caselink_types::{NotificationPriority, NotificationRecord};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Case,
    Document,
}

/// A case or document someone can be viewing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub id: String,
}

/// What a subscriber watches: everyone on a resource, or one user's
/// notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WatchTarget {
    Resource(ResourceRef),
    User(String),
}

/// Events fanned out to subscribers.
#[derive(ActixMessage, Debug, Clone)]
#[rtype(result = "()")]
pub enum PresenceEvent {
    ViewingStarted {
        user_id: String,
        display_name: String,
        resource: ResourceRef,
    },
    ViewingStopped {
        user_id: String,
        resource: ResourceRef,
    },
    UserWentOffline {
        user_id: String,
    },
    Notification(NotificationRecord),
}

/// Emitted once per created notification, for the CRUD layer to persist.
#[derive(ActixMessage, Debug, Clone)]
#[rtype(result = "()")]
pub struct NotificationCreated {
    pub record: NotificationRecord,
}

#[derive(ActixMessage)]
#[rtype(result = "()")]
pub struct UserOnline {
    pub user_id: String,
    pub display_name: String,
    pub connection_id: String,
}

#[derive(ActixMessage)]
#[rtype(result = "()")]
pub struct UserOffline {
    pub user_id: String,
    pub connection_id: String,
}

#[derive(ActixMessage)]
#[rtype(result = "()")]
pub struct StartViewing {
    pub user_id: String,
    pub resource: ResourceRef,
}

#[derive(ActixMessage)]
#[rtype(result = "()")]
pub struct StopViewing {
    pub user_id: String,
}

#[derive(ActixMessage)]
#[rtype(result = "()")]
pub struct Watch {
    pub target: WatchTarget,
    pub watcher_id: String,
    pub addr: Recipient<PresenceEvent>,
}

#[derive(ActixMessage)]
#[rtype(result = "()")]
pub struct Unwatch {
    pub target: WatchTarget,
    pub watcher_id: String,
}

/// Create and fan out a notification. Returns the created record.
#[derive(ActixMessage)]
#[rtype(result = "NotificationRecord")]
pub struct Notify {
    pub recipient_id: String,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub priority: NotificationPriority,
}

/// Who is currently viewing a resource.
#[derive(ActixMessage)]
#[rtype(result = "Vec<(String, String)>")]
pub struct Viewers {
    pub resource: ResourceRef,
}

#[derive(ActixMessage)]
#[rtype(result = "()")]
pub struct SetNotificationSink {
    pub addr: Recipient<NotificationCreated>,
}

struct UserPresence {
    display_name: String,
    connections: HashSet<String>,
    viewing: Option<ResourceRef>,
}

#[derive(Default)]
pub struct PresenceHub {
    users: HashMap<String, UserPresence>,
    watchers: HashMap<WatchTarget, HashMap<String, Recipient<PresenceEvent>>>,
    sink: Option<Recipient<NotificationCreated>>,
}

impl PresenceHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn fan_out(&self, target: &WatchTarget, event: PresenceEvent) {
        if let Some(subs) = self.watchers.get(target) {
            for addr in subs.values() {
                let _ = addr.try_send(event.clone());
            }
        }
    }

    fn stop_viewing(&mut self, user_id: &str) {
        let Some(user) = self.users.get_mut(user_id) else {
            return;
        };
        if let Some(resource) = user.viewing.take() {
            let event = PresenceEvent::ViewingStopped {
                user_id: user_id.to_string(),
                resource: resource.clone(),
            };
            self.fan_out(&WatchTarget::Resource(resource), event);
        }
    }
}

impl Actor for PresenceHub {
    type Context = Context<Self>;
}

impl Handler<UserOnline> for PresenceHub {
    type Result = ();

    fn handle(&mut self, msg: UserOnline, _ctx: &mut Self::Context) -> Self::Result {
        let user = self
            .users
            .entry(msg.user_id.clone())
            .or_insert_with(|| UserPresence {
                display_name: msg.display_name.clone(),
                connections: HashSet::new(),
                viewing: None,
            });
        user.display_name = msg.display_name;
        user.connections.insert(msg.connection_id);
        debug!(
            "presence: {} online ({} connections)",
            msg.user_id,
            user.connections.len()
        );
    }
}

impl Handler<UserOffline> for PresenceHub {
    type Result = ();

    fn handle(&mut self, msg: UserOffline, _ctx: &mut Self::Context) -> Self::Result {
        let fully_offline = match self.users.get_mut(&msg.user_id) {
            Some(user) => {
                user.connections.remove(&msg.connection_id);
                user.connections.is_empty()
            }
            None => return,
        };
        if !fully_offline {
            return;
        }
        self.stop_viewing(&msg.user_id);
        self.users.remove(&msg.user_id);
        info!("presence: {} offline", msg.user_id);
        // Tell anyone watching this user directly.
        self.fan_out(
            &WatchTarget::User(msg.user_id.clone()),
            PresenceEvent::UserWentOffline {
                user_id: msg.user_id,
            },
        );
    }
}

impl Handler<StartViewing> for PresenceHub {
    type Result = ();

    fn handle(&mut self, msg: StartViewing, _ctx: &mut Self::Context) -> Self::Result {
        if !self.users.contains_key(&msg.user_id) {
            debug!("presence: viewing report from unknown user {}", msg.user_id);
            return;
        }
        if self.users[&msg.user_id].viewing.as_ref() == Some(&msg.resource) {
            return;
        }
        self.stop_viewing(&msg.user_id);
        let display_name = {
            let user = self.users.get_mut(&msg.user_id).unwrap();
            user.viewing = Some(msg.resource.clone());
            user.display_name.clone()
        };
        self.fan_out(
            &WatchTarget::Resource(msg.resource.clone()),
            PresenceEvent::ViewingStarted {
                user_id: msg.user_id,
                display_name,
                resource: msg.resource,
            },
        );
    }
}

impl Handler<StopViewing> for PresenceHub {
    type Result = ();

    fn handle(&mut self, msg: StopViewing, _ctx: &mut Self::Context) -> Self::Result {
        self.stop_viewing(&msg.user_id);
    }
}

impl Handler<Watch> for PresenceHub {
    type Result = ();

    fn handle(&mut self, msg: Watch, _ctx: &mut Self::Context) -> Self::Result {
        self.watchers
            .entry(msg.target)
            .or_default()
            .insert(msg.watcher_id, msg.addr);
    }
}

impl Handler<Unwatch> for PresenceHub {
    type Result = ();

    fn handle(&mut self, msg: Unwatch, _ctx: &mut Self::Context) -> Self::Result {
        if let Some(subs) = self.watchers.get_mut(&msg.target) {
            subs.remove(&msg.watcher_id);
            if subs.is_empty() {
                self.watchers.remove(&msg.target);
            }
        }
    }
}

impl Handler<Notify> for PresenceHub {
    type Result = MessageResult<Notify>;

    fn handle(&mut self, msg: Notify, _ctx: &mut Self::Context) -> Self::Result {
        let record = NotificationRecord::new(
            msg.recipient_id.clone(),
            msg.kind,
            msg.title,
            msg.message,
            msg.priority,
        );
        NOTIFICATIONS_CREATED_TOTAL.inc();
        if let Some(sink) = &self.sink {
            let _ = sink.try_send(NotificationCreated {
                record: record.clone(),
            });
        }
        self.fan_out(
            &WatchTarget::User(msg.recipient_id),
            PresenceEvent::Notification(record.clone()),
        );
        MessageResult(record)
    }
}

impl Handler<Viewers> for PresenceHub {
    type Result = MessageResult<Viewers>;

    fn handle(&mut self, msg: Viewers, _ctx: &mut Self::Context) -> Self::Result {
        let viewers = self
            .users
            .iter()
            .filter(|(_, u)| u.viewing.as_ref() == Some(&msg.resource))
            .map(|(id, u)| (id.clone(), u.display_name.clone()))
            .collect();
        MessageResult(viewers)
    }
}

impl Handler<SetNotificationSink> for PresenceHub {
    type Result = ();

    fn handle(&mut self, msg: SetNotificationSink, _ctx: &mut Self::Context) -> Self::Result {
        self.sink = Some(msg.addr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix::Actor as _;
    use std::sync::{Arc, Mutex};

    struct Collector {
        events: Arc<Mutex<Vec<PresenceEvent>>>,
    }

    impl Actor for Collector {
        type Context = Context<Self>;
    }

    impl Handler<PresenceEvent> for Collector {
        type Result = ();

        fn handle(&mut self, msg: PresenceEvent, _ctx: &mut Self::Context) -> Self::Result {
            self.events.lock().unwrap().push(msg);
        }
    }

    struct SinkCollector {
        records: Arc<Mutex<Vec<NotificationRecord>>>,
    }

    impl Actor for SinkCollector {
        type Context = Context<Self>;
    }

    impl Handler<NotificationCreated> for SinkCollector {
        type Result = ();

        fn handle(&mut self, msg: NotificationCreated, _ctx: &mut Self::Context) -> Self::Result {
            self.records.lock().unwrap().push(msg.record);
        }
    }

    fn doc(id: &str) -> ResourceRef {
        ResourceRef {
            kind: ResourceKind::Document,
            id: id.to_string(),
        }
    }

    #[actix_rt::test]
    async fn viewing_fan_out() {
        let hub = PresenceHub::new().start();
        let events = Arc::new(Mutex::new(Vec::new()));
        let collector = Collector {
            events: events.clone(),
        }
        .start();

        hub.send(Watch {
            target: WatchTarget::Resource(doc("d-1")),
            watcher_id: "w1".into(),
            addr: collector.recipient(),
        })
        .await
        .unwrap();

        hub.send(UserOnline {
            user_id: "alice".into(),
            display_name: "Alice".into(),
            connection_id: "c1".into(),
        })
        .await
        .unwrap();
        hub.send(StartViewing {
            user_id: "alice".into(),
            resource: doc("d-1"),
        })
        .await
        .unwrap();
        // Duplicate report is suppressed.
        hub.send(StartViewing {
            user_id: "alice".into(),
            resource: doc("d-1"),
        })
        .await
        .unwrap();
        hub.send(StopViewing {
            user_id: "alice".into(),
        })
        .await
        .unwrap();
        actix_rt::time::sleep(std::time::Duration::from_millis(50)).await;

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            PresenceEvent::ViewingStarted { user_id, .. } if user_id == "alice"
        ));
        assert!(matches!(
            &events[1],
            PresenceEvent::ViewingStopped { user_id, .. } if user_id == "alice"
        ));
    }

    #[actix_rt::test]
    async fn offline_clears_viewing() {
        let hub = PresenceHub::new().start();
        let events = Arc::new(Mutex::new(Vec::new()));
        let collector = Collector {
            events: events.clone(),
        }
        .start();

        hub.send(Watch {
            target: WatchTarget::Resource(doc("d-2")),
            watcher_id: "w1".into(),
            addr: collector.clone().recipient(),
        })
        .await
        .unwrap();

        hub.send(UserOnline {
            user_id: "bob".into(),
            display_name: "Bob".into(),
            connection_id: "c1".into(),
        })
        .await
        .unwrap();
        hub.send(UserOnline {
            user_id: "bob".into(),
            display_name: "Bob".into(),
            connection_id: "c2".into(),
        })
        .await
        .unwrap();
        hub.send(StartViewing {
            user_id: "bob".into(),
            resource: doc("d-2"),
        })
        .await
        .unwrap();

        // First connection drops: still online, nothing fanned out.
        hub.send(UserOffline {
            user_id: "bob".into(),
            connection_id: "c1".into(),
        })
        .await
        .unwrap();
        actix_rt::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(events.lock().unwrap().len(), 1); // just the ViewingStarted

        // Last connection drops: viewing stops.
        hub.send(UserOffline {
            user_id: "bob".into(),
            connection_id: "c2".into(),
        })
        .await
        .unwrap();
        actix_rt::time::sleep(std::time::Duration::from_millis(50)).await;
        let events = events.lock().unwrap();
        assert!(matches!(
            events.last().unwrap(),
            PresenceEvent::ViewingStopped { user_id, .. } if user_id == "bob"
        ));
    }

    #[actix_rt::test]
    async fn viewers_listing_and_unwatch() {
        let hub = PresenceHub::new().start();
        let events = Arc::new(Mutex::new(Vec::new()));
        let collector = Collector {
            events: events.clone(),
        }
        .start();

        for (user, name) in [("alice", "Alice"), ("bob", "Bob")] {
            hub.send(UserOnline {
                user_id: user.into(),
                display_name: name.into(),
                connection_id: format!("{user}-c1"),
            })
            .await
            .unwrap();
            hub.send(StartViewing {
                user_id: user.into(),
                resource: doc("d-3"),
            })
            .await
            .unwrap();
        }

        let mut viewers = hub.send(Viewers { resource: doc("d-3") }).await.unwrap();
        viewers.sort();
        assert_eq!(
            viewers,
            vec![
                ("alice".to_string(), "Alice".to_string()),
                ("bob".to_string(), "Bob".to_string())
            ]
        );

        // A watcher that unsubscribes sees nothing afterwards.
        hub.send(Watch {
            target: WatchTarget::Resource(doc("d-3")),
            watcher_id: "w1".into(),
            addr: collector.recipient(),
        })
        .await
        .unwrap();
        hub.send(Unwatch {
            target: WatchTarget::Resource(doc("d-3")),
            watcher_id: "w1".into(),
        })
        .await
        .unwrap();
        hub.send(StopViewing {
            user_id: "alice".into(),
        })
        .await
        .unwrap();
        actix_rt::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(events.lock().unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn notify_creates_record_and_reaches_sink() {
        let hub = PresenceHub::new().start();
        let records = Arc::new(Mutex::new(Vec::new()));
        let sink = SinkCollector {
            records: records.clone(),
        }
        .start();
        let events = Arc::new(Mutex::new(Vec::new()));
        let watcher = Collector {
            events: events.clone(),
        }
        .start();

        hub.send(SetNotificationSink {
            addr: sink.recipient(),
        })
        .await
        .unwrap();
        hub.send(Watch {
            target: WatchTarget::User("carol".into()),
            watcher_id: "ui".into(),
            addr: watcher.recipient(),
        })
        .await
        .unwrap();

        let record = hub
            .send(Notify {
                recipient_id: "carol".into(),
                kind: "meeting-invite".into(),
                title: "Hearing prep".into(),
                message: "Join room case-4821".into(),
                priority: NotificationPriority::High,
            })
            .await
            .unwrap();
        assert_eq!(record.recipient_id, "carol");
        assert!(!record.is_read());

        actix_rt::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(records.lock().unwrap().len(), 1);
        assert!(matches!(
            events.lock().unwrap().first().unwrap(),
            PresenceEvent::Notification(r) if r.id == record.id
        ));
    }
}
