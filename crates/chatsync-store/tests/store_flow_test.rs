use chatsync_store::{ChatStore, RefreshOutcome, SessionState, SyncOutcome};
use chatsync_types::{AuthNotification, Delivery, Identity, Message, Role, SyncConfig, Thread};
use chrono::{Duration, Utc};

fn refresh(store: &mut ChatStore, threads: Vec<Thread>) -> RefreshOutcome {
    let ticket = store.directory_mut().begin_refresh();
    store.directory_mut().complete_refresh(ticket, threads)
}

#[test]
fn test_optimistic_send_then_sync_yields_single_entry() {
    let mut store = ChatStore::new(&SyncConfig::default());
    let now = Utc::now();
    refresh(&mut store, vec![Thread::new("c1", "Chat", now, "u1")]);
    store.select(Some("c1"));

    let local = Message::provisional("c1", "Hello", now);
    store.logs_mut().append(local.clone());

    let remote = vec![
        Message::synced("srv-1", "c1", Role::User, "Hello", now + Duration::milliseconds(350)),
        Message::synced("srv-2", "c1", Role::Assistant, "Hi there", now + Duration::seconds(1)),
    ];
    let ticket = store.begin_message_sync("c1");
    assert!(matches!(
        store.complete_message_sync(&ticket, remote),
        SyncOutcome::Applied { changed: true, .. }
    ));

    let log = store.selected_messages();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].id, "srv-1");
    assert_eq!(log[0].delivery, Delivery::Synced);
    assert_eq!(log[1].author, Role::Assistant);
    assert!(log.iter().all(|m| m.id != local.id));
}

#[test]
fn test_local_create_invalidates_in_flight_refresh() {
    let mut store = ChatStore::new(&SyncConfig::default());
    let now = Utc::now();

    let slow = store.directory_mut().begin_refresh();
    store.directory_mut().insert_front(Thread::local("Demo Chat", now));

    assert_eq!(store.directory_mut().complete_refresh(slow, vec![]), RefreshOutcome::Stale);
    assert_eq!(store.threads().len(), 1);
}

#[test]
fn test_sign_out_clears_everything() {
    let session = SessionState::new();
    let mut store = ChatStore::new(&SyncConfig::default());
    session.apply(AuthNotification::SignedIn(Identity::new("u1")));

    let now = Utc::now();
    refresh(&mut store, vec![Thread::new("c1", "Chat", now, "u1"), Thread::new("c2", "Other", now, "u1")]);
    store.select(Some("c1"));
    store.logs_mut().append(Message::provisional("c1", "draft", now));

    assert!(session.apply(AuthNotification::SignedOut));
    if !session.is_authenticated() {
        store.reset();
    }

    assert!(session.current().is_none());
    assert!(store.threads().is_empty());
    assert_eq!(store.selected(), None);
    assert!(store.logs().get("c1").is_empty());
}
